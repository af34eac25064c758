//! Domain types for the volunteer participation ledger.
//!
//! Events carry a fixed volunteer capacity and a counter of current
//! volunteers. The counter is only ever moved by [`Event::record_join`] and
//! [`Event::record_leave`], which both store implementations call while
//! holding the event exclusively.

use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Longest accepted event title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Longest accepted query message or response, in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Default page size for event listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event
    EventId
);

uuid_id!(
    /// Unique identifier for a user (organizer or volunteer)
    UserId
);

uuid_id!(
    /// Unique identifier for a participation record
    ParticipationId
);

uuid_id!(
    /// Unique identifier for a question about an event
    QueryId
);

// ============================================================================
// Events
// ============================================================================

/// Lifecycle status of an event.
///
/// `Full` is never chosen by an organizer; the ledger sets it when an active
/// event reaches capacity and clears it when a slot frees up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Open for volunteers
    Active,
    /// Announced, volunteers may already sign up
    Pending,
    /// Took place
    Completed,
    /// Called off
    Cancelled,
    /// Active and at capacity
    Full,
}

impl EventStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Full => "full",
        }
    }

    /// Whether a join may be attempted at all (capacity is checked separately).
    #[must_use]
    pub const fn accepts_volunteers(self) -> bool {
        matches!(self, Self::Active | Self::Pending | Self::Full)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "full" => Ok(Self::Full),
            other => Err(LedgerError::Validation(format!("Unknown event status: {other}"))),
        }
    }
}

/// A volunteer opportunity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// User who created the event
    pub organizer_id: UserId,
    /// Title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Where it happens
    pub location: Option<String>,
    /// Start of the schedule window
    pub starts_at: DateTime<Utc>,
    /// End of the schedule window
    pub ends_at: Option<DateTime<Utc>>,
    /// Maximum number of volunteers
    pub capacity: u32,
    /// Volunteers currently signed up
    pub current_volunteers: u32,
    /// Lifecycle status
    pub status: EventStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Slots still open.
    #[must_use]
    pub const fn remaining_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.current_volunteers)
    }

    /// Whether `user_id` created this event.
    #[must_use]
    pub fn is_organized_by(&self, user_id: UserId) -> bool {
        self.organizer_id == user_id
    }

    /// Check that one more volunteer may join.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EventClosed`] for completed or cancelled events
    /// - [`LedgerError::CapacityExceeded`] when no slot is left
    pub fn ensure_joinable(&self) -> Result<()> {
        if !self.status.accepts_volunteers() {
            return Err(LedgerError::EventClosed {
                event_id: self.id,
                status: self.status,
            });
        }
        if self.current_volunteers >= self.capacity {
            return Err(LedgerError::CapacityExceeded {
                event_id: self.id,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Apply a successful join to the counter and derived status.
    ///
    /// Callers must have passed [`Event::ensure_joinable`] under the same lock.
    pub fn record_join(&mut self, now: DateTime<Utc>) {
        self.current_volunteers = self.current_volunteers.saturating_add(1).min(self.capacity);
        if self.status == EventStatus::Active && self.current_volunteers >= self.capacity {
            self.status = EventStatus::Full;
        }
        self.updated_at = now;
    }

    /// Apply a leave. The counter is clamped at zero.
    pub fn record_leave(&mut self, now: DateTime<Utc>) {
        self.current_volunteers = self.current_volunteers.saturating_sub(1);
        if self.status == EventStatus::Full && self.current_volunteers < self.capacity {
            self.status = EventStatus::Active;
        }
        self.updated_at = now;
    }
}

/// Input for creating an event.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewEvent {
    /// Title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Location
    #[serde(default)]
    pub location: Option<String>,
    /// Start of the schedule window
    pub starts_at: DateTime<Utc>,
    /// End of the schedule window
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Maximum number of volunteers
    pub capacity: u32,
    /// Initial status (`active` when omitted)
    #[serde(default)]
    pub status: Option<EventStatus>,
}

impl NewEvent {
    /// Validate the input and build the event it describes.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for an empty title, zero capacity,
    /// an inverted schedule window, or an initial status other than
    /// `active`/`pending`.
    pub fn into_event(self, id: EventId, organizer_id: UserId, now: DateTime<Utc>) -> Result<Event> {
        let title = normalize_text("title", &self.title, MAX_TITLE_LEN)?;
        validate_capacity(self.capacity)?;
        validate_window(self.starts_at, self.ends_at)?;

        let status = match self.status {
            None | Some(EventStatus::Active) => EventStatus::Active,
            Some(EventStatus::Pending) => EventStatus::Pending,
            Some(other) => {
                return Err(LedgerError::Validation(format!(
                    "New events must be active or pending, got {other}"
                )));
            }
        };

        Ok(Event {
            id,
            organizer_id,
            title,
            description: self.description.trim().to_string(),
            location: self.location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            capacity: self.capacity,
            current_volunteers: 0,
            status,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of an event's organizer-editable fields.
///
/// `current_volunteers` is deliberately absent.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventUpdate {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New location
    #[serde(default)]
    pub location: Option<String>,
    /// New start
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// New end
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// New capacity (never below the current volunteer count)
    #[serde(default)]
    pub capacity: Option<u32>,
    /// New status (`full` is rejected)
    #[serde(default)]
    pub status: Option<EventStatus>,
}

impl EventUpdate {
    /// Checks that need no knowledge of the stored event.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for an empty title, zero capacity or
    /// an explicit `full` status.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            normalize_text("title", title, MAX_TITLE_LEN)?;
        }
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
        }
        if self.status == Some(EventStatus::Full) {
            return Err(LedgerError::Validation(
                "Status 'full' is derived from capacity and cannot be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply the update to `event`, re-deriving `full`.
    ///
    /// Store implementations call this while holding the event exclusively so
    /// the capacity check sees the latest volunteer count.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] when the update is invalid or would
    /// lower capacity below the current volunteer count. `event` is left
    /// untouched on error.
    pub fn apply_to(&self, event: &mut Event, now: DateTime<Utc>) -> Result<()> {
        self.validate()?;

        let capacity = self.capacity.unwrap_or(event.capacity);
        if capacity < event.current_volunteers {
            return Err(LedgerError::Validation(format!(
                "Capacity {capacity} is below the {} volunteers already signed up",
                event.current_volunteers
            )));
        }
        let starts_at = self.starts_at.unwrap_or(event.starts_at);
        let ends_at = self.ends_at.or(event.ends_at);
        validate_window(starts_at, ends_at)?;

        let title = match &self.title {
            Some(title) => normalize_text("title", title, MAX_TITLE_LEN)?,
            None => event.title.clone(),
        };

        let requested = match self.status.unwrap_or(event.status) {
            EventStatus::Full => EventStatus::Active,
            other => other,
        };
        let status = if requested == EventStatus::Active && event.current_volunteers >= capacity {
            EventStatus::Full
        } else {
            requested
        };

        event.title = title;
        if let Some(description) = &self.description {
            event.description = description.trim().to_string();
        }
        if let Some(location) = &self.location {
            let location = location.trim();
            event.location = (!location.is_empty()).then(|| location.to_string());
        }
        event.starts_at = starts_at;
        event.ends_at = ends_at;
        event.capacity = capacity;
        event.status = status;
        event.updated_at = now;
        Ok(())
    }
}

/// Filter and pagination for event listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventFilter {
    /// Only events with this status
    pub status: Option<EventStatus>,
    /// Only events created by this organizer
    pub organizer_id: Option<UserId>,
    /// Page number (0-indexed)
    pub page: u32,
    /// Page size, clamped to `1..=MAX_PAGE_SIZE`
    pub page_size: u32,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            status: None,
            organizer_id: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl EventFilter {
    /// Effective page size.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit())
    }

    /// Whether `event` passes the status and organizer filters.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        self.status.is_none_or(|s| s == event.status)
            && self.organizer_id.is_none_or(|o| o == event.organizer_id)
    }
}

// ============================================================================
// Participation
// ============================================================================

/// Evidence that a volunteer committed to an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    /// Record identifier
    pub id: ParticipationId,
    /// Event joined
    pub event_id: EventId,
    /// Volunteer who joined
    pub volunteer_id: UserId,
    /// When the join committed
    pub joined_at: DateTime<Utc>,
}

impl Participation {
    /// Create a participation record with a fresh id.
    #[must_use]
    pub fn new(event_id: EventId, volunteer_id: UserId, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: ParticipationId::new(),
            event_id,
            volunteer_id,
            joined_at,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// A question about an event, optionally answered by its organizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Query identifier
    pub id: QueryId,
    /// Event the question is about
    pub event_id: EventId,
    /// User who asked
    pub asker_id: UserId,
    /// Question text
    pub message: String,
    /// Organizer answer, set at most once
    pub response: Option<String>,
    /// When the question was asked
    pub created_at: DateTime<Utc>,
    /// When it was answered
    pub responded_at: Option<DateTime<Utc>>,
}

impl Query {
    /// Create an unanswered query with a fresh id.
    #[must_use]
    pub fn new(event_id: EventId, asker_id: UserId, message: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: QueryId::new(),
            event_id,
            asker_id,
            message,
            response: None,
            created_at,
            responded_at: None,
        }
    }

    /// Whether the organizer already answered.
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        self.response.is_some()
    }
}

/// A query joined with the title of its event, for listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryView {
    /// The query itself
    #[serde(flatten)]
    pub query: Query,
    /// Title of the event it belongs to
    pub event_title: String,
}

// ============================================================================
// Validation helpers
// ============================================================================

/// Trim `value` and check it is non-empty and at most `max` characters.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] naming `field`.
pub fn normalize_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(LedgerError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_capacity(capacity: u32) -> Result<()> {
    if capacity == 0 {
        return Err(LedgerError::Validation(
            "capacity must be a positive integer".to_string(),
        ));
    }
    if i32::try_from(capacity).is_err() {
        return Err(LedgerError::Validation(format!(
            "capacity must be at most {}",
            i32::MAX
        )));
    }
    Ok(())
}

fn validate_window(starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>) -> Result<()> {
    if let Some(ends_at) = ends_at {
        if ends_at < starts_at {
            return Err(LedgerError::Validation(
                "ends_at must not be before starts_at".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(capacity: u32, current: u32, status: EventStatus) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            organizer_id: UserId::new(),
            title: "Beach cleanup".to_string(),
            description: String::new(),
            location: None,
            starts_at: now,
            ends_at: None,
            capacity,
            current_volunteers: current,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_join_fills_active_event() {
        let mut e = event(2, 1, EventStatus::Active);
        e.ensure_joinable().unwrap();
        e.record_join(Utc::now());
        assert_eq!(e.current_volunteers, 2);
        assert_eq!(e.status, EventStatus::Full);
        assert!(matches!(
            e.ensure_joinable(),
            Err(LedgerError::CapacityExceeded { capacity: 2, .. })
        ));
    }

    #[test]
    fn test_pending_event_stays_pending_when_full() {
        let mut e = event(1, 0, EventStatus::Pending);
        e.record_join(Utc::now());
        assert_eq!(e.status, EventStatus::Pending);
    }

    #[test]
    fn test_leave_reopens_full_event_and_clamps() {
        let mut e = event(1, 1, EventStatus::Full);
        e.record_leave(Utc::now());
        assert_eq!(e.current_volunteers, 0);
        assert_eq!(e.status, EventStatus::Active);

        e.record_leave(Utc::now());
        assert_eq!(e.current_volunteers, 0);
    }

    #[test]
    fn test_closed_event_rejects_join() {
        let e = event(5, 0, EventStatus::Cancelled);
        assert!(matches!(
            e.ensure_joinable(),
            Err(LedgerError::EventClosed { status: EventStatus::Cancelled, .. })
        ));
    }

    #[test]
    fn test_update_cannot_drop_capacity_below_count() {
        let mut e = event(5, 3, EventStatus::Active);
        let update = EventUpdate {
            capacity: Some(2),
            ..EventUpdate::default()
        };
        let err = update.apply_to(&mut e, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(e.capacity, 5);
    }

    #[test]
    fn test_update_rederives_full() {
        let mut e = event(5, 3, EventStatus::Active);
        EventUpdate {
            capacity: Some(3),
            ..EventUpdate::default()
        }
        .apply_to(&mut e, Utc::now())
        .unwrap();
        assert_eq!(e.status, EventStatus::Full);

        EventUpdate {
            capacity: Some(10),
            ..EventUpdate::default()
        }
        .apply_to(&mut e, Utc::now())
        .unwrap();
        assert_eq!(e.status, EventStatus::Active);
    }

    #[test]
    fn test_update_rejects_explicit_full() {
        let update = EventUpdate {
            status: Some(EventStatus::Full),
            ..EventUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_new_event_validation() {
        let now = Utc::now();
        let base = NewEvent {
            title: "  Food bank shift ".to_string(),
            description: String::new(),
            location: Some("   ".to_string()),
            starts_at: now,
            ends_at: Some(now + Duration::hours(3)),
            capacity: 4,
            status: None,
        };

        let e = base.clone().into_event(EventId::new(), UserId::new(), now).unwrap();
        assert_eq!(e.title, "Food bank shift");
        assert_eq!(e.location, None);
        assert_eq!(e.status, EventStatus::Active);
        assert_eq!(e.current_volunteers, 0);

        let zero = NewEvent { capacity: 0, ..base.clone() };
        assert!(zero.into_event(EventId::new(), UserId::new(), now).is_err());

        let inverted = NewEvent {
            ends_at: Some(now - Duration::hours(1)),
            ..base.clone()
        };
        assert!(inverted.into_event(EventId::new(), UserId::new(), now).is_err());

        let completed = NewEvent {
            status: Some(EventStatus::Completed),
            ..base
        };
        assert!(completed.into_event(EventId::new(), UserId::new(), now).is_err());
    }

    #[test]
    fn test_status_round_trips_through_storage_form() {
        for status in [
            EventStatus::Active,
            EventStatus::Pending,
            EventStatus::Completed,
            EventStatus::Cancelled,
            EventStatus::Full,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }
        assert!("archived".parse::<EventStatus>().is_err());
    }

    #[test]
    fn test_filter_clamps_page_size() {
        let filter = EventFilter {
            page: 2,
            page_size: 500,
            ..EventFilter::default()
        };
        assert_eq!(filter.limit(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 200);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("message", "  hi  ", 10).unwrap(), "hi");
        assert!(normalize_text("message", "   ", 10).is_err());
        assert!(normalize_text("message", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn test_query_view_serializes_flat() {
        let view = QueryView {
            query: Query::new(EventId::new(), UserId::new(), "When?".into(), Utc::now()),
            event_title: "Park day".into(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["message"], "When?");
        assert_eq!(json["event_title"], "Park day");
        assert!(json["response"].is_null());
    }
}
