//! Row types and their conversion into domain types.
//!
//! Counters are `INTEGER` in the schema; they are converted with checked
//! casts so a corrupt row surfaces as `Storage` instead of wrapping.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use voloconnect_core::types::{
    Event, EventId, Participation, ParticipationId, Query, QueryId, QueryView, UserId,
};
use voloconnect_core::{LedgerError, Result};

pub(crate) const EVENT_COLUMNS: &str = "id, organizer_id, title, description, location, starts_at, \
     ends_at, capacity, current_volunteers, status, created_at, updated_at";

/// [`EVENT_COLUMNS`] qualified with the `e` alias.
pub(crate) const JOINED_EVENT_COLUMNS: &str = "e.id, e.organizer_id, e.title, e.description, \
     e.location, e.starts_at, e.ends_at, e.capacity, e.current_volunteers, e.status, \
     e.created_at, e.updated_at";

pub(crate) const QUERY_COLUMNS: &str =
    "id, event_id, asker_id, message, response, created_at, responded_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    title: String,
    description: String,
    location: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    capacity: i32,
    current_volunteers: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = LedgerError;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Self {
            id: EventId::from_uuid(row.id),
            organizer_id: UserId::from_uuid(row.organizer_id),
            title: row.title,
            description: row.description,
            location: row.location,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            capacity: from_db_count("capacity", row.capacity)?,
            current_volunteers: from_db_count("current_volunteers", row.current_volunteers)?,
            status: row
                .status
                .parse()
                .map_err(|_| LedgerError::Storage(format!("Invalid event status in row: {}", row.status)))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ParticipationRow {
    id: Uuid,
    event_id: Uuid,
    volunteer_id: Uuid,
    joined_at: DateTime<Utc>,
}

impl From<ParticipationRow> for Participation {
    fn from(row: ParticipationRow) -> Self {
        Self {
            id: ParticipationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            volunteer_id: UserId::from_uuid(row.volunteer_id),
            joined_at: row.joined_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QueryRow {
    id: Uuid,
    event_id: Uuid,
    asker_id: Uuid,
    message: String,
    response: Option<String>,
    created_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl From<QueryRow> for Query {
    fn from(row: QueryRow) -> Self {
        Self {
            id: QueryId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            asker_id: UserId::from_uuid(row.asker_id),
            message: row.message,
            response: row.response,
            created_at: row.created_at,
            responded_at: row.responded_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QueryViewRow {
    #[sqlx(flatten)]
    query: QueryRow,
    event_title: String,
}

impl From<QueryViewRow> for QueryView {
    fn from(row: QueryViewRow) -> Self {
        Self {
            query: row.query.into(),
            event_title: row.event_title,
        }
    }
}

pub(crate) fn from_db_count(column: &str, value: i32) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| LedgerError::Storage(format!("Negative {column} in row: {value}")))
}

pub(crate) fn to_db_count(column: &str, value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| LedgerError::Validation(format!("{column} {value} is too large")))
}

pub(crate) fn events_from_rows(rows: Vec<EventRow>) -> Result<Vec<Event>> {
    rows.into_iter().map(Event::try_from).collect()
}
