//! Joining and leaving events under a capacity constraint.
//!
//! The service does a cheap pre-check against a plain read so obvious
//! failures never open a transaction, then hands the write to
//! [`ParticipationStore::join`] / [`ParticipationStore::leave`], which repeat
//! every check while holding the event row. Only the store's answer counts.

use crate::environment::Clock;
use crate::error::{LedgerError, Result};
use crate::metrics::{failure_outcome, record_participation};
use crate::store::{EventStore, ParticipationStore};
use crate::types::{Event, EventId, Participation, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maintains `current_volunteers == count(participation rows)` and
/// `current_volunteers <= capacity` for every event.
#[derive(Clone)]
pub struct ParticipationService {
    events: Arc<dyn EventStore>,
    participations: Arc<dyn ParticipationStore>,
    clock: Arc<dyn Clock>,
}

impl ParticipationService {
    /// Create a new participation service.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        participations: Arc<dyn ParticipationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            participations,
            clock,
        }
    }

    /// Sign `volunteer_id` up for `event_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: event absent
    /// - `Conflict`: already joined
    /// - `CapacityExceeded`: no slot left
    /// - `EventClosed`: event completed or cancelled
    ///
    /// None of these leave any state behind.
    #[tracing::instrument(skip_all, fields(event_id = %event_id, volunteer_id = %volunteer_id))]
    pub async fn join_event(&self, event_id: EventId, volunteer_id: UserId) -> Result<Participation> {
        let result = self.try_join(event_id, volunteer_id).await;

        match &result {
            Ok(participation) => {
                record_participation("joined");
                info!(participation_id = %participation.id, "Volunteer joined event");
            }
            Err(err) => {
                record_participation(failure_outcome(err));
                if err.is_user_error() {
                    debug!(error = %err, "Join rejected");
                } else {
                    warn!(error = %err, "Join failed");
                }
            }
        }

        result
    }

    async fn try_join(&self, event_id: EventId, volunteer_id: UserId) -> Result<Participation> {
        let event = self.require_event(event_id).await?;
        if self.participations.has_joined(event_id, volunteer_id).await? {
            return Err(already_joined(event_id));
        }
        event.ensure_joinable()?;

        let participation = Participation::new(event_id, volunteer_id, self.clock.now());
        self.participations.join(participation).await
    }

    /// Withdraw `volunteer_id` from `event_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: event absent
    /// - `NotJoined`: no membership to remove
    #[tracing::instrument(skip_all, fields(event_id = %event_id, volunteer_id = %volunteer_id))]
    pub async fn leave_event(&self, event_id: EventId, volunteer_id: UserId) -> Result<()> {
        let result = async {
            self.require_event(event_id).await?;
            self.participations
                .leave(event_id, volunteer_id, self.clock.now())
                .await
        }
        .await;

        match &result {
            Ok(()) => {
                record_participation("left");
                info!("Volunteer left event");
            }
            Err(err) => {
                record_participation(failure_outcome(err));
                debug!(error = %err, "Leave rejected");
            }
        }

        result
    }

    /// Whether `volunteer_id` is signed up for `event_id`.
    ///
    /// A plain read; good enough for display, never used for enforcement.
    ///
    /// # Errors
    ///
    /// `NotFound` when the event does not exist.
    pub async fn has_joined(&self, event_id: EventId, volunteer_id: UserId) -> Result<bool> {
        self.require_event(event_id).await?;
        self.participations.has_joined(event_id, volunteer_id).await
    }

    /// Roster of an event, visible to its organizer only.
    ///
    /// # Errors
    ///
    /// - `NotFound`: event absent
    /// - `Forbidden`: requester is not the organizer
    pub async fn list_participants(
        &self,
        event_id: EventId,
        requester_id: UserId,
    ) -> Result<Vec<Participation>> {
        let event = self.require_event(event_id).await?;
        if !event.is_organized_by(requester_id) {
            return Err(LedgerError::Forbidden(
                "Only the organizer can view the participant list".to_string(),
            ));
        }
        self.participations.list_participants(event_id).await
    }

    /// Events `volunteer_id` is signed up for, most recent join first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_joined_events(&self, volunteer_id: UserId) -> Result<Vec<Event>> {
        self.participations.list_joined_events(volunteer_id).await
    }

    async fn require_event(&self, event_id: EventId) -> Result<Event> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Event", event_id))
    }
}

/// The error both stores return for a duplicate membership.
#[must_use]
pub fn already_joined(event_id: EventId) -> LedgerError {
    LedgerError::Conflict(format!("Volunteer already joined event {event_id}"))
}
