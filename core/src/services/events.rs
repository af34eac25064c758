//! Organizer-owned event management.

use crate::environment::Clock;
use crate::error::{LedgerError, Result};
use crate::metrics::record_event;
use crate::store::EventStore;
use crate::types::{Event, EventFilter, EventId, EventUpdate, NewEvent, UserId};
use std::sync::Arc;
use tracing::info;

/// Create, read, update and delete events.
///
/// Nothing here touches `current_volunteers`; that belongs to the
/// participation service.
#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Create a new event service.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { events, clock }
    }

    /// Publish a new event owned by `organizer_id`.
    ///
    /// # Errors
    ///
    /// `Validation` for invalid input.
    #[tracing::instrument(skip_all, fields(organizer_id = %organizer_id))]
    pub async fn create_event(&self, organizer_id: UserId, new_event: NewEvent) -> Result<Event> {
        let event = new_event.into_event(EventId::new(), organizer_id, self.clock.now())?;
        let event = self.events.insert_event(event).await?;

        record_event("created");
        info!(event_id = %event.id, capacity = event.capacity, "Event created");
        Ok(event)
    }

    /// Load one event.
    ///
    /// # Errors
    ///
    /// `NotFound` when absent.
    pub async fn get_event(&self, event_id: EventId) -> Result<Event> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Event", event_id))
    }

    /// List events.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>> {
        self.events.list_events(filter).await
    }

    /// Edit an event. Organizer only.
    ///
    /// # Errors
    ///
    /// - `NotFound`: event absent
    /// - `Forbidden`: requester is not the organizer
    /// - `Validation`: invalid update, including capacity below the current count
    #[tracing::instrument(skip_all, fields(event_id = %event_id, requester_id = %requester_id))]
    pub async fn update_event(
        &self,
        event_id: EventId,
        requester_id: UserId,
        update: EventUpdate,
    ) -> Result<Event> {
        self.require_organizer(event_id, requester_id).await?;
        update.validate()?;

        let event = self
            .events
            .update_event(event_id, update, self.clock.now())
            .await?;

        record_event("updated");
        info!(status = %event.status, capacity = event.capacity, "Event updated");
        Ok(event)
    }

    /// Delete an event with its participation and query rows. Organizer only.
    ///
    /// # Errors
    ///
    /// - `NotFound`: event absent
    /// - `Forbidden`: requester is not the organizer
    #[tracing::instrument(skip_all, fields(event_id = %event_id, requester_id = %requester_id))]
    pub async fn delete_event(&self, event_id: EventId, requester_id: UserId) -> Result<()> {
        self.require_organizer(event_id, requester_id).await?;
        if !self.events.delete_event(event_id).await? {
            return Err(LedgerError::not_found("Event", event_id));
        }

        record_event("deleted");
        info!("Event deleted");
        Ok(())
    }

    async fn require_organizer(&self, event_id: EventId, requester_id: UserId) -> Result<Event> {
        let event = self.get_event(event_id).await?;
        if !event.is_organized_by(requester_id) {
            return Err(LedgerError::Forbidden(
                "Only the organizer can modify this event".to_string(),
            ));
        }
        Ok(event)
    }
}
