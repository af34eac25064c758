//! In-memory ledger for fast, deterministic tests.
//!
//! [`InMemoryLedger`] implements every store trait over a single mutex, so a
//! join or leave observes and mutates the event and its participation rows in
//! one critical section. That is the in-process equivalent of the row lock the
//! PostgreSQL ledger takes.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;
use voloconnect_core::services::participation::already_joined;
use voloconnect_core::services::queries::already_answered;
use voloconnect_core::store::{
    EventStore, ParticipationStore, QueryStore, SessionStore, StoreFuture, StoreHealth,
};
use voloconnect_core::types::{
    Event, EventFilter, EventId, EventUpdate, Participation, Query, QueryId, QueryView, UserId,
};
use voloconnect_core::{LedgerError, Result};

#[derive(Debug, Default)]
struct LedgerState {
    events: HashMap<EventId, Event>,
    participations: HashMap<(EventId, UserId), Participation>,
    queries: HashMap<QueryId, Query>,
    sessions: HashMap<Uuid, (UserId, DateTime<Utc>)>,
    unavailable: bool,
}

impl LedgerState {
    fn view(&self, query: &Query) -> QueryView {
        QueryView {
            query: query.clone(),
            event_title: self
                .events
                .get(&query.event_id)
                .map(|event| event.title.clone())
                .unwrap_or_default(),
        }
    }

    fn views_where(&self, keep: impl Fn(&Query) -> bool) -> Vec<QueryView> {
        let mut views: Vec<QueryView> = self
            .queries
            .values()
            .filter(|query| keep(query))
            .map(|query| self.view(query))
            .collect();
        views.sort_by(|a, b| {
            b.query
                .created_at
                .cmp(&a.query.created_at)
                .then_with(|| a.query.id.cmp(&b.query.id))
        });
        views
    }
}

/// In-memory implementation of all ledger store traits.
///
/// Cloning shares the underlying state.
///
/// # Example
///
/// ```
/// use voloconnect_testing::InMemoryLedger;
///
/// let ledger = InMemoryLedger::new();
/// assert_eq!(ledger.event_count(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state, failing like a dropped connection when unavailable.
    fn reachable(&self) -> Result<MutexGuard<'_, LedgerState>> {
        let state = self.lock();
        if state.unavailable {
            return Err(LedgerError::TransientFailure(
                "in-memory ledger marked unavailable".to_string(),
            ));
        }
        Ok(state)
    }

    /// Register a bearer token for `user_id`, valid until `expires_at`.
    pub fn insert_session(&self, token: Uuid, user_id: UserId, expires_at: DateTime<Utc>) {
        self.lock().sessions.insert(token, (user_id, expires_at));
    }

    /// Make every store call fail with `TransientFailure`, as if the database went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Number of stored events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    /// Number of participation rows for `event_id`.
    #[must_use]
    pub fn participation_count(&self, event_id: EventId) -> usize {
        self.lock()
            .participations
            .keys()
            .filter(|(event, _)| *event == event_id)
            .count()
    }

    /// Number of queries about `event_id`.
    #[must_use]
    pub fn query_count(&self, event_id: EventId) -> usize {
        self.lock()
            .queries
            .values()
            .filter(|query| query.event_id == event_id)
            .count()
    }

    /// Snapshot of one event, bypassing the store traits.
    #[must_use]
    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.lock().events.get(&event_id).cloned()
    }
}

impl EventStore for InMemoryLedger {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut state = self.reachable()?;
            if state.events.contains_key(&event.id) {
                return Err(LedgerError::Conflict(format!(
                    "Event {} already exists",
                    event.id
                )));
            }
            state.events.insert(event.id, event.clone());
            Ok(event)
        })
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move { Ok(self.reachable()?.events.get(&event_id).cloned()) })
    }

    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let state = self.reachable()?;
            let mut events: Vec<Event> = state
                .events
                .values()
                .filter(|event| filter.matches(event))
                .cloned()
                .collect();
            events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));

            let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
            Ok(events
                .into_iter()
                .skip(offset)
                .take(usize::try_from(filter.limit()).unwrap_or(usize::MAX))
                .collect())
        })
    }

    fn update_event(
        &self,
        event_id: EventId,
        update: EventUpdate,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut state = self.reachable()?;
            let stored = state
                .events
                .get_mut(&event_id)
                .ok_or_else(|| LedgerError::not_found("Event", event_id))?;

            let mut updated = stored.clone();
            update.apply_to(&mut updated, now)?;
            *stored = updated.clone();
            Ok(updated)
        })
    }

    fn delete_event(&self, event_id: EventId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.reachable()?;
            if state.events.remove(&event_id).is_none() {
                return Ok(false);
            }
            state.participations.retain(|(event, _), _| *event != event_id);
            state.queries.retain(|_, query| query.event_id != event_id);
            Ok(true)
        })
    }
}

impl ParticipationStore for InMemoryLedger {
    fn join(&self, participation: Participation) -> StoreFuture<'_, Participation> {
        Box::pin(async move {
            let mut state = self.reachable()?;
            let key = (participation.event_id, participation.volunteer_id);
            if !state.events.contains_key(&key.0) {
                return Err(LedgerError::not_found("Event", key.0));
            }
            if state.participations.contains_key(&key) {
                return Err(already_joined(key.0));
            }

            let event = state
                .events
                .get_mut(&key.0)
                .ok_or_else(|| LedgerError::not_found("Event", key.0))?;
            event.ensure_joinable()?;
            event.record_join(participation.joined_at);

            state.participations.insert(key, participation.clone());
            Ok(participation)
        })
    }

    fn leave(
        &self,
        event_id: EventId,
        volunteer_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.reachable()?;
            if !state.events.contains_key(&event_id) {
                return Err(LedgerError::not_found("Event", event_id));
            }
            if state.participations.remove(&(event_id, volunteer_id)).is_none() {
                return Err(LedgerError::NotJoined { event_id });
            }
            if let Some(event) = state.events.get_mut(&event_id) {
                event.record_leave(now);
            }
            Ok(())
        })
    }

    fn has_joined(&self, event_id: EventId, volunteer_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            Ok(self
                .reachable()?
                .participations
                .contains_key(&(event_id, volunteer_id)))
        })
    }

    fn list_participants(&self, event_id: EventId) -> StoreFuture<'_, Vec<Participation>> {
        Box::pin(async move {
            let mut participants: Vec<Participation> = self
                .reachable()?
                .participations
                .values()
                .filter(|p| p.event_id == event_id)
                .cloned()
                .collect();
            participants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
            Ok(participants)
        })
    }

    fn list_joined_events(&self, volunteer_id: UserId) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let state = self.reachable()?;
            let mut joined: Vec<&Participation> = state
                .participations
                .values()
                .filter(|p| p.volunteer_id == volunteer_id)
                .collect();
            joined.sort_by(|a, b| b.joined_at.cmp(&a.joined_at).then_with(|| a.id.cmp(&b.id)));
            Ok(joined
                .into_iter()
                .filter_map(|p| state.events.get(&p.event_id).cloned())
                .collect())
        })
    }
}

impl QueryStore for InMemoryLedger {
    fn insert_query(&self, query: Query) -> StoreFuture<'_, Query> {
        Box::pin(async move {
            let mut state = self.reachable()?;
            if !state.events.contains_key(&query.event_id) {
                return Err(LedgerError::not_found("Event", query.event_id));
            }
            state.queries.insert(query.id, query.clone());
            Ok(query)
        })
    }

    fn get_query(&self, query_id: QueryId) -> StoreFuture<'_, Option<Query>> {
        Box::pin(async move { Ok(self.reachable()?.queries.get(&query_id).cloned()) })
    }

    fn record_response(
        &self,
        query_id: QueryId,
        response: String,
        responded_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Query> {
        Box::pin(async move {
            let mut state = self.reachable()?;
            let query = state
                .queries
                .get_mut(&query_id)
                .ok_or_else(|| LedgerError::not_found("Query", query_id))?;
            if query.is_answered() {
                return Err(already_answered(query_id));
            }
            query.response = Some(response);
            query.responded_at = Some(responded_at);
            Ok(query.clone())
        })
    }

    fn list_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<QueryView>> {
        Box::pin(async move { Ok(self.reachable()?.views_where(|q| q.event_id == event_id)) })
    }

    fn list_for_asker(&self, asker_id: UserId) -> StoreFuture<'_, Vec<QueryView>> {
        Box::pin(async move { Ok(self.reachable()?.views_where(|q| q.asker_id == asker_id)) })
    }

    fn list_for_organizer(&self, organizer_id: UserId) -> StoreFuture<'_, Vec<QueryView>> {
        Box::pin(async move {
            let state = self.reachable()?;
            Ok(state.views_where(|q| {
                state
                    .events
                    .get(&q.event_id)
                    .is_some_and(|event| event.is_organized_by(organizer_id))
            }))
        })
    }

    fn delete_query(&self, query_id: QueryId) -> StoreFuture<'_, bool> {
        Box::pin(async move { Ok(self.reachable()?.queries.remove(&query_id).is_some()) })
    }
}

impl SessionStore for InMemoryLedger {
    fn resolve(&self, token: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, Option<UserId>> {
        Box::pin(async move {
            Ok(self
                .reachable()?
                .sessions
                .get(&token)
                .filter(|(_, expires_at)| *expires_at > now)
                .map(|(user_id, _)| *user_id))
        })
    }
}

impl StoreHealth for InMemoryLedger {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.reachable().map(|_| ()) })
    }
}
