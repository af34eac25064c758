//! Storage abstractions for events, participation, queries and sessions.
//!
//! # Implementations
//!
//! - `PostgresLedger` (in `voloconnect-postgres`): production implementation
//! - `InMemoryLedger` (in `voloconnect-testing`): fast, deterministic testing
//!
//! Both implement every trait here on a single type, because joining and
//! leaving touch the event row and the participation table in one atomic step.
//!
//! # Dyn Compatibility
//!
//! Methods return [`StoreFuture`] instead of using `async fn` so the services
//! can hold `Arc<dyn EventStore>` and friends.

use crate::error::Result;
use crate::types::{
    Event, EventFilter, EventId, EventUpdate, Participation, Query, QueryId, QueryView, UserId,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Event records.
pub trait EventStore: Send + Sync {
    /// Persist a freshly created event.
    ///
    /// # Errors
    ///
    /// - `Conflict`: an event with the same id exists
    /// - `Storage` / `TransientFailure`: database failure
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event>;

    /// Load one event, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// List events matching `filter`, ordered by start time.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<Event>>;

    /// Apply `update` to the stored event while holding it exclusively.
    ///
    /// Implementations must call [`EventUpdate::apply_to`] on the locked row
    /// so the capacity check sees the current volunteer count.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `Validation`: rejected by [`EventUpdate::apply_to`]
    fn update_event(
        &self,
        event_id: EventId,
        update: EventUpdate,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Event>;

    /// Delete an event together with its participation and query rows.
    ///
    /// Returns `false` when the event did not exist.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn delete_event(&self, event_id: EventId) -> StoreFuture<'_, bool>;
}

/// Membership of volunteers in events.
pub trait ParticipationStore: Send + Sync {
    /// Atomically re-check and record a join.
    ///
    /// Within one atomic unit the implementation must: lock the event,
    /// verify it exists, reject a duplicate membership, call
    /// [`Event::ensure_joinable`], apply [`Event::record_join`] and insert
    /// `participation`. Any failure leaves no trace.
    ///
    /// # Errors
    ///
    /// - `NotFound`: event missing
    /// - `Conflict`: volunteer already joined
    /// - `CapacityExceeded` / `EventClosed`: event cannot take the volunteer
    fn join(&self, participation: Participation) -> StoreFuture<'_, Participation>;

    /// Atomically remove a membership and decrement the counter (floored at zero).
    ///
    /// # Errors
    ///
    /// - `NotFound`: event missing
    /// - `NotJoined`: no membership for the pair
    fn leave(
        &self,
        event_id: EventId,
        volunteer_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, ()>;

    /// Whether a membership exists for the pair.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn has_joined(&self, event_id: EventId, volunteer_id: UserId) -> StoreFuture<'_, bool>;

    /// All memberships of an event, oldest first.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn list_participants(&self, event_id: EventId) -> StoreFuture<'_, Vec<Participation>>;

    /// Events a volunteer joined, most recent join first.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn list_joined_events(&self, volunteer_id: UserId) -> StoreFuture<'_, Vec<Event>>;
}

/// Questions and organizer answers.
pub trait QueryStore: Send + Sync {
    /// Persist a new, unanswered query.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the event vanished before the insert
    fn insert_query(&self, query: Query) -> StoreFuture<'_, Query>;

    /// Load one query.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn get_query(&self, query_id: QueryId) -> StoreFuture<'_, Option<Query>>;

    /// Set the response if and only if none is set yet.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such query
    /// - `Conflict`: already answered
    fn record_response(
        &self,
        query_id: QueryId,
        response: String,
        responded_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Query>;

    /// Queries about one event, newest first.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn list_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<QueryView>>;

    /// Queries asked by one user, newest first.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn list_for_asker(&self, asker_id: UserId) -> StoreFuture<'_, Vec<QueryView>>;

    /// Queries about events organized by one user, newest first.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn list_for_organizer(&self, organizer_id: UserId) -> StoreFuture<'_, Vec<QueryView>>;

    /// Delete a query. Returns `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn delete_query(&self, query_id: QueryId) -> StoreFuture<'_, bool>;
}

/// Resolution of bearer tokens to users.
pub trait SessionStore: Send + Sync {
    /// Resolve `token` to its user, `None` when unknown or expired at `now`.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    fn resolve(&self, token: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, Option<UserId>>;
}

/// Readiness check for the backing store.
pub trait StoreHealth: Send + Sync {
    /// Round-trip to the backing store.
    ///
    /// # Errors
    ///
    /// Any error means the store cannot currently serve requests.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
