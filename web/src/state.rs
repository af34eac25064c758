//! Application state shared across handlers.

use std::sync::Arc;
use voloconnect_core::environment::Clock;
use voloconnect_core::services::{EventService, ParticipationService, QueryService};
use voloconnect_core::store::{EventStore, ParticipationStore, QueryStore, SessionStore, StoreHealth};

/// Everything a handler needs, cheap to clone.
///
/// # Examples
///
/// ```ignore
/// let ledger = Arc::new(PostgresLedger::connect(&url, &settings).await?);
/// let state = AppState::from_ledger(ledger, Arc::new(SystemClock));
/// let app = build_router(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Event lifecycle
    pub events: EventService,
    /// Join/leave and rosters
    pub participation: ParticipationService,
    /// Questions and answers
    pub queries: QueryService,
    /// Bearer token resolution
    pub sessions: Arc<dyn SessionStore>,
    /// Readiness check target
    pub health: Arc<dyn StoreHealth>,
    /// Time source for session expiry
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Assemble state from individual parts.
    #[must_use]
    pub fn new(
        events: EventService,
        participation: ParticipationService,
        queries: QueryService,
        sessions: Arc<dyn SessionStore>,
        health: Arc<dyn StoreHealth>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            participation,
            queries,
            sessions,
            health,
            clock,
        }
    }

    /// Wire every service to one ledger that implements all store traits.
    #[must_use]
    pub fn from_ledger<L>(ledger: Arc<L>, clock: Arc<dyn Clock>) -> Self
    where
        L: EventStore + ParticipationStore + QueryStore + SessionStore + StoreHealth + 'static,
    {
        Self {
            events: EventService::new(ledger.clone(), clock.clone()),
            participation: ParticipationService::new(ledger.clone(), ledger.clone(), clock.clone()),
            queries: QueryService::new(ledger.clone(), ledger.clone(), clock.clone()),
            sessions: ledger.clone(),
            health: ledger,
            clock,
        }
    }
}
