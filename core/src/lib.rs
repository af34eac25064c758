//! # VoloConnect Core
//!
//! Domain types, storage traits and services for the volunteer
//! participation ledger.
//!
//! ## Concepts
//!
//! - **Event**: an opportunity with a fixed volunteer capacity and a counter
//!   of current volunteers
//! - **Participation**: one volunteer's membership in one event
//! - **Query**: a question about an event, answered at most once by its organizer
//!
//! ## Invariants
//!
//! For every event, `0 <= current_volunteers <= capacity` and
//! `current_volunteers` equals the number of participation rows. Store
//! implementations keep both by re-checking inside one atomic unit; see
//! [`store::ParticipationStore::join`].
//!
//! ## Example
//!
//! ```ignore
//! use voloconnect_core::services::ParticipationService;
//!
//! let service = ParticipationService::new(ledger.clone(), ledger, clock);
//! let participation = service.join_event(event_id, volunteer_id).await?;
//! ```

pub mod environment;
pub mod error;
pub mod metrics;
pub mod services;
pub mod store;
pub mod types;

pub use error::{LedgerError, Result};
pub use types::{
    Event, EventFilter, EventId, EventStatus, EventUpdate, NewEvent, Participation,
    ParticipationId, Query, QueryId, QueryView, UserId,
};
