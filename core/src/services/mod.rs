//! Application services over the store traits.
//!
//! Each service holds `Arc<dyn ...>` handles plus a [`Clock`](crate::environment::Clock)
//! and is cheap to clone into request handlers.

pub mod events;
pub mod participation;
pub mod queries;

pub use events::EventService;
pub use participation::ParticipationService;
pub use queries::QueryService;
