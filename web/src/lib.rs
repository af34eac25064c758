//! HTTP surface of the volunteer participation ledger.
//!
//! Handlers stay thin: extract the caller and inputs, call one service
//! operation, map the result. Every [`voloconnect_core::LedgerError`] turns
//! into an [`AppError`] with a stable status and code.
//!
//! # Request Flow
//!
//! 1. [`middleware`] assigns a correlation id and opens a request span
//! 2. [`extractors::CurrentUser`] resolves the bearer token to a user
//! 3. The handler calls a service in [`AppState`]
//! 4. The result or [`AppError`] becomes a JSON response
//!
//! # Example
//!
//! ```ignore
//! use voloconnect_web::{AppState, build_router};
//!
//! let state = AppState::from_ledger(ledger, Arc::new(SystemClock));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{ApiJson, ApiPath, ApiQuery, BearerToken, CorrelationId, CurrentUser};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
