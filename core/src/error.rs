//! Error taxonomy for ledger operations.
//!
//! Every service and store operation returns [`LedgerError`]. The HTTP layer
//! maps each variant onto a status code; nothing below it decides how an error
//! is presented.

use crate::types::{EventId, EventStatus};
use std::fmt;
use thiserror::Error;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failure modes of the participation and query ledgers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // ═══════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// Referenced event, query or participation does not exist.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of resource that was looked up
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Ledger Rule Violations
    // ═══════════════════════════════════════════════════════════

    /// The write would duplicate existing state (double join, second answer).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The event has no remaining volunteer slots.
    #[error("Event {event_id} is at capacity ({capacity} volunteers)")]
    CapacityExceeded {
        /// Event that is full
        event_id: EventId,
        /// Its capacity
        capacity: u32,
    },

    /// Leave was requested by a volunteer without a participation record.
    #[error("Volunteer has not joined event {event_id}")]
    NotJoined {
        /// Event the volunteer tried to leave
        event_id: EventId,
    },

    /// The event is completed or cancelled and no longer takes volunteers.
    #[error("Event {event_id} is {status} and does not accept volunteers")]
    EventClosed {
        /// Event that was targeted
        event_id: EventId,
        /// Its current status
        status: EventStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // Caller Errors
    // ═══════════════════════════════════════════════════════════

    /// The actor lacks the required ownership or role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed or out-of-range input.
    #[error("Validation error: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Retryable infrastructure failure (pool exhausted, deadlock, serialization failure).
    #[error("Transient failure: {0}")]
    TransientFailure(String),

    /// Non-retryable storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Build a [`LedgerError::NotFound`] for the given resource kind and id.
    pub fn not_found(resource: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Returns `true` when retrying the whole operation may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use voloconnect_core::LedgerError;
    /// assert!(LedgerError::TransientFailure("pool timed out".into()).is_transient());
    /// assert!(!LedgerError::Conflict("already joined".into()).is_transient());
    /// ```
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFailure(_))
    }

    /// Returns `true` for errors caused by the caller rather than the system.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::TransientFailure(_) | Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = LedgerError::not_found("Event", "123");
        assert_eq!(err.to_string(), "Event with id 123 not found");
    }

    #[test]
    fn test_user_errors() {
        assert!(LedgerError::Validation("empty".into()).is_user_error());
        assert!(LedgerError::NotJoined { event_id: EventId::new() }.is_user_error());
        assert!(!LedgerError::Storage("boom".into()).is_user_error());
        assert!(!LedgerError::TransientFailure("pool".into()).is_user_error());
    }
}
