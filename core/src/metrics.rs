//! Business metrics for the participation ledger.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `voloconnect_participations_total{outcome}` - Join/leave attempts by outcome
//! - `voloconnect_queries_total{action}` - Queries created, answered, deleted
//! - `voloconnect_events_total{action}` - Events created, updated, deleted

use crate::error::LedgerError;
use metrics::describe_counter;

/// Register metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        "voloconnect_participations_total",
        "Join and leave attempts by outcome (joined, left, conflict, capacity_exceeded, ...)"
    );
    describe_counter!(
        "voloconnect_queries_total",
        "Queries by action (created, answered, deleted)"
    );
    describe_counter!(
        "voloconnect_events_total",
        "Events by action (created, updated, deleted)"
    );

    tracing::info!("Business metrics registered");
}

/// Record the outcome of a join or leave attempt.
pub fn record_participation(outcome: &'static str) {
    metrics::counter!("voloconnect_participations_total", "outcome" => outcome).increment(1);
}

/// Record a query ledger mutation.
pub fn record_query(action: &'static str) {
    metrics::counter!("voloconnect_queries_total", "action" => action).increment(1);
}

/// Record an event mutation.
pub fn record_event(action: &'static str) {
    metrics::counter!("voloconnect_events_total", "action" => action).increment(1);
}

/// Label for a failed participation attempt.
#[must_use]
pub const fn failure_outcome(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::NotFound { .. } => "not_found",
        LedgerError::Conflict(_) => "conflict",
        LedgerError::CapacityExceeded { .. } => "capacity_exceeded",
        LedgerError::NotJoined { .. } => "not_joined",
        LedgerError::EventClosed { .. } => "event_closed",
        LedgerError::Forbidden(_) => "forbidden",
        LedgerError::Validation(_) => "invalid",
        LedgerError::TransientFailure(_) => "transient_failure",
        LedgerError::Storage(_) => "storage_error",
    }
}
