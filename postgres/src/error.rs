//! Mapping of sqlx failures onto [`LedgerError`].

use voloconnect_core::LedgerError;

/// SQLSTATE for `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

/// Whether retrying the whole operation may succeed.
pub(crate) fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
        ),
        _ => false,
    }
}

/// Convert a sqlx error, prefixing `context`.
///
/// Pool exhaustion, dropped connections, deadlocks and serialization
/// failures become `TransientFailure`; everything else is `Storage`.
pub(crate) fn db_error(context: &str, err: &sqlx::Error) -> LedgerError {
    if is_transient(err) {
        metrics::counter!("voloconnect_db_errors_total", "kind" => "transient").increment(1);
        tracing::warn!(error = %err, context, "Transient database failure");
        LedgerError::TransientFailure(format!("{context}: {err}"))
    } else {
        metrics::counter!("voloconnect_db_errors_total", "kind" => "storage").increment(1);
        tracing::error!(error = %err, context, "Database failure");
        LedgerError::Storage(format!("{context}: {err}"))
    }
}

/// Whether `err` is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Whether `err` is a foreign-key violation.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = db_error("join", &sqlx::Error::PoolTimedOut);
        assert!(matches!(err, LedgerError::TransientFailure(ref msg) if msg.starts_with("join: ")));
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_failures_are_storage() {
        let err = db_error("get event", &sqlx::Error::RowNotFound);
        assert!(matches!(err, LedgerError::Storage(_)));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }
}
