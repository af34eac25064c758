//! `PostgreSQL` ledger implementation for VoloConnect.
//!
//! [`PostgresLedger`] implements every store trait from `voloconnect-core`
//! over one connection pool:
//!
//! - Join, leave and event updates run in a transaction holding
//!   `SELECT ... FOR UPDATE` on the event row
//! - The counter update is additionally conditional on the stored count, so
//!   it can never push `current_volunteers` past `capacity`
//! - Queries are answered with `UPDATE ... WHERE response IS NULL`
//! - Deleting an event cascades through foreign keys
//!
//! # Example
//!
//! ```no_run
//! use voloconnect_postgres::{PoolSettings, PostgresLedger};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = PostgresLedger::connect("postgres://localhost/voloconnect", &PoolSettings::default()).await?;
//! ledger.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod events;
mod participation;
mod queries;
mod rows;
mod sessions;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use uuid::Uuid;
use voloconnect_core::types::UserId;
use voloconnect_core::{LedgerError, Result};

use crate::error::db_error;

/// Connection pool limits.
///
/// When all `max_connections` are busy, callers queue for up to
/// `acquire_timeout` and then get `TransientFailure`.
#[derive(Clone, Debug)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
    /// Close connections idle longer than this
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// `PostgreSQL`-backed ledger.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// `TransientFailure` or `Storage` when no connection can be established.
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .connect(database_url)
            .await
            .map_err(|e| db_error("Failed to connect to database", &e))?;

        tracing::info!(
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            "Database pool ready"
        );
        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// `Storage` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::Storage(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Record a bearer token for `user_id`.
    ///
    /// Tokens are normally written by the authentication layer; this exists
    /// for seeding and tests.
    ///
    /// # Errors
    ///
    /// `Storage` / `TransientFailure` on database failure.
    pub async fn issue_session(&self, user_id: UserId, expires_at: DateTime<Utc>) -> Result<Uuid> {
        let token = Uuid::new_v4();
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id.as_uuid())
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to issue session", &e))?;
        Ok(token)
    }

    /// Close every connection. Subsequent calls fail with `TransientFailure`.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
