//! [`SessionStore`] and [`StoreHealth`] for [`PostgresLedger`].

use chrono::{DateTime, Utc};
use uuid::Uuid;
use voloconnect_core::Result;
use voloconnect_core::store::{SessionStore, StoreFuture, StoreHealth};
use voloconnect_core::types::UserId;

use crate::PostgresLedger;
use crate::error::db_error;

impl PostgresLedger {
    async fn select_session_user(&self, token: Uuid, now: DateTime<Utc>) -> Result<Option<UserId>> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM sessions WHERE token = $1 AND expires_at > $2")
                .bind(token)
                .bind(now)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| db_error("Failed to resolve session", &e))?;

        Ok(row.map(|(user_id,)| UserId::from_uuid(user_id)))
    }

    async fn select_one(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool())
            .await
            .map_err(|e| db_error("Health check failed", &e))?;
        Ok(())
    }
}

impl SessionStore for PostgresLedger {
    fn resolve(&self, token: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, Option<UserId>> {
        Box::pin(self.select_session_user(token, now))
    }
}

impl StoreHealth for PostgresLedger {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.select_one())
    }
}
