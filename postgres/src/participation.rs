//! [`ParticipationStore`] for [`PostgresLedger`].
//!
//! # Join protocol
//!
//! 1. `BEGIN`
//! 2. `SELECT ... FROM events WHERE id = $1 FOR UPDATE` (racing joins queue here)
//! 3. Reject a duplicate membership, then [`Event::ensure_joinable`]
//! 4. `UPDATE events ... WHERE id = $1 AND current_volunteers = $expected AND $new <= capacity`
//! 5. `INSERT INTO participations`
//! 6. `COMMIT`
//!
//! Any error drops the transaction, which rolls it back.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Postgres, Transaction};
use voloconnect_core::services::participation::already_joined;
use voloconnect_core::store::{ParticipationStore, StoreFuture};
use voloconnect_core::types::{Event, EventId, Participation, UserId};
use voloconnect_core::{LedgerError, Result};

use crate::PostgresLedger;
use crate::error::{db_error, is_unique_violation};
use crate::events::lock_event;
use crate::rows::{EventRow, JOINED_EVENT_COLUMNS, ParticipationRow, events_from_rows, to_db_count};

impl PostgresLedger {
    #[tracing::instrument(
        skip_all,
        fields(event_id = %participation.event_id, volunteer_id = %participation.volunteer_id)
    )]
    async fn join_locked(&self, participation: Participation) -> Result<Participation> {
        let event_id = participation.event_id;
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", &e))?;

        let mut event = lock_event(&mut tx, event_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Event", event_id))?;

        if membership_exists(&mut *tx, event_id, participation.volunteer_id).await? {
            return Err(already_joined(event_id));
        }
        event.ensure_joinable()?;

        let expected = event.current_volunteers;
        event.record_join(participation.joined_at);
        write_counter(&mut tx, &event, expected).await?;

        sqlx::query(
            r"
            INSERT INTO participations (id, event_id, volunteer_id, joined_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(participation.id.as_uuid())
        .bind(event_id.as_uuid())
        .bind(participation.volunteer_id.as_uuid())
        .bind(participation.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                already_joined(event_id)
            } else {
                db_error("Failed to insert participation", &e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", &e))?;

        tracing::debug!(current_volunteers = event.current_volunteers, "Join committed");
        Ok(participation)
    }

    #[tracing::instrument(skip_all, fields(event_id = %event_id, volunteer_id = %volunteer_id))]
    async fn leave_locked(
        &self,
        event_id: EventId,
        volunteer_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", &e))?;

        let mut event = lock_event(&mut tx, event_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Event", event_id))?;

        let deleted = sqlx::query(
            "DELETE FROM participations WHERE event_id = $1 AND volunteer_id = $2",
        )
        .bind(event_id.as_uuid())
        .bind(volunteer_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to delete participation", &e))?;

        if deleted.rows_affected() == 0 {
            return Err(LedgerError::NotJoined { event_id });
        }

        // record_leave floors the counter at zero even if historical rows drifted.
        let expected = event.current_volunteers;
        event.record_leave(now);
        write_counter(&mut tx, &event, expected).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", &e))?;

        tracing::debug!(current_volunteers = event.current_volunteers, "Leave committed");
        Ok(())
    }

    async fn select_has_joined(&self, event_id: EventId, volunteer_id: UserId) -> Result<bool> {
        membership_exists(self.pool(), event_id, volunteer_id).await
    }

    async fn select_participants(&self, event_id: EventId) -> Result<Vec<Participation>> {
        let rows: Vec<ParticipationRow> = sqlx::query_as(
            r"
            SELECT id, event_id, volunteer_id, joined_at
            FROM participations
            WHERE event_id = $1
            ORDER BY joined_at ASC, id ASC
            ",
        )
        .bind(event_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| db_error("Failed to list participants", &e))?;

        Ok(rows.into_iter().map(Participation::from).collect())
    }

    async fn select_joined_events(&self, volunteer_id: UserId) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            r"
            SELECT {JOINED_EVENT_COLUMNS}
            FROM participations p
            JOIN events e ON e.id = p.event_id
            WHERE p.volunteer_id = $1
            ORDER BY p.joined_at DESC, p.id ASC
            "
        ))
        .bind(volunteer_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| db_error("Failed to list joined events", &e))?;

        events_from_rows(rows)
    }
}

async fn membership_exists<'e>(
    executor: impl PgExecutor<'e>,
    event_id: EventId,
    volunteer_id: UserId,
) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM participations WHERE event_id = $1 AND volunteer_id = $2)",
    )
    .bind(event_id.as_uuid())
    .bind(volunteer_id.as_uuid())
    .fetch_one(executor)
    .await
    .map_err(|e| db_error("Failed to check participation", &e))?;

    Ok(exists)
}

/// Write the counter and status of a locked event.
///
/// Conditional on the count read under the lock and on staying within
/// capacity; zero affected rows means the row moved underneath us.
async fn write_counter(
    tx: &mut Transaction<'_, Postgres>,
    event: &Event,
    expected: u32,
) -> Result<()> {
    let result = sqlx::query(
        r"
        UPDATE events
        SET current_volunteers = $2, status = $3, updated_at = $4
        WHERE id = $1 AND current_volunteers = $5 AND $2 <= capacity
        ",
    )
    .bind(event.id.as_uuid())
    .bind(to_db_count("current_volunteers", event.current_volunteers)?)
    .bind(event.status.as_str())
    .bind(event.updated_at)
    .bind(to_db_count("current_volunteers", expected)?)
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to update volunteer count", &e))?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::CapacityExceeded {
            event_id: event.id,
            capacity: event.capacity,
        });
    }
    Ok(())
}

impl ParticipationStore for PostgresLedger {
    fn join(&self, participation: Participation) -> StoreFuture<'_, Participation> {
        Box::pin(self.join_locked(participation))
    }

    fn leave(
        &self,
        event_id: EventId,
        volunteer_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(self.leave_locked(event_id, volunteer_id, now))
    }

    fn has_joined(&self, event_id: EventId, volunteer_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(self.select_has_joined(event_id, volunteer_id))
    }

    fn list_participants(&self, event_id: EventId) -> StoreFuture<'_, Vec<Participation>> {
        Box::pin(self.select_participants(event_id))
    }

    fn list_joined_events(&self, volunteer_id: UserId) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(self.select_joined_events(volunteer_id))
    }
}
