//! [`EventStore`] for [`PostgresLedger`].

use chrono::{DateTime, Utc};
use voloconnect_core::store::{EventStore, StoreFuture};
use voloconnect_core::types::{Event, EventFilter, EventId, EventUpdate};
use voloconnect_core::{LedgerError, Result};

use crate::PostgresLedger;
use crate::error::{db_error, is_unique_violation};
use crate::rows::{EVENT_COLUMNS, EventRow, events_from_rows, to_db_count};

impl PostgresLedger {
    async fn insert_event_row(&self, event: Event) -> Result<Event> {
        sqlx::query(
            r"
            INSERT INTO events (
                id, organizer_id, title, description, location, starts_at, ends_at,
                capacity, current_volunteers, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.location.as_deref())
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(to_db_count("capacity", event.capacity)?)
        .bind(to_db_count("current_volunteers", event.current_volunteers)?)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::Conflict(format!("Event {} already exists", event.id))
            } else {
                db_error("Failed to insert event", &e)
            }
        })?;

        Ok(event)
    }

    async fn select_event(&self, event_id: EventId) -> Result<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(event_id.as_uuid())
                .fetch_optional(self.pool())
                .await
                .map_err(|e| db_error("Failed to get event", &e))?;

        row.map(Event::try_from).transpose()
    }

    async fn select_events(&self, filter: EventFilter) -> Result<Vec<Event>> {
        let offset = i64::try_from(filter.offset())
            .map_err(|_| LedgerError::Validation("page is out of range".to_string()))?;

        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            r"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR organizer_id = $2)
            ORDER BY starts_at ASC, id ASC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.organizer_id.map(|id| *id.as_uuid()))
        .bind(i64::from(filter.limit()))
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(|e| db_error("Failed to list events", &e))?;

        events_from_rows(rows)
    }

    #[tracing::instrument(skip_all, fields(event_id = %event_id))]
    async fn update_event_locked(
        &self,
        event_id: EventId,
        update: EventUpdate,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", &e))?;

        let mut event = lock_event(&mut tx, event_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Event", event_id))?;

        // Capacity is validated against the locked counter.
        update.apply_to(&mut event, now)?;

        sqlx::query(
            r"
            UPDATE events
            SET title = $2, description = $3, location = $4, starts_at = $5, ends_at = $6,
                capacity = $7, status = $8, updated_at = $9
            WHERE id = $1
            ",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.location.as_deref())
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(to_db_count("capacity", event.capacity)?)
        .bind(event.status.as_str())
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update event", &e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", &e))?;

        Ok(event)
    }

    async fn delete_event_row(&self, event_id: EventId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| db_error("Failed to delete event", &e))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Load an event and hold its row lock until `tx` ends.
pub(crate) async fn lock_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: EventId,
) -> Result<Option<Event>> {
    let row: Option<EventRow> = sqlx::query_as(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
    ))
    .bind(event_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to lock event", &e))?;

    row.map(Event::try_from).transpose()
}

impl EventStore for PostgresLedger {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(self.insert_event_row(event))
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(self.select_event(event_id))
    }

    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(self.select_events(filter))
    }

    fn update_event(
        &self,
        event_id: EventId,
        update: EventUpdate,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Event> {
        Box::pin(self.update_event_locked(event_id, update, now))
    }

    fn delete_event(&self, event_id: EventId) -> StoreFuture<'_, bool> {
        Box::pin(self.delete_event_row(event_id))
    }
}
