//! [`QueryStore`] for [`PostgresLedger`].

use chrono::{DateTime, Utc};
use voloconnect_core::services::queries::already_answered;
use voloconnect_core::store::{QueryStore, StoreFuture};
use voloconnect_core::types::{EventId, Query, QueryId, QueryView, UserId};
use voloconnect_core::{LedgerError, Result};

use crate::PostgresLedger;
use crate::error::{db_error, is_foreign_key_violation};
use crate::rows::{QUERY_COLUMNS, QueryRow, QueryViewRow};

/// Which projection to list.
#[derive(Clone, Copy)]
enum Scope {
    Event(EventId),
    Asker(UserId),
    Organizer(UserId),
}

impl Scope {
    const fn predicate(self) -> &'static str {
        match self {
            Self::Event(_) => "q.event_id = $1",
            Self::Asker(_) => "q.asker_id = $1",
            Self::Organizer(_) => "e.organizer_id = $1",
        }
    }

    const fn id(self) -> uuid::Uuid {
        match self {
            Self::Event(id) => *id.as_uuid(),
            Self::Asker(id) | Self::Organizer(id) => *id.as_uuid(),
        }
    }
}

impl PostgresLedger {
    async fn insert_query_row(&self, query: Query) -> Result<Query> {
        sqlx::query(
            r"
            INSERT INTO queries (id, event_id, asker_id, message, response, created_at, responded_at)
            VALUES ($1, $2, $3, $4, NULL, $5, NULL)
            ",
        )
        .bind(query.id.as_uuid())
        .bind(query.event_id.as_uuid())
        .bind(query.asker_id.as_uuid())
        .bind(&query.message)
        .bind(query.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                LedgerError::not_found("Event", query.event_id)
            } else {
                db_error("Failed to insert query", &e)
            }
        })?;

        Ok(query)
    }

    async fn select_query(&self, query_id: QueryId) -> Result<Option<Query>> {
        let row: Option<QueryRow> =
            sqlx::query_as(&format!("SELECT {QUERY_COLUMNS} FROM queries WHERE id = $1"))
                .bind(query_id.as_uuid())
                .fetch_optional(self.pool())
                .await
                .map_err(|e| db_error("Failed to get query", &e))?;

        Ok(row.map(Query::from))
    }

    #[tracing::instrument(skip_all, fields(query_id = %query_id))]
    async fn answer_once(
        &self,
        query_id: QueryId,
        response: String,
        responded_at: DateTime<Utc>,
    ) -> Result<Query> {
        let row: Option<QueryRow> = sqlx::query_as(&format!(
            r"
            UPDATE queries
            SET response = $2, responded_at = $3
            WHERE id = $1 AND response IS NULL
            RETURNING {QUERY_COLUMNS}
            "
        ))
        .bind(query_id.as_uuid())
        .bind(&response)
        .bind(responded_at)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| db_error("Failed to record response", &e))?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        // Nothing updated: either the query is gone or someone answered first.
        match self.select_query(query_id).await? {
            Some(_) => Err(already_answered(query_id)),
            None => Err(LedgerError::not_found("Query", query_id)),
        }
    }

    async fn select_views(&self, scope: Scope) -> Result<Vec<QueryView>> {
        let rows: Vec<QueryViewRow> = sqlx::query_as(&format!(
            r"
            SELECT q.id, q.event_id, q.asker_id, q.message, q.response, q.created_at,
                   q.responded_at, e.title AS event_title
            FROM queries q
            JOIN events e ON e.id = q.event_id
            WHERE {}
            ORDER BY q.created_at DESC, q.id ASC
            ",
            scope.predicate()
        ))
        .bind(scope.id())
        .fetch_all(self.pool())
        .await
        .map_err(|e| db_error("Failed to list queries", &e))?;

        Ok(rows.into_iter().map(QueryView::from).collect())
    }

    async fn delete_query_row(&self, query_id: QueryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM queries WHERE id = $1")
            .bind(query_id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| db_error("Failed to delete query", &e))?;

        Ok(result.rows_affected() > 0)
    }
}

impl QueryStore for PostgresLedger {
    fn insert_query(&self, query: Query) -> StoreFuture<'_, Query> {
        Box::pin(self.insert_query_row(query))
    }

    fn get_query(&self, query_id: QueryId) -> StoreFuture<'_, Option<Query>> {
        Box::pin(self.select_query(query_id))
    }

    fn record_response(
        &self,
        query_id: QueryId,
        response: String,
        responded_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Query> {
        Box::pin(self.answer_once(query_id, response, responded_at))
    }

    fn list_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<QueryView>> {
        Box::pin(self.select_views(Scope::Event(event_id)))
    }

    fn list_for_asker(&self, asker_id: UserId) -> StoreFuture<'_, Vec<QueryView>> {
        Box::pin(self.select_views(Scope::Asker(asker_id)))
    }

    fn list_for_organizer(&self, organizer_id: UserId) -> StoreFuture<'_, Vec<QueryView>> {
        Box::pin(self.select_views(Scope::Organizer(organizer_id)))
    }

    fn delete_query(&self, query_id: QueryId) -> StoreFuture<'_, bool> {
        Box::pin(self.delete_query_row(query_id))
    }
}
