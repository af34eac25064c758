//! Questions about events and their one-time organizer answers.

use crate::environment::Clock;
use crate::error::{LedgerError, Result};
use crate::metrics::record_query;
use crate::store::{EventStore, QueryStore};
use crate::types::{normalize_text, Event, EventId, Query, QueryId, QueryView, UserId, MAX_MESSAGE_LEN};
use std::sync::Arc;
use tracing::info;

/// Query/answer ledger.
///
/// The first answer wins: a second `respond_to_query` on an answered query
/// fails with `Conflict` and leaves the original answer in place.
#[derive(Clone)]
pub struct QueryService {
    events: Arc<dyn EventStore>,
    queries: Arc<dyn QueryStore>,
    clock: Arc<dyn Clock>,
}

impl QueryService {
    /// Create a new query service.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, queries: Arc<dyn QueryStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            events,
            queries,
            clock,
        }
    }

    /// Ask a question about an event.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty or oversized message
    /// - `NotFound`: event absent
    #[tracing::instrument(skip_all, fields(event_id = %event_id, asker_id = %asker_id))]
    pub async fn create_query(&self, event_id: EventId, asker_id: UserId, message: &str) -> Result<Query> {
        let message = normalize_text("message", message, MAX_MESSAGE_LEN)?;
        self.require_event(event_id).await?;

        let query = self
            .queries
            .insert_query(Query::new(event_id, asker_id, message, self.clock.now()))
            .await?;

        record_query("created");
        info!(query_id = %query.id, "Query created");
        Ok(query)
    }

    /// Answer a query. Only the organizer of the query's event may answer.
    ///
    /// # Errors
    ///
    /// - `NotFound`: query (or its event) absent
    /// - `Forbidden`: responder is not the organizer
    /// - `Validation`: empty or oversized response
    /// - `Conflict`: the query was already answered
    #[tracing::instrument(skip_all, fields(query_id = %query_id, responder_id = %responder_id))]
    pub async fn respond_to_query(
        &self,
        query_id: QueryId,
        responder_id: UserId,
        response: &str,
    ) -> Result<Query> {
        let query = self.require_query(query_id).await?;
        let event = self.require_event(query.event_id).await?;
        if !event.is_organized_by(responder_id) {
            return Err(LedgerError::Forbidden(
                "Only the event organizer can answer its queries".to_string(),
            ));
        }
        let response = normalize_text("response", response, MAX_MESSAGE_LEN)?;
        if query.is_answered() {
            return Err(already_answered(query_id));
        }

        let answered = self
            .queries
            .record_response(query_id, response, self.clock.now())
            .await?;

        record_query("answered");
        info!("Query answered");
        Ok(answered)
    }

    /// Queries about one event, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the event does not exist.
    pub async fn list_queries_for_event(&self, event_id: EventId) -> Result<Vec<QueryView>> {
        self.require_event(event_id).await?;
        self.queries.list_for_event(event_id).await
    }

    /// Queries the user asked, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_queries_for_user(&self, user_id: UserId) -> Result<Vec<QueryView>> {
        self.queries.list_for_asker(user_id).await
    }

    /// Queries about events the user organizes, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_queries_for_organizer(&self, organizer_id: UserId) -> Result<Vec<QueryView>> {
        self.queries.list_for_organizer(organizer_id).await
    }

    /// Delete a query. Only its asker may do so.
    ///
    /// # Errors
    ///
    /// - `NotFound`: query absent
    /// - `Forbidden`: requester did not ask it
    #[tracing::instrument(skip_all, fields(query_id = %query_id, requester_id = %requester_id))]
    pub async fn delete_query(&self, query_id: QueryId, requester_id: UserId) -> Result<()> {
        let query = self.require_query(query_id).await?;
        if query.asker_id != requester_id {
            return Err(LedgerError::Forbidden(
                "Only the asker can delete a query".to_string(),
            ));
        }
        if !self.queries.delete_query(query_id).await? {
            return Err(LedgerError::not_found("Query", query_id));
        }

        record_query("deleted");
        info!("Query deleted");
        Ok(())
    }

    async fn require_event(&self, event_id: EventId) -> Result<Event> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Event", event_id))
    }

    async fn require_query(&self, query_id: QueryId) -> Result<Query> {
        self.queries
            .get_query(query_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Query", query_id))
    }
}

/// The error both stores return for a second answer.
#[must_use]
pub fn already_answered(query_id: QueryId) -> LedgerError {
    LedgerError::Conflict(format!("Query {query_id} has already been answered"))
}
