//! Question and answer endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;
use voloconnect_core::types::{EventId, Query, QueryId, QueryView};

use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, CurrentUser};
use crate::handlers::participation::MessageResponse;
use crate::state::AppState;

/// Body of `POST /api/events/:id/queries`.
#[derive(Debug, Deserialize)]
pub struct CreateQueryRequest {
    /// Question text
    pub message: String,
}

/// Body of `PUT /api/queries/:id/response`.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    /// Answer text
    pub response: String,
}

/// Ask a question about an event.
///
/// # Errors
///
/// `404` unknown event, `400` blank or oversized message.
pub async fn create_query(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CreateQueryRequest>,
) -> Result<(StatusCode, Json<Query>), AppError> {
    let query = state
        .queries
        .create_query(EventId::from_uuid(id), user.user_id, &request.message)
        .await?;
    Ok((StatusCode::CREATED, Json(query)))
}

/// Answer a question. Organizer only, first answer wins.
///
/// # Errors
///
/// `404` unknown query, `403` not the organizer, `409` already answered.
pub async fn respond_to_query(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RespondRequest>,
) -> Result<Json<Query>, AppError> {
    let query = state
        .queries
        .respond_to_query(QueryId::from_uuid(id), user.user_id, &request.response)
        .await?;
    Ok(Json(query))
}

/// Questions about one event.
///
/// # Errors
///
/// `404` unknown event.
pub async fn list_event_queries(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<QueryView>>, AppError> {
    let views = state
        .queries
        .list_queries_for_event(EventId::from_uuid(id))
        .await?;
    Ok(Json(views))
}

/// Questions the caller asked.
///
/// # Errors
///
/// `503`/`500` on store failure.
pub async fn my_queries(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<QueryView>>, AppError> {
    let views = state.queries.list_queries_for_user(user.user_id).await?;
    Ok(Json(views))
}

/// Questions on the caller's events.
///
/// # Errors
///
/// `503`/`500` on store failure.
pub async fn organizer_queries(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<QueryView>>, AppError> {
    let views = state
        .queries
        .list_queries_for_organizer(user.user_id)
        .await?;
    Ok(Json(views))
}

/// Withdraw a question. Asker only.
///
/// # Errors
///
/// `404` unknown query, `403` not the asker.
pub async fn delete_query(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .queries
        .delete_query(QueryId::from_uuid(id), user.user_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Query deleted".to_string(),
    }))
}
