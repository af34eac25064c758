//! Join/leave endpoints and rosters.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use uuid::Uuid;
use voloconnect_core::types::{Event, EventId, Participation};

use crate::error::AppError;
use crate::extractors::{ApiPath, CurrentUser};
use crate::state::AppState;

/// Membership check result.
#[derive(Debug, Serialize)]
pub struct JoinedResponse {
    /// Whether the caller is signed up
    pub joined: bool,
}

/// Confirmation for mutations without a resource body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation
    pub message: String,
}

/// `POST /api/events/:id/participants`
///
/// # Errors
///
/// `404` unknown event, `409` already joined, `400` full or closed.
pub async fn join_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<(StatusCode, Json<Participation>), AppError> {
    let participation = state
        .participation
        .join_event(EventId::from_uuid(id), user.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(participation)))
}

/// `DELETE /api/events/:id/participants/me`
///
/// # Errors
///
/// `404` unknown event, `400` not joined.
pub async fn leave_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .participation
        .leave_event(EventId::from_uuid(id), user.user_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Left event".to_string(),
    }))
}

/// `GET /api/events/:id/participants/me`
///
/// # Errors
///
/// `404` unknown event.
pub async fn has_joined(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<JoinedResponse>, AppError> {
    let joined = state
        .participation
        .has_joined(EventId::from_uuid(id), user.user_id)
        .await?;
    Ok(Json(JoinedResponse { joined }))
}

/// `GET /api/events/:id/participants`
///
/// # Errors
///
/// `404` unknown event, `403` caller is not the organizer.
pub async fn list_participants(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Participation>>, AppError> {
    let roster = state
        .participation
        .list_participants(EventId::from_uuid(id), user.user_id)
        .await?;
    Ok(Json(roster))
}

/// `GET /api/me/events`
///
/// # Errors
///
/// `503`/`500` on store failure.
pub async fn my_events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = state.participation.list_joined_events(user.user_id).await?;
    Ok(Json(events))
}
