//! Event management endpoints.
//!
//! - `POST /api/events`: create an event (auth)
//! - `GET /api/events`: list events with filters and pagination
//! - `GET /api/events/:id`: event details
//! - `PUT /api/events/:id`: edit (organizer only)
//! - `DELETE /api/events/:id`: delete with cascade (organizer only)

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voloconnect_core::types::{
    DEFAULT_PAGE_SIZE, Event, EventFilter, EventId, EventStatus, EventUpdate, NewEvent, UserId,
};

use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;

/// Query parameters for listing events.
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    /// Page number (0-indexed)
    #[serde(default)]
    pub page: u32,
    /// Page size (default: 20, max: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Filter by status
    pub status: Option<EventStatus>,
    /// Filter by organizer
    pub organizer_id: Option<Uuid>,
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// One page of events.
#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    /// Events on this page
    pub events: Vec<Event>,
    /// Current page
    pub page: u32,
    /// Effective page size
    pub page_size: u32,
}

/// Create an event owned by the caller.
///
/// # Errors
///
/// `400` when the title is blank or capacity is zero.
pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<NewEvent>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state.events.create_event(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events.
///
/// # Errors
///
/// `503`/`500` on store failure.
pub async fn list_events(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListEventsQuery>,
) -> Result<Json<ListEventsResponse>, AppError> {
    let filter = EventFilter {
        status: params.status,
        organizer_id: params.organizer_id.map(UserId::from_uuid),
        page: params.page,
        page_size: params.page_size,
    };
    let events = state.events.list_events(filter).await?;

    Ok(Json(ListEventsResponse {
        events,
        page: filter.page,
        page_size: filter.limit(),
    }))
}

/// Get one event.
///
/// # Errors
///
/// `404` when absent.
pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Event>, AppError> {
    let event = state.events.get_event(EventId::from_uuid(id)).await?;
    Ok(Json(event))
}

/// Edit an event.
///
/// # Errors
///
/// `403` for non-organizers, `404` when absent, `400` for invalid edits.
pub async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<EventUpdate>,
) -> Result<Json<Event>, AppError> {
    let event = state
        .events
        .update_event(EventId::from_uuid(id), user.user_id, update)
        .await?;
    Ok(Json(event))
}

/// Delete an event and everything attached to it.
///
/// # Errors
///
/// `403` for non-organizers, `404` when absent.
pub async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .events
        .delete_event(EventId::from_uuid(id), user.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
