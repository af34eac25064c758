//! Router configuration.

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{events, health, participation, queries};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;

/// Build the complete router.
///
/// Health checks sit at the root without authentication; everything else is
/// nested under `/api`. Callers add CORS and other deployment layers.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Events
        .route("/events", post(events::create_event).get(events::list_events))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        // Participation
        .route(
            "/events/:id/participants",
            post(participation::join_event).get(participation::list_participants),
        )
        .route(
            "/events/:id/participants/me",
            get(participation::has_joined).delete(participation::leave_event),
        )
        .route("/me/events", get(participation::my_events))
        // Queries
        .route(
            "/events/:id/queries",
            post(queries::create_query).get(queries::list_event_queries),
        )
        .route("/me/queries", get(queries::my_queries))
        .route("/me/organizer/queries", get(queries::organizer_queries))
        .route("/queries/:id/response", put(queries::respond_to_query))
        .route("/queries/:id", axum::routing::delete(queries::delete_query));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
