//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation id
//! - `BearerToken`: the session token from `Authorization: Bearer <uuid>`
//! - `CurrentUser`: the user behind a live session
//! - `ApiJson`, `ApiPath`, `ApiQuery`: axum's `Json`, `Path` and `Query`
//!   with rejections reported as [`AppError`]
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     user: CurrentUser,
//!     correlation_id: CorrelationId,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, user_id = %user.user_id, "Processing request");
//!     Ok(Json(response))
//! }
//! ```

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;
use voloconnect_core::types::UserId;

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use crate::state::AppState;

/// Correlation ID for request tracing.
///
/// Reads the id stored by the correlation middleware, falling back to the
/// `X-Correlation-ID` header, or a fresh UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<CorrelationId>() {
            return Ok(*id);
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// JSON body. Malformed or mistyped bodies become `400 VALIDATION_ERROR`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters. Unparseable ids become `400 VALIDATION_ERROR`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string parameters. Bad values become `400 VALIDATION_ERROR`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Session token extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct BearerToken(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
        })?;

        Uuid::parse_str(token.trim())
            .map(Self)
            .map_err(|_| AppError::unauthorized("Malformed bearer token"))
    }
}

/// Authenticated user.
///
/// Use as a handler parameter to require a live session.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    /// The authenticated user
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        let user_id = state
            .sessions
            .resolve(token, state.clock.now())
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;

        tracing::debug!(user_id = %user_id, "Session resolved");
        Ok(Self { user_id })
    }
}
