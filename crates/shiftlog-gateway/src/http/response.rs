//! Shared plumbing for `/api/*` handlers: identity lookup, error bodies, and
//! the JSON-or-redirect choice.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shiftlog_core::UserId;
use shiftlog_timer::TrackerError;
use tracing::warn;

use crate::app::AppState;

/// A failed request. Unauthenticated → 401, everything else → 400, both with
/// `{"error": <message>}`.
#[derive(Debug)]
pub struct ApiError(pub TrackerError);

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            TrackerError::Unauthenticated => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Resolve the caller or fail with 401.
pub async fn caller(state: &AppState, headers: &HeaderMap) -> Result<UserId, ApiError> {
    match state.identity.resolve(headers).await {
        Some(user) => Ok(user),
        None => {
            warn!(provider = state.identity.name(), "unauthenticated request");
            Err(ApiError(TrackerError::Unauthenticated))
        }
    }
}

/// Log a failed operation and wrap it for the response.
pub fn reject(op: &'static str, user: &UserId, err: TrackerError) -> ApiError {
    warn!(op, user = %user, code = err.code(), error = %err, "operation failed");
    ApiError(err)
}

/// True when the client asked for JSON instead of a redirect.
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}
