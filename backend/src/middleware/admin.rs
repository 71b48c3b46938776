//! Admin token gate for destructive routes

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::AppState;

/// Require a valid `X-Admin-Token` header.
///
/// An empty configured token disables admin routes entirely rather than
/// letting everyone through.
pub async fn admin_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = state.config.admin.token.as_str();
    let supplied = request
        .headers()
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if expected.is_empty() || supplied != expected {
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}
