//! Error handling for the Field Monitoring backend
//!
//! Every failure surfaces as `{error: {code, message}}` with a stable
//! machine-readable code, so clients can tell "no data available" apart
//! from "service broken".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Client input errors
    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid field id: {0}")]
    InvalidFieldId(String),

    #[error("Invalid or missing geometry")]
    InvalidGeometry,

    #[error("Validation error: {message}")]
    Validation { code: &'static str, message: String },

    // Not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Field not found")]
    FieldNotFound,

    #[error("No scene found within {days} days at cloud cover <= {cloud}%")]
    NoSceneFound { days: u32, cloud: u32 },

    // Conflicts
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    // Authorization
    #[error("Unauthorized")]
    Unauthorized,

    // Upstream dependency failures; the upstream body is attached for
    // diagnostics
    #[error("Catalog search failed: {0}")]
    CatalogSearch(String),

    #[error("Statistics service failed: {0}")]
    StatsFailed(String),

    #[error("Raster service failed: {0}")]
    RasterFailed(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
            AppError::InvalidFieldId(_) => (StatusCode::BAD_REQUEST, "invalid_field_id"),
            AppError::InvalidGeometry => (StatusCode::BAD_REQUEST, "invalid_geometry"),
            AppError::Validation { code, .. } => (StatusCode::BAD_REQUEST, *code),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::FieldNotFound => (StatusCode::NOT_FOUND, "field_not_found"),
            AppError::NoSceneFound { .. } => (StatusCode::NOT_FOUND, "no_scene_found"),
            AppError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::CatalogSearch(_) => (StatusCode::BAD_GATEWAY, "catalog_search_failed"),
            AppError::StatsFailed(_) => (StatusCode::BAD_GATEWAY, "stats_failed"),
            AppError::RasterFailed(_) => (StatusCode::BAD_GATEWAY, "titiler_failed"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never leak database internals to the client
        let message = match &self {
            AppError::Database(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request failed: {:?}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidGeometry.status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NoSceneFound { days: 60, cloud: 90 }.status_and_code(),
            (StatusCode::NOT_FOUND, "no_scene_found")
        );
        assert_eq!(
            AppError::StatsFailed("boom".into()).status_and_code().0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Unauthorized.status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
    }
}
