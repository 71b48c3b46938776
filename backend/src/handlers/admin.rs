//! Admin handlers: data reset and manual ingestion trigger.
//!
//! All routes here sit behind the admin-token middleware.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::services::IngestService;
use crate::AppState;

/// DELETE /api/admin/collections/:name
///
/// Truncates one of the known tables. Fields cascade into their
/// observations.
pub async fn clear_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Value>> {
    let statement = match name.as_str() {
        "fields" => "TRUNCATE fields CASCADE",
        "crops" => "TRUNCATE crops",
        "ndvi_observations" => "TRUNCATE ndvi_observations",
        other => {
            return Err(AppError::Validation {
                code: "unknown_collection",
                message: format!("unknown collection: {}", other),
            })
        }
    };

    sqlx::query(statement).execute(&state.db).await?;
    tracing::info!(collection = %name, "collection cleared");
    Ok(Json(json!({ "ok": true, "dropped": name })))
}

/// POST /api/admin/ingest/s2
///
/// Kicks off one ingestion sweep in the background and returns
/// immediately.
pub async fn trigger_ingest(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let service = IngestService::new(
        state.db.clone(),
        state.stac.clone(),
        state.titiler.clone(),
        std::time::Duration::from_millis(state.config.ingest.pause_ms),
    );

    tokio::spawn(async move {
        if let Err(e) = service.run_sweep().await {
            tracing::error!(error = %e, "manual ingest sweep failed");
        }
    });

    Ok(Json(json!({ "ok": true, "started": true })))
}
