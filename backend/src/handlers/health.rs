//! Health check endpoint

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::AppState;

/// Health check: liveness plus a database round trip
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!("Health check database error: {}", e);
            "disconnected"
        }
    };

    Json(json!({
        "status": if database == "connected" { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }))
}
