//! Client bootstrap endpoint
//!
//! Hands the browser client the non-secret settings it needs before it can
//! render the map: the maps API key, the API mode, and the base URL to
//! call back.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ClientBootstrap {
    #[serde(rename = "googleMapsApiKey")]
    pub maps_api_key: String,
    #[serde(rename = "apiMode")]
    pub api_mode: String,
    #[serde(rename = "externalApiBase")]
    pub api_base: String,
}

/// Serve the client bootstrap document
pub async fn client_config(State(state): State<AppState>) -> Json<ClientBootstrap> {
    let client = &state.config.client;
    let api_base = if client.api_base.is_empty() {
        format!("http://localhost:{}/api", state.config.server.port)
    } else {
        client.api_base.clone()
    };

    Json(ClientBootstrap {
        maps_api_key: client.maps_api_key.clone(),
        api_mode: client.api_mode.clone(),
        api_base,
    })
}
