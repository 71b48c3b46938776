//! API route definitions

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{admin, config, crop, field, health, ndvi};
use crate::middleware::admin_auth;
use crate::AppState;

/// Everything served under /api
pub fn api_routes(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/collections/:name", delete(admin::clear_collection))
        .route("/ingest/s2", post(admin::trigger_ingest))
        .route_layer(from_fn_with_state(state, admin_auth));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/config", get(config::client_config))
        .route("/fields", get(field::list_fields))
        .route("/fields", post(field::create_field))
        .route("/fields/:id", get(field::get_field))
        .route("/fields/:id", put(field::update_field))
        .route("/fields/:id", delete(field::delete_field))
        .route("/crops", get(crop::list_crops))
        .route("/crops", post(crop::create_crop))
        .route("/crops/:id", put(crop::update_crop))
        .route("/crops/:id", delete(crop::delete_crop))
        .route("/s2/ndvi/latest", get(ndvi::ndvi_latest))
        .route("/s2/ndvi/stats", get(ndvi::ndvi_stats))
        .route("/s2/preview.png", get(ndvi::ndvi_preview))
        .route("/s2/preview.simple", post(ndvi::ndvi_preview_simple))
        .route("/s2/stats.simple", post(ndvi::ndvi_stats_simple))
        .nest("/admin", admin_routes)
}
