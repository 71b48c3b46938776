//! Field Monitoring Platform - Backend Server
//!
//! Field polygon management, crop master upkeep, and Sentinel-2 NDVI
//! reporting for a map-based farming client.

use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod external;
mod handlers;
mod middleware;
mod routes;
mod services;

pub use config::Config;

use external::{StacClient, TitilerClient};
use services::IngestService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub stac: StacClient,
    pub titiler: TitilerClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "field_server=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting Field Monitoring Server");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        stac: StacClient::new(config.stac.search_url.clone(), config.stac.collection.clone()),
        titiler: TitilerClient::new(config.titiler.base_url.clone()),
    };

    // Periodic NDVI ingestion
    if config.ingest.enabled {
        spawn_ingest_scheduler(&state);
    }

    // Build application
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Spawn the periodic ingestion sweep
fn spawn_ingest_scheduler(state: &AppState) {
    let service = IngestService::new(
        state.db.clone(),
        state.stac.clone(),
        state.titiler.clone(),
        Duration::from_millis(state.config.ingest.pause_ms),
    );
    let interval_hours = state.config.ingest.interval_hours;

    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(interval_hours.max(1) * 3600));
        // The first tick fires immediately; skip it so startup stays quiet.
        interval.tick().await;

        tracing::info!(interval_hours, "ndvi ingest scheduler started");
        loop {
            interval.tick().await;
            if let Err(e) = service.run_sweep().await {
                tracing::error!(error = %e, "scheduled ingest sweep failed");
            }
        }
    });
}

/// Root endpoint
async fn root() -> &'static str {
    "Field Monitoring Platform API v1.0"
}
