//! Configuration management for the Field Monitoring backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Bootstrap document served to the map client
    pub client: ClientConfig,

    /// STAC catalog search configuration
    pub stac: StacConfig,

    /// Raster statistics/tile service configuration
    pub titiler: TitilerConfig,

    /// Admin route configuration
    pub admin: AdminConfig,

    /// Background NDVI ingestion configuration
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Maps API key handed to the browser client
    pub maps_api_key: String,

    /// API mode reported to the client
    pub api_mode: String,

    /// Base URL the client should call; empty means same origin
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StacConfig {
    /// STAC search endpoint
    pub search_url: String,

    /// Imagery collection to search
    pub collection: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TitilerConfig {
    /// Base URL of the raster statistics/tile service
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Shared admin token; admin routes reject everything when empty
    pub token: String,

    /// Force hard deletes even without ?hard=true
    pub hard_delete: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Enable the periodic NDVI ingestion sweep
    pub enabled: bool,

    /// Hours between sweeps
    pub interval_hours: u64,

    /// Pause between fields during a sweep, in milliseconds
    pub pause_ms: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("client.maps_api_key", "")?
            .set_default("client.api_mode", "external")?
            .set_default("client.api_base", "")?
            .set_default(
                "stac.search_url",
                "https://earth-search.aws.element84.com/v1/search",
            )?
            .set_default("stac.collection", "sentinel-2-l2a")?
            .set_default("titiler.base_url", "http://localhost:8000")?
            .set_default("admin.token", "")?
            .set_default("admin.hard_delete", false)?
            .set_default("ingest.enabled", false)?
            .set_default("ingest.interval_hours", 24)?
            .set_default("ingest.pause_ms", 500)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FM_ prefix)
            .add_source(
                Environment::with_prefix("FM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
