//! Background NDVI ingestion
//!
//! Periodically sweeps every live field with a geometry, locates the
//! latest usable scene, and appends a statistics observation to the time
//! series. Idempotent per (field, scene): a scene already observed for a
//! field is skipped, so the sweep can run as often as the scheduler likes.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use shared::normalize_statistics;

use crate::error::{AppError, AppResult};
use crate::external::{StacClient, TitilerClient};
use crate::services::scene::{find_latest_scene, DEFAULT_CLOUD, DEFAULT_DAYS};

/// Ingestion service
#[derive(Clone)]
pub struct IngestService {
    db: PgPool,
    stac: StacClient,
    titiler: TitilerClient,
    pause: Duration,
}

/// Outcome of ingesting one field
#[derive(Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested,
    Skipped(&'static str),
    Failed(&'static str),
}

/// Counters for one sweep
#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    pub ingested: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl IngestService {
    /// Create a new IngestService instance
    pub fn new(db: PgPool, stac: StacClient, titiler: TitilerClient, pause: Duration) -> Self {
        Self {
            db,
            stac,
            titiler,
            pause,
        }
    }

    /// Ingest the latest observation for one field
    pub async fn ingest_field(&self, field_id: Uuid, geometry: &Value) -> AppResult<IngestOutcome> {
        let located =
            match find_latest_scene(&self.stac, geometry, DEFAULT_DAYS, DEFAULT_CLOUD).await {
                Ok(located) => located,
                Err(AppError::NoSceneFound { .. }) => {
                    return Ok(IngestOutcome::Skipped("no_scene_found"))
                }
                Err(e) => return Err(e),
            };

        let exists: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM ndvi_observations WHERE field_id = $1 AND stac_item_id = $2",
        )
        .bind(field_id)
        .bind(&located.scene.id)
        .fetch_optional(&self.db)
        .await?;
        if exists.is_some() {
            return Ok(IngestOutcome::Skipped("already_ingested"));
        }

        let raw = self
            .titiler
            .fetch_statistics(&located.scene.item_url, geometry)
            .await?;
        let stats = match normalize_statistics(&raw) {
            Some(stats) => stats,
            None => {
                // One retry with a re-serialized geometry; stored documents
                // occasionally carry non-JSON artifacts the raster service
                // chokes on.
                let clean: Value = serde_json::from_str(&geometry.to_string())
                    .map_err(|_| AppError::InvalidGeometry)?;
                let raw = self
                    .titiler
                    .fetch_statistics(&located.scene.item_url, &clean)
                    .await?;
                match normalize_statistics(&raw) {
                    Some(stats) => stats,
                    None => return Ok(IngestOutcome::Failed("stats_null")),
                }
            }
        };

        sqlx::query(
            "INSERT INTO ndvi_observations \
                 (field_id, stac_item_id, stac_item_url, datetime, cloud_cover, \
                  ndvi_mean, ndvi_median, ndvi_std, ndvi_min, ndvi_max, pixel_count, histogram) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (field_id, stac_item_id) DO NOTHING",
        )
        .bind(field_id)
        .bind(&located.scene.id)
        .bind(&located.scene.item_url)
        .bind(located.scene.datetime.unwrap_or_else(Utc::now))
        .bind(located.scene.cloud_cover)
        .bind(stats.mean)
        .bind(stats.median)
        .bind(stats.std)
        .bind(stats.min)
        .bind(stats.max)
        .bind(stats.count)
        .bind(stats.histogram)
        .execute(&self.db)
        .await?;

        Ok(IngestOutcome::Ingested)
    }

    /// Sweep every live field with a geometry, pausing between fields to
    /// stay polite to the upstream services
    pub async fn run_sweep(&self) -> AppResult<IngestSummary> {
        let fields: Vec<(Uuid, String, Value)> = sqlx::query_as(
            "SELECT id, name, geometry FROM fields \
             WHERE NOT deleted AND geometry IS NOT NULL \
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.db)
        .await?;

        tracing::info!(fields = fields.len(), "ndvi ingest sweep started");
        let mut summary = IngestSummary::default();

        for (field_id, name, geometry) in fields {
            match self.ingest_field(field_id, &geometry).await {
                Ok(IngestOutcome::Ingested) => {
                    tracing::info!(%field_id, field = %name, "observation ingested");
                    summary.ingested += 1;
                }
                Ok(IngestOutcome::Skipped(reason)) => {
                    tracing::debug!(%field_id, field = %name, reason, "field skipped");
                    summary.skipped += 1;
                }
                Ok(IngestOutcome::Failed(reason)) => {
                    tracing::warn!(%field_id, field = %name, reason, "field failed");
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(%field_id, field = %name, error = %e, "field failed");
                    summary.failed += 1;
                }
            }
            tokio::time::sleep(self.pause).await;
        }

        tracing::info!(
            ingested = summary.ingested,
            skipped = summary.skipped,
            failed = summary.failed,
            "ndvi ingest sweep finished"
        );
        Ok(summary)
    }
}
