//! NDVI reporting service
//!
//! Glue between a field's stored geometry, the scene locator, and the
//! raster service: latest-scene tile/preview URLs, zonal statistics with
//! an interpretation layer, preview PNG bytes, and the geometry-only
//! "simple" variants that skip the field store entirely.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{
    bounding_box, coverage_percentage, normalize_statistics, NdviStatistics, VegetationHealth,
};

use crate::error::{AppError, AppResult};
use crate::external::titiler::{clamp_preview_size, BBOX_PADDING_DEG, DEFAULT_PREVIEW_SIZE};
use crate::external::{StacClient, TitilerClient};
use crate::services::scene::{find_latest_scene, UsedStage};

/// NDVI service
#[derive(Clone)]
pub struct NdviService {
    db: PgPool,
    stac: StacClient,
    titiler: TitilerClient,
}

/// Latest-scene report: tile template plus optional preview URL
#[derive(Debug, Serialize)]
pub struct LatestNdvi {
    pub field_id: Uuid,
    pub datetime: Option<DateTime<Utc>>,
    pub cloud_cover: Option<f64>,
    pub tile_template: String,
    pub preview_url: Option<String>,
    pub stac_item_url: String,
    pub used_search: UsedStage,
}

/// Presentation-layer reading of the statistics
#[derive(Debug, Serialize)]
pub struct NdviInterpretation {
    pub vegetation_health: VegetationHealth,
    pub coverage_percentage: Option<i64>,
}

/// Zonal-statistics report for a field
#[derive(Debug, Serialize)]
pub struct NdviStatsReport {
    pub field_id: Uuid,
    pub datetime: Option<DateTime<Utc>>,
    pub cloud_cover: Option<f64>,
    pub stac_item_url: String,
    pub ndvi_statistics: NdviStatistics,
    pub interpretation: NdviInterpretation,
    pub used_search: UsedStage,
}

/// Statistics for a caller-supplied geometry, no field involved
#[derive(Debug, Serialize)]
pub struct SimpleStatsReport {
    pub stac_item_url: String,
    pub ndvi_statistics: NdviStatistics,
}

impl NdviService {
    /// Create a new NdviService instance
    pub fn new(db: PgPool, stac: StacClient, titiler: TitilerClient) -> Self {
        Self { db, stac, titiler }
    }

    /// Load a live field's geometry, failing when the field is missing,
    /// deleted, or has no geometry
    async fn load_geometry(&self, field_id: Uuid) -> AppResult<Value> {
        let row: Option<(Option<Value>,)> =
            sqlx::query_as("SELECT geometry FROM fields WHERE id = $1 AND NOT deleted")
                .bind(field_id)
                .fetch_optional(&self.db)
                .await?;

        match row {
            Some((Some(geometry),)) => Ok(geometry),
            _ => Err(AppError::FieldNotFound),
        }
    }

    /// Latest usable scene for a field: tile template and preview URL
    pub async fn latest(&self, field_id: Uuid, days: u32, cloud: u32) -> AppResult<LatestNdvi> {
        let geometry = self.load_geometry(field_id).await?;
        let located = find_latest_scene(&self.stac, &geometry, days, cloud).await?;

        let preview_url = bounding_box(&geometry).map(|bbox| {
            self.titiler.preview_url(
                &bbox.padded(BBOX_PADDING_DEG),
                DEFAULT_PREVIEW_SIZE,
                &located.scene.item_url,
            )
        });

        Ok(LatestNdvi {
            field_id,
            datetime: located.scene.datetime,
            cloud_cover: located.scene.cloud_cover,
            tile_template: self.titiler.tile_template(&located.scene.item_url),
            preview_url,
            stac_item_url: located.scene.item_url,
            used_search: located.used,
        })
    }

    /// Zonal statistics for a field's latest usable scene
    pub async fn statistics(
        &self,
        field_id: Uuid,
        days: u32,
        cloud: u32,
    ) -> AppResult<NdviStatsReport> {
        let geometry = self.load_geometry(field_id).await?;
        let located = find_latest_scene(&self.stac, &geometry, days, cloud).await?;

        let raw = self
            .titiler
            .fetch_statistics(&located.scene.item_url, &geometry)
            .await?;
        // Null statistics still produce a report; every field stays null.
        let stats = normalize_statistics(&raw).unwrap_or_default();

        let interpretation = NdviInterpretation {
            vegetation_health: VegetationHealth::from_mean(stats.mean.unwrap_or(0.0)),
            coverage_percentage: stats.mean.map(coverage_percentage),
        };

        Ok(NdviStatsReport {
            field_id,
            datetime: located.scene.datetime,
            cloud_cover: located.scene.cloud_cover,
            stac_item_url: located.scene.item_url,
            ndvi_statistics: stats,
            interpretation,
            used_search: located.used,
        })
    }

    /// Rendered preview PNG for a field. An explicit `item_url` skips the
    /// catalog search and renders that scene directly.
    pub async fn preview_png(
        &self,
        field_id: Uuid,
        days: u32,
        cloud: u32,
        size: Option<u32>,
        item_url: Option<String>,
    ) -> AppResult<Vec<u8>> {
        let geometry = self.load_geometry(field_id).await?;

        let item_url = match item_url {
            Some(url) => url,
            None => {
                find_latest_scene(&self.stac, &geometry, days, cloud)
                    .await?
                    .scene
                    .item_url
            }
        };

        let bbox = bounding_box(&geometry).ok_or(AppError::InvalidGeometry)?;
        self.titiler
            .fetch_preview(
                &bbox.padded(BBOX_PADDING_DEG),
                clamp_preview_size(size),
                &item_url,
            )
            .await
    }

    /// Preview PNG for a caller-supplied geometry. An explicit `item_url`
    /// skips the catalog search and renders that scene directly.
    pub async fn preview_simple(
        &self,
        geometry: &Value,
        days: u32,
        cloud: u32,
        size: Option<u32>,
        item_url: Option<String>,
    ) -> AppResult<Vec<u8>> {
        validate_geometry(geometry)?;
        let item_url = match item_url {
            Some(url) => url,
            None => {
                find_latest_scene(&self.stac, geometry, days, cloud)
                    .await?
                    .scene
                    .item_url
            }
        };

        let bbox = bounding_box(geometry).ok_or(AppError::InvalidGeometry)?;
        self.titiler
            .fetch_preview(
                &bbox.padded(BBOX_PADDING_DEG),
                clamp_preview_size(size),
                &item_url,
            )
            .await
    }

    /// Zonal statistics for a caller-supplied geometry, with the same
    /// `item_url` skip-search path as the preview
    pub async fn stats_simple(
        &self,
        geometry: &Value,
        days: u32,
        cloud: u32,
        item_url: Option<String>,
    ) -> AppResult<SimpleStatsReport> {
        validate_geometry(geometry)?;
        let item_url = match item_url {
            Some(url) => url,
            None => {
                find_latest_scene(&self.stac, geometry, days, cloud)
                    .await?
                    .scene
                    .item_url
            }
        };

        let raw = self.titiler.fetch_statistics(&item_url, geometry).await?;
        let stats = normalize_statistics(&raw).unwrap_or_default();

        Ok(SimpleStatsReport {
            stac_item_url: item_url,
            ndvi_statistics: stats,
        })
    }
}

/// Basic structural check on a caller-supplied GeoJSON geometry
fn validate_geometry(geometry: &Value) -> AppResult<()> {
    let has_type = geometry.get("type").and_then(Value::as_str).is_some();
    let has_coordinates = geometry
        .get("coordinates")
        .map(Value::is_array)
        .unwrap_or(false);

    if has_type && has_coordinates {
        Ok(())
    } else {
        Err(AppError::InvalidGeometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_geometry() {
        assert!(validate_geometry(&json!({
            "type": "Polygon",
            "coordinates": [[[139.0, 35.0], [139.1, 35.0], [139.1, 35.1], [139.0, 35.0]]],
        }))
        .is_ok());
        assert!(validate_geometry(&json!({"type": "Polygon"})).is_err());
        assert!(validate_geometry(&json!({"coordinates": [[]]})).is_err());
        assert!(validate_geometry(&json!(null)).is_err());
    }

    #[test]
    fn test_interpretation_of_null_mean_is_very_poor_without_coverage() {
        let stats = NdviStatistics::default();
        let interpretation = NdviInterpretation {
            vegetation_health: VegetationHealth::from_mean(stats.mean.unwrap_or(0.0)),
            coverage_percentage: stats.mean.map(coverage_percentage),
        };
        assert_eq!(
            interpretation.vegetation_health,
            VegetationHealth::VeryPoor
        );
        assert_eq!(interpretation.coverage_percentage, None);
    }
}
