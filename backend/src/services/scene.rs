//! Scene locator: staged-relaxation search for the latest usable scene
//!
//! A field's NDVI is only as fresh as the most recent low-cloud scene
//! covering it. The locator searches the catalog with the caller's
//! recency/cloud constraints first, then relaxes them through a fixed
//! stage sequence, trading freshness for availability. The stage that
//! produced the result is reported back for observability.

use serde::Serialize;
use serde_json::Value;
use shared::SceneReference;

use crate::error::{AppError, AppResult};

/// Upper bounds and defaults for caller-supplied search parameters
pub const DEFAULT_DAYS: u32 = 10;
pub const DEFAULT_CLOUD: u32 = 70;
pub const MAX_DAYS: u32 = 120;
pub const MAX_CLOUD: u32 = 100;

/// One search stage: a recency window in days and a cloud-cover ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchStage {
    pub days: u32,
    pub cloud: u32,
}

/// The stage that produced a scene, 1-based for log/debug output
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UsedStage {
    pub stage: usize,
    pub days: u32,
    pub cloud: u32,
}

/// A located scene together with the stage that found it
#[derive(Debug, Clone)]
pub struct LocatedScene {
    pub scene: SceneReference,
    pub used: UsedStage,
}

/// Clamp a caller-supplied recency window to the allowed range
pub fn clamp_days(days: Option<u32>) -> u32 {
    days.unwrap_or(DEFAULT_DAYS).min(MAX_DAYS)
}

/// Clamp a caller-supplied cloud-cover ceiling to the allowed range
pub fn clamp_cloud(cloud: Option<u32>) -> u32 {
    cloud.unwrap_or(DEFAULT_CLOUD).min(MAX_CLOUD)
}

/// The fixed relaxation sequence: the requested constraints, a widened
/// middle stage, and a last-resort stage of 60 days at 90% cloud.
pub fn relaxation_stages(days: u32, cloud: u32) -> [SearchStage; 3] {
    [
        SearchStage { days, cloud },
        SearchStage {
            days: days.saturating_mul(3).max(20),
            cloud: cloud.max(80),
        },
        SearchStage { days: 60, cloud: 90 },
    ]
}

/// Catalog search seam: one call per stage, newest matching scene only
#[axum::async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn latest_scene(
        &self,
        geometry: &Value,
        stage: SearchStage,
    ) -> AppResult<Option<SceneReference>>;
}

/// Find the most recent usable scene intersecting `geometry`.
///
/// Tries each relaxation stage in order and returns the first hit. A
/// failed stage does not abort the search: the error is remembered and the
/// next, more permissive stage is attempted. Only when every stage is
/// exhausted does the locator fail, with the last upstream error if one
/// occurred, otherwise with `no_scene_found`.
pub async fn find_latest_scene<C: CatalogSearch + ?Sized>(
    catalog: &C,
    geometry: &Value,
    days: u32,
    cloud: u32,
) -> AppResult<LocatedScene> {
    let stages = relaxation_stages(days, cloud);
    let mut last_error: Option<AppError> = None;

    for (index, stage) in stages.iter().enumerate() {
        match catalog.latest_scene(geometry, *stage).await {
            Ok(Some(scene)) => {
                tracing::debug!(
                    stage = index + 1,
                    days = stage.days,
                    cloud = stage.cloud,
                    item = %scene.id,
                    "scene search hit"
                );
                return Ok(LocatedScene {
                    scene,
                    used: UsedStage {
                        stage: index + 1,
                        days: stage.days,
                        cloud: stage.cloud,
                    },
                });
            }
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(
                    stage = index + 1,
                    days = stage.days,
                    cloud = stage.cloud,
                    error = %e,
                    "scene search stage failed, trying next stage"
                );
                last_error = Some(e);
            }
        }
    }

    let last = stages[stages.len() - 1];
    match last_error {
        Some(e) => Err(e),
        None => Err(AppError::NoSceneFound {
            days: last.days,
            cloud: last.cloud,
        }),
    }
}
