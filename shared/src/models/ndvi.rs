//! NDVI scene references and zonal statistics
//!
//! The raster service is loose about response shape: the statistics object
//! may sit under `properties.statistics` keyed by the band expression,
//! under a top-level `statistics`, or flat at the top level, and individual
//! fields go by several names. [`normalize_statistics`] folds all observed
//! shapes into one canonical record; anything unrecognizable becomes
//! `None`, never a partially-guessed record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The band expression used for every NDVI request
pub const NDVI_EXPRESSION: &str = "(nir-red)/(nir+red)";

/// A satellite scene resolved from the catalog; never persisted outside
/// the ingestion time series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneReference {
    /// Catalog item id
    pub id: String,
    /// Canonical self-URL of the item
    pub item_url: String,
    /// Acquisition time
    pub datetime: Option<DateTime<Utc>>,
    /// Cloud-cover percentage reported by the catalog
    pub cloud_cover: Option<f64>,
}

/// Canonical zonal NDVI statistics; every field is nullable because the
/// upstream service may omit any of them
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NdviStatistics {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: Option<f64>,
    pub histogram: Option<Value>,
}

/// Heuristic vegetation health bucket derived from mean NDVI.
///
/// Presentation convenience only, not a scientific classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VegetationHealth {
    Excellent,
    Good,
    Poor,
    VeryPoor,
}

impl VegetationHealth {
    /// Bucket a mean NDVI with fixed thresholds: >= 0.6 excellent,
    /// >= 0.4 good, >= 0.2 poor, else very_poor.
    pub fn from_mean(mean: f64) -> Self {
        if mean >= 0.6 {
            VegetationHealth::Excellent
        } else if mean >= 0.4 {
            VegetationHealth::Good
        } else if mean >= 0.2 {
            VegetationHealth::Poor
        } else {
            VegetationHealth::VeryPoor
        }
    }
}

/// Heuristic mapping of mean NDVI from [-1, 1] to an approximate coverage
/// percentage, rounded to the nearest integer.
pub fn coverage_percentage(mean: f64) -> i64 {
    ((mean + 1.0) * 50.0).round() as i64
}

/// Locate and normalize the statistics object inside a raw raster-service
/// response. Returns `None` when no recognizable statistics object exists.
pub fn normalize_statistics(raw: &Value) -> Option<NdviStatistics> {
    let stats = locate_statistics(raw)?;
    Some(NdviStatistics {
        mean: number_field(stats, &["mean", "avg"]),
        median: number_field(stats, &["median", "p50"]),
        std: number_field(stats, &["std", "stdev", "stddev"]),
        min: number_field(stats, &["min", "p0"]),
        max: number_field(stats, &["max", "p100"]),
        count: number_field(stats, &["count", "n", "valid_percent"]),
        histogram: stats
            .get("histogram")
            .or_else(|| stats.get("histogram_bins"))
            .filter(|v| !v.is_null())
            .cloned(),
    })
}

/// Walk the known response shapes in order and return the statistics
/// object itself.
fn locate_statistics(raw: &Value) -> Option<&Value> {
    if !raw.is_object() {
        return None;
    }

    // Typical shape: { properties: { statistics: { "<expr>": {...} } } }
    if let Some(stats) = raw.pointer("/properties/statistics") {
        if let Some(found) = pick_expression_entry(stats) {
            return Some(found);
        }
    }

    // Alternate shape: top-level statistics object
    if let Some(stats) = raw.get("statistics") {
        if let Some(found) = pick_expression_entry(stats) {
            return Some(found);
        }
    }

    // Flat or otherwise-named shapes
    if let Some(found) = raw.get("expression").or_else(|| raw.get("stats")) {
        if found.is_object() {
            return Some(found);
        }
    }
    if raw.get("mean").is_some() {
        return Some(raw);
    }

    None
}

/// Inside a statistics map, prefer the documented expression key, then the
/// known aliases, then whatever key comes first.
fn pick_expression_entry(stats: &Value) -> Option<&Value> {
    let map = stats.as_object()?;
    for key in [NDVI_EXPRESSION, "expression", "ndvi", "b1"] {
        if let Some(entry) = map.get(key) {
            return Some(entry);
        }
    }
    map.values().next()
}

fn number_field(stats: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| stats.get(*key).and_then(Value::as_f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_documented_shape() {
        let raw = json!({
            "properties": {
                "statistics": {
                    "(nir-red)/(nir+red)": {
                        "mean": 0.45,
                        "median": 0.4,
                        "min": -0.1,
                        "max": 0.9,
                        "stdev": 0.12,
                        "count": 500,
                        "histogram": [[10, 20], [0.0, 0.5]],
                    }
                }
            }
        });
        let stats = normalize_statistics(&raw).unwrap();
        assert_eq!(stats.mean, Some(0.45));
        assert_eq!(stats.median, Some(0.4));
        assert_eq!(stats.std, Some(0.12));
        assert_eq!(stats.min, Some(-0.1));
        assert_eq!(stats.max, Some(0.9));
        assert_eq!(stats.count, Some(500.0));
        assert!(stats.histogram.is_some());
    }

    #[test]
    fn test_normalize_first_key_fallback() {
        let raw = json!({
            "properties": { "statistics": { "band_7": { "mean": 0.3 } } }
        });
        let stats = normalize_statistics(&raw).unwrap();
        assert_eq!(stats.mean, Some(0.3));
        assert_eq!(stats.median, None);
    }

    #[test]
    fn test_normalize_top_level_statistics() {
        let raw = json!({
            "statistics": { "expression": { "avg": 0.2, "p50": 0.25, "stddev": 0.05 } }
        });
        let stats = normalize_statistics(&raw).unwrap();
        assert_eq!(stats.mean, Some(0.2));
        assert_eq!(stats.median, Some(0.25));
        assert_eq!(stats.std, Some(0.05));
    }

    #[test]
    fn test_normalize_flat_shape() {
        let raw = json!({ "mean": 0.7, "n": 1200, "histogram_bins": [1, 2, 3] });
        let stats = normalize_statistics(&raw).unwrap();
        assert_eq!(stats.mean, Some(0.7));
        assert_eq!(stats.count, Some(1200.0));
        assert_eq!(stats.histogram, Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_normalize_unrecognizable_is_none() {
        assert!(normalize_statistics(&json!({ "detail": "no data" })).is_none());
        assert!(normalize_statistics(&json!(null)).is_none());
        assert!(normalize_statistics(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_missing_fields_stay_null() {
        let raw = json!({
            "properties": { "statistics": { "(nir-red)/(nir+red)": {} } }
        });
        let stats = normalize_statistics(&raw).unwrap();
        assert_eq!(stats, NdviStatistics::default());
    }

    #[test]
    fn test_health_thresholds() {
        assert_eq!(VegetationHealth::from_mean(0.6), VegetationHealth::Excellent);
        assert_eq!(VegetationHealth::from_mean(0.45), VegetationHealth::Good);
        assert_eq!(VegetationHealth::from_mean(0.2), VegetationHealth::Poor);
        assert_eq!(VegetationHealth::from_mean(0.1), VegetationHealth::VeryPoor);
        assert_eq!(VegetationHealth::from_mean(-0.3), VegetationHealth::VeryPoor);
    }

    #[test]
    fn test_coverage_percentage() {
        assert_eq!(coverage_percentage(0.0), 50);
        assert_eq!(coverage_percentage(1.0), 100);
        assert_eq!(coverage_percentage(-1.0), 0);
        assert_eq!(coverage_percentage(0.45), 73);
    }
}
