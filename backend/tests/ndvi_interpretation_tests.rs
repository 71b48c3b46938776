//! Tests for NDVI statistics normalization and interpretation
//! Verifies that every observed raster-service response shape folds into
//! the same canonical record, and that interpretation follows the fixed
//! health thresholds.

use serde_json::json;
use shared::{coverage_percentage, normalize_statistics, VegetationHealth};

mod response_shapes {
    use super::*;

    #[test]
    fn documented_shape_and_flat_shape_agree() {
        let nested = json!({
            "properties": {
                "statistics": {
                    "(nir-red)/(nir+red)": {
                        "mean": 0.52, "median": 0.5, "std": 0.08,
                        "min": 0.1, "max": 0.8, "count": 420.0,
                    }
                }
            }
        });
        let flat = json!({
            "mean": 0.52, "median": 0.5, "std": 0.08,
            "min": 0.1, "max": 0.8, "count": 420.0,
        });

        assert_eq!(
            normalize_statistics(&nested).unwrap(),
            normalize_statistics(&flat).unwrap()
        );
    }

    #[test]
    fn alias_names_resolve_to_canonical_fields() {
        let raw = json!({
            "statistics": {
                "ndvi": {
                    "avg": 0.33, "p50": 0.3, "stddev": 0.02,
                    "p0": -0.05, "p100": 0.7, "valid_percent": 96.5,
                }
            }
        });
        let stats = normalize_statistics(&raw).unwrap();
        assert_eq!(stats.mean, Some(0.33));
        assert_eq!(stats.median, Some(0.3));
        assert_eq!(stats.std, Some(0.02));
        assert_eq!(stats.min, Some(-0.05));
        assert_eq!(stats.max, Some(0.7));
        assert_eq!(stats.count, Some(96.5));
    }

    #[test]
    fn unknown_band_key_falls_back_to_first_entry() {
        let raw = json!({
            "properties": { "statistics": { "band_expression_v2": { "mean": 0.61 } } }
        });
        assert_eq!(normalize_statistics(&raw).unwrap().mean, Some(0.61));
    }

    #[test]
    fn error_payload_yields_none_not_garbage() {
        let raw = json!({ "detail": "Asset 'nir' not found" });
        assert!(normalize_statistics(&raw).is_none());
    }
}

mod interpretation {
    use super::*;

    #[test]
    fn health_buckets_cover_the_full_ndvi_range() {
        let cases = [
            (0.85, VegetationHealth::Excellent),
            (0.6, VegetationHealth::Excellent),
            (0.59, VegetationHealth::Good),
            (0.4, VegetationHealth::Good),
            (0.39, VegetationHealth::Poor),
            (0.2, VegetationHealth::Poor),
            (0.19, VegetationHealth::VeryPoor),
            (0.0, VegetationHealth::VeryPoor),
            (-1.0, VegetationHealth::VeryPoor),
        ];
        for (mean, expected) in cases {
            assert_eq!(VegetationHealth::from_mean(mean), expected, "mean {mean}");
        }
    }

    #[test]
    fn coverage_maps_ndvi_range_onto_percent() {
        assert_eq!(coverage_percentage(-1.0), 0);
        assert_eq!(coverage_percentage(0.0), 50);
        assert_eq!(coverage_percentage(0.5), 75);
        assert_eq!(coverage_percentage(1.0), 100);
    }

    #[test]
    fn health_serializes_snake_case() {
        let json = serde_json::to_string(&VegetationHealth::VeryPoor).unwrap();
        assert_eq!(json, "\"very_poor\"");
    }
}
