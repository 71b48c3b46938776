//! Field models
//!
//! A field is a named farm parcel with a drawn polygon, a rounded area in
//! hectares, and a per-year crop history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A registered field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: Uuid,
    pub name: String,
    pub memo: String,
    /// Area in hectares, rounded half-up to 2 decimals at write time
    pub area_ha: Decimal,
    /// GeoJSON geometry: a single-ring Polygon, or a Point fallback when
    /// no ring exists
    pub geometry: Option<Value>,
    /// Raw GeoJSON Feature string as submitted by the map client
    pub geometry_json: Option<String>,
    pub crop_history: Vec<CropHistoryEntry>,
    /// Derived cache of the latest crop-history write
    pub current_crop: String,
    pub current_year: Option<i32>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One season in a field's crop history; at most one entry per year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropHistoryEntry {
    pub year: i32,
    pub crop: String,
    pub variety: String,
    pub planting_date: Option<DateTime<Utc>>,
    pub harvest_date: Option<DateTime<Utc>>,
}

impl CropHistoryEntry {
    pub fn new(year: i32, crop: impl Into<String>, variety: impl Into<String>) -> Self {
        Self {
            year,
            crop: crop.into(),
            variety: variety.into(),
            planting_date: None,
            harvest_date: None,
        }
    }
}

/// Record a crop write for `year`, overwriting the crop and variety of an
/// existing entry for that year in place, or appending a new entry.
///
/// An empty `variety` on an overwrite keeps the previous variety.
pub fn apply_crop_write(
    history: &mut Vec<CropHistoryEntry>,
    year: i32,
    crop: &str,
    variety: &str,
) {
    if let Some(entry) = history.iter_mut().find(|e| e.year == year) {
        entry.crop = crop.to_string();
        if !variety.is_empty() {
            entry.variety = variety.to_string();
        }
    } else {
        history.push(CropHistoryEntry::new(year, crop, variety));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_write_appends_new_year() {
        let mut history = vec![CropHistoryEntry::new(2023, "rice", "koshihikari")];
        apply_crop_write(&mut history, 2024, "wheat", "");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].year, 2024);
        assert_eq!(history[1].crop, "wheat");
    }

    #[test]
    fn test_crop_write_overwrites_existing_year_in_place() {
        let mut history = vec![CropHistoryEntry::new(2024, "A", "a1")];
        apply_crop_write(&mut history, 2024, "B", "b1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].crop, "B");
        assert_eq!(history[0].variety, "b1");
    }

    #[test]
    fn test_crop_write_keeps_variety_when_blank() {
        let mut history = vec![CropHistoryEntry::new(2024, "A", "a1")];
        apply_crop_write(&mut history, 2024, "B", "");
        assert_eq!(history[0].variety, "a1");
    }
}
