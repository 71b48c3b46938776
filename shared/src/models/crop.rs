//! Crop master models
//!
//! The crop master list is maintained implicitly: saving a field with a
//! crop and variety upserts the matching entry. Names are unique among
//! non-deleted crops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A crop master entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crop {
    pub id: Uuid,
    pub name: String,
    /// Known varieties; set semantics, insertion order irrelevant
    pub varieties: Vec<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trim a submitted variety list, dropping blanks and duplicates while
/// keeping first-occurrence order
pub fn clean_varieties(varieties: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(varieties.len());
    for variety in varieties {
        let variety = variety.trim();
        if !variety.is_empty() && !cleaned.iter().any(|v| v == variety) {
            cleaned.push(variety.to_string());
        }
    }
    cleaned
}
