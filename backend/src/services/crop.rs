//! Crop master service
//!
//! The crop master is a searchable list of crop names with known
//! varieties. It is maintained both directly (CRUD) and as a side effect
//! of field crop writes, which upsert into it.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{clean_varieties, Crop};

use crate::error::{AppError, AppResult};

/// Crop service for managing the crop master list
#[derive(Clone)]
pub struct CropService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct CropRow {
    id: Uuid,
    name: String,
    varieties: Vec<String>,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CropRow> for Crop {
    fn from(row: CropRow) -> Self {
        Crop {
            id: row.id,
            name: row.name,
            varieties: row.varieties,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a crop
#[derive(Debug, Deserialize)]
pub struct CreateCropInput {
    pub name: Option<String>,
    #[serde(default)]
    pub varieties: Vec<String>,
}

/// Input for updating a crop
#[derive(Debug, Deserialize)]
pub struct UpdateCropInput {
    pub name: Option<String>,
    pub varieties: Option<Vec<String>>,
}

const CROP_COLUMNS: &str = "id, name, varieties, deleted, created_at, updated_at";

impl CropService {
    /// Create a new CropService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List crops by name, optionally filtered by a case-insensitive
    /// substring match
    pub async fn list_crops(&self, query: Option<&str>, limit: u32) -> AppResult<Vec<Crop>> {
        let limit = i64::from(limit.clamp(1, 1000));
        let pattern = format!("%{}%", query.unwrap_or("").trim());

        let rows = sqlx::query_as::<_, CropRow>(&format!(
            "SELECT {CROP_COLUMNS} FROM crops \
             WHERE NOT deleted AND name ILIKE $1 \
             ORDER BY name ASC LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Crop::from).collect())
    }

    /// Create a new crop; names are unique among live crops
    pub async fn create_crop(&self, input: CreateCropInput) -> AppResult<Crop> {
        let name = input.name.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation {
                code: "name_required",
                message: "name is required".to_string(),
            });
        }

        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM crops WHERE name = $1 AND NOT deleted")
                .bind(&name)
                .fetch_optional(&self.db)
                .await?;
        if exists.is_some() {
            return Err(AppError::Duplicate(format!(
                "crop '{}' already exists",
                name
            )));
        }

        let row = sqlx::query_as::<_, CropRow>(&format!(
            "INSERT INTO crops (name, varieties) VALUES ($1, $2) \
             RETURNING {CROP_COLUMNS}"
        ))
        .bind(&name)
        .bind(clean_varieties(&input.varieties))
        .fetch_one(&self.db)
        .await?;

        Ok(Crop::from(row))
    }

    /// Update a crop's name and/or variety list
    pub async fn update_crop(&self, crop_id: Uuid, input: UpdateCropInput) -> AppResult<Crop> {
        let existing = sqlx::query_as::<_, CropRow>(&format!(
            "SELECT {CROP_COLUMNS} FROM crops WHERE id = $1 AND NOT deleted"
        ))
        .bind(crop_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Crop".to_string()))?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or(existing.name);
        let varieties = input
            .varieties
            .map(|v| clean_varieties(&v))
            .unwrap_or(existing.varieties);

        let row = sqlx::query_as::<_, CropRow>(&format!(
            "UPDATE crops SET name = $1, varieties = $2, updated_at = now() \
             WHERE id = $3 RETURNING {CROP_COLUMNS}"
        ))
        .bind(&name)
        .bind(&varieties)
        .bind(crop_id)
        .fetch_one(&self.db)
        .await?;

        Ok(Crop::from(row))
    }

    /// Delete a crop: soft by default, hard on request
    pub async fn delete_crop(&self, crop_id: Uuid, hard: bool) -> AppResult<()> {
        let result = if hard {
            sqlx::query("DELETE FROM crops WHERE id = $1")
                .bind(crop_id)
                .execute(&self.db)
                .await?
        } else {
            sqlx::query(
                "UPDATE crops SET deleted = TRUE, updated_at = now() \
                 WHERE id = $1 AND NOT deleted",
            )
            .bind(crop_id)
            .execute(&self.db)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Crop".to_string()));
        }
        Ok(())
    }
}

/// Fold a field's crop write into the master list.
///
/// A new crop name inserts a record; an existing one gains the variety if
/// it is non-empty and not already listed. Blank names are a no-op, never
/// an error, so a field save cannot fail on master upkeep.
pub async fn upsert_crop_master(db: &PgPool, name: &str, variety: &str) -> AppResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(());
    }
    let variety = variety.trim();

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM crops WHERE name = $1 AND NOT deleted")
            .bind(name)
            .fetch_optional(db)
            .await?;

    match existing {
        Some((id,)) => {
            if !variety.is_empty() {
                sqlx::query(
                    "UPDATE crops \
                     SET varieties = array_append(varieties, $1), updated_at = now() \
                     WHERE id = $2 AND NOT ($1 = ANY(varieties))",
                )
                .bind(variety)
                .bind(id)
                .execute(db)
                .await?;
            }
        }
        None => {
            let varieties: Vec<String> = if variety.is_empty() {
                vec![]
            } else {
                vec![variety.to_string()]
            };
            sqlx::query("INSERT INTO crops (name, varieties) VALUES ($1, $2)")
                .bind(name)
                .bind(varieties)
                .execute(db)
                .await?;
        }
    }

    Ok(())
}
