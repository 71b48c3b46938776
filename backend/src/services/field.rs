//! Field management service
//!
//! CRUD over the `fields` table: polygon geometry stored as JSONB, area
//! rounded to 2 decimals at write time, per-year crop history, soft delete
//! by default. Crop writes feed the crop master as a side effect.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{apply_crop_write, geometry_area_ha, round_area_ha, CropHistoryEntry, Field};

use crate::error::{AppError, AppResult};
use crate::services::crop::upsert_crop_master;

/// Field service for managing field records
#[derive(Clone)]
pub struct FieldService {
    db: PgPool,
}

/// Database row for a field record
#[derive(Debug, sqlx::FromRow)]
struct FieldRow {
    id: Uuid,
    name: String,
    memo: String,
    area_ha: Decimal,
    geometry: Option<Value>,
    geometry_json: Option<String>,
    crop_history: Json<Vec<CropHistoryEntry>>,
    current_crop: String,
    current_year: Option<i32>,
    deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FieldRow> for Field {
    fn from(row: FieldRow) -> Self {
        Field {
            id: row.id,
            name: row.name,
            memo: row.memo,
            area_ha: row.area_ha,
            geometry: row.geometry,
            geometry_json: row.geometry_json,
            crop_history: row.crop_history.0,
            current_crop: row.current_crop,
            current_year: row.current_year,
            deleted: row.deleted,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// API representation of a field: the record plus a `crop` alias for the
/// current crop (kept for older map clients) and a guaranteed
/// `geometry_json` when a geometry exists
#[derive(Debug, Serialize)]
pub struct FieldResponse {
    #[serde(flatten)]
    pub field: Field,
    pub crop: String,
}

impl From<Field> for FieldResponse {
    fn from(mut field: Field) -> Self {
        if field.geometry_json.is_none() {
            field.geometry_json = field.geometry.as_ref().map(|g| {
                serde_json::json!({
                    "type": "Feature",
                    "properties": {},
                    "geometry": g,
                })
                .to_string()
            });
        }
        let crop = field.current_crop.clone();
        FieldResponse { field, crop }
    }
}

/// Input for creating a field
#[derive(Debug, Deserialize)]
pub struct CreateFieldInput {
    pub name: Option<String>,
    pub crop: Option<String>,
    pub variety: Option<String>,
    pub year: Option<i32>,
    pub memo: Option<String>,
    pub area_ha: Option<f64>,
    pub geometry_json: Option<String>,
}

/// Input for updating a field; only supplied attributes change
#[derive(Debug, Deserialize)]
pub struct UpdateFieldInput {
    pub name: Option<String>,
    pub crop: Option<String>,
    pub variety: Option<String>,
    pub year: Option<i32>,
    pub memo: Option<String>,
    pub area_ha: Option<f64>,
    pub geometry_json: Option<String>,
}

const FIELD_COLUMNS: &str = "id, name, memo, area_ha, geometry, geometry_json, crop_history, \
     current_crop, current_year, deleted, deleted_at, created_at, updated_at";

impl FieldService {
    /// Create a new FieldService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List fields newest first, soft-deleted excluded
    pub async fn list_fields(&self, page: u32, limit: u32) -> AppResult<Vec<FieldResponse>> {
        let limit = i64::from(limit.clamp(1, 1000));
        let offset = i64::from(page.max(1) - 1) * limit;

        let rows = sqlx::query_as::<_, FieldRow>(&format!(
            "SELECT {FIELD_COLUMNS} FROM fields WHERE NOT deleted \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FieldResponse::from(Field::from(row)))
            .collect())
    }

    /// Get a field by id
    pub async fn get_field(&self, field_id: Uuid) -> AppResult<FieldResponse> {
        let row = sqlx::query_as::<_, FieldRow>(&format!(
            "SELECT {FIELD_COLUMNS} FROM fields WHERE id = $1 AND NOT deleted"
        ))
        .bind(field_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::FieldNotFound)?;

        Ok(FieldResponse::from(Field::from(row)))
    }

    /// Create a new field
    pub async fn create_field(&self, input: CreateFieldInput) -> AppResult<FieldResponse> {
        let geometry_json = input.geometry_json.ok_or(AppError::Validation {
            code: "geometry_json_required",
            message: "geometry_json is required".to_string(),
        })?;
        let geometry = parse_feature_geometry(&geometry_json)?;

        // Round at write time; compute from the ring when the client did
        // not supply an area.
        let area_ha = round_area_ha(
            input
                .area_ha
                .unwrap_or_else(|| geometry_area_ha(&geometry)),
        );

        let crop = input.crop.unwrap_or_default().trim().to_string();
        let variety = input.variety.unwrap_or_default().trim().to_string();
        let current_year = input.year.unwrap_or_else(|| Utc::now().year());

        let mut crop_history: Vec<CropHistoryEntry> = Vec::new();
        if !crop.is_empty() {
            crop_history.push(CropHistoryEntry::new(current_year, &crop, &variety));
        }

        let row = sqlx::query_as::<_, FieldRow>(&format!(
            "INSERT INTO fields \
                 (name, memo, area_ha, geometry, geometry_json, crop_history, \
                  current_crop, current_year) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {FIELD_COLUMNS}"
        ))
        .bind(input.name.unwrap_or_default())
        .bind(input.memo.unwrap_or_default())
        .bind(area_ha)
        .bind(&geometry)
        .bind(&geometry_json)
        .bind(Json(&crop_history))
        .bind(&crop)
        .bind(current_year)
        .fetch_one(&self.db)
        .await?;

        if !crop.is_empty() {
            upsert_crop_master(&self.db, &crop, &variety).await?;
        }

        Ok(FieldResponse::from(Field::from(row)))
    }

    /// Update a field; partial-update semantics
    pub async fn update_field(
        &self,
        field_id: Uuid,
        input: UpdateFieldInput,
    ) -> AppResult<FieldResponse> {
        let existing = sqlx::query_as::<_, FieldRow>(&format!(
            "SELECT {FIELD_COLUMNS} FROM fields WHERE id = $1"
        ))
        .bind(field_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::FieldNotFound)?;
        let mut field = Field::from(existing);

        if let Some(name) = input.name {
            field.name = name;
        }
        if let Some(memo) = input.memo {
            field.memo = memo;
        }
        if let Some(area_ha) = input.area_ha {
            field.area_ha = round_area_ha(area_ha);
        }
        if let Some(geometry_json) = input.geometry_json {
            field.geometry = Some(parse_feature_geometry(&geometry_json)?);
            field.geometry_json = Some(geometry_json);
        }

        let mut crop_written: Option<(String, String)> = None;
        if let Some(crop) = input.crop {
            let crop = crop.trim().to_string();
            let variety = input.variety.unwrap_or_default().trim().to_string();
            let year = input.year.unwrap_or_else(|| Utc::now().year());

            apply_crop_write(&mut field.crop_history, year, &crop, &variety);
            field.current_crop = crop.clone();
            field.current_year = Some(year);
            crop_written = Some((crop, variety));
        }

        let row = sqlx::query_as::<_, FieldRow>(&format!(
            "UPDATE fields \
             SET name = $1, memo = $2, area_ha = $3, geometry = $4, geometry_json = $5, \
                 crop_history = $6, current_crop = $7, current_year = $8, updated_at = now() \
             WHERE id = $9 \
             RETURNING {FIELD_COLUMNS}"
        ))
        .bind(&field.name)
        .bind(&field.memo)
        .bind(field.area_ha)
        .bind(&field.geometry)
        .bind(&field.geometry_json)
        .bind(Json(&field.crop_history))
        .bind(&field.current_crop)
        .bind(field.current_year)
        .bind(field_id)
        .fetch_one(&self.db)
        .await?;

        if let Some((crop, variety)) = crop_written {
            upsert_crop_master(&self.db, &crop, &variety).await?;
        }

        Ok(FieldResponse::from(Field::from(row)))
    }

    /// Delete a field: soft by default, hard on request
    pub async fn delete_field(&self, field_id: Uuid, hard: bool) -> AppResult<()> {
        let result = if hard {
            sqlx::query("DELETE FROM fields WHERE id = $1")
                .bind(field_id)
                .execute(&self.db)
                .await?
        } else {
            sqlx::query(
                "UPDATE fields SET deleted = TRUE, deleted_at = now(), updated_at = now() \
                 WHERE id = $1 AND NOT deleted",
            )
            .bind(field_id)
            .execute(&self.db)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(AppError::FieldNotFound);
        }
        Ok(())
    }
}

/// Parse a submitted GeoJSON Feature string and extract its geometry.
///
/// The geometry must carry a `type` and a `coordinates` array (or be a
/// Point with coordinates); anything else is a client input error.
pub fn parse_feature_geometry(geometry_json: &str) -> AppResult<Value> {
    let feature: Value =
        serde_json::from_str(geometry_json).map_err(|_| AppError::InvalidGeometry)?;
    let geometry = feature
        .get("geometry")
        .cloned()
        .unwrap_or(feature);

    let has_type = geometry.get("type").and_then(Value::as_str).is_some();
    let has_coordinates = geometry
        .get("coordinates")
        .map(Value::is_array)
        .unwrap_or(false);

    if has_type && has_coordinates {
        Ok(geometry)
    } else {
        Err(AppError::InvalidGeometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_feature_geometry_accepts_feature() {
        let raw = json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[139.0, 35.0], [139.1, 35.0], [139.1, 35.1], [139.0, 35.0]]],
            },
        })
        .to_string();
        let geometry = parse_feature_geometry(&raw).unwrap();
        assert_eq!(geometry["type"], "Polygon");
    }

    #[test]
    fn test_parse_feature_geometry_accepts_bare_geometry() {
        let raw = json!({
            "type": "Polygon",
            "coordinates": [[[139.0, 35.0], [139.1, 35.0], [139.1, 35.1], [139.0, 35.0]]],
        })
        .to_string();
        assert!(parse_feature_geometry(&raw).is_ok());
    }

    #[test]
    fn test_parse_feature_geometry_rejects_garbage() {
        assert!(matches!(
            parse_feature_geometry("not json"),
            Err(AppError::InvalidGeometry)
        ));
        assert!(matches!(
            parse_feature_geometry(r#"{"type": "Feature"}"#),
            Err(AppError::InvalidGeometry)
        ));
        assert!(matches!(
            parse_feature_geometry(r#"{"geometry": {"type": "Polygon"}}"#),
            Err(AppError::InvalidGeometry)
        ));
    }

    #[test]
    fn test_field_response_derives_geometry_json() {
        let field = Field {
            id: Uuid::nil(),
            name: "test".to_string(),
            memo: String::new(),
            area_ha: Decimal::ZERO,
            geometry: Some(json!({"type": "Polygon", "coordinates": [[]]})),
            geometry_json: None,
            crop_history: vec![],
            current_crop: "wheat".to_string(),
            current_year: Some(2026),
            deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response = FieldResponse::from(field);
        assert_eq!(response.crop, "wheat");
        let derived: Value =
            serde_json::from_str(response.field.geometry_json.as_deref().unwrap()).unwrap();
        assert_eq!(derived["type"], "Feature");
        assert_eq!(derived["geometry"]["type"], "Polygon");
    }
}
