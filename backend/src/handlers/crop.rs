//! Crop master handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::crop::{CreateCropInput, UpdateCropInput};
use crate::services::CropService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub hard: Option<bool>,
}

fn parse_crop_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::InvalidId(id.to_string()))
}

/// GET /api/crops
pub async fn list_crops(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<impl axum::response::IntoResponse> {
    let service = CropService::new(state.db.clone());
    let crops = service
        .list_crops(query.q.as_deref(), query.limit.unwrap_or(1000))
        .await?;
    Ok(Json(crops))
}

/// POST /api/crops
pub async fn create_crop(
    State(state): State<AppState>,
    Json(input): Json<CreateCropInput>,
) -> AppResult<impl axum::response::IntoResponse> {
    let service = CropService::new(state.db.clone());
    let crop = service.create_crop(input).await?;
    Ok((StatusCode::CREATED, Json(crop)))
}

/// PUT /api/crops/:id
pub async fn update_crop(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCropInput>,
) -> AppResult<impl axum::response::IntoResponse> {
    let crop_id = parse_crop_id(&id)?;
    let service = CropService::new(state.db.clone());
    let crop = service.update_crop(crop_id, input).await?;
    Ok(Json(crop))
}

/// DELETE /api/crops/:id
pub async fn delete_crop(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<impl axum::response::IntoResponse> {
    let crop_id = parse_crop_id(&id)?;
    let hard = query.hard.unwrap_or(false) || state.config.admin.hard_delete;
    let service = CropService::new(state.db.clone());
    service.delete_crop(crop_id, hard).await?;
    Ok(StatusCode::NO_CONTENT)
}
