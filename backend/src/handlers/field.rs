//! Field CRUD handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::field::{CreateFieldInput, UpdateFieldInput};
use crate::services::FieldService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub hard: Option<bool>,
}

fn parse_field_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::InvalidFieldId(id.to_string()))
}

/// GET /api/fields
pub async fn list_fields(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<impl axum::response::IntoResponse> {
    let service = FieldService::new(state.db.clone());
    let fields = service
        .list_fields(query.page.unwrap_or(1), query.limit.unwrap_or(100))
        .await?;
    Ok(Json(fields))
}

/// GET /api/fields/:id
pub async fn get_field(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    let field_id = parse_field_id(&id)?;
    let service = FieldService::new(state.db.clone());
    let field = service.get_field(field_id).await?;
    Ok(Json(field))
}

/// POST /api/fields
pub async fn create_field(
    State(state): State<AppState>,
    Json(input): Json<CreateFieldInput>,
) -> AppResult<impl axum::response::IntoResponse> {
    let service = FieldService::new(state.db.clone());
    let field = service.create_field(input).await?;
    Ok((StatusCode::CREATED, Json(field)))
}

/// PUT /api/fields/:id
pub async fn update_field(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateFieldInput>,
) -> AppResult<impl axum::response::IntoResponse> {
    let field_id = parse_field_id(&id)?;
    let service = FieldService::new(state.db.clone());
    let field = service.update_field(field_id, input).await?;
    Ok(Json(field))
}

/// DELETE /api/fields/:id
pub async fn delete_field(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<impl axum::response::IntoResponse> {
    let field_id = parse_field_id(&id)?;
    let hard = query.hard.unwrap_or(false) || state.config.admin.hard_delete;
    let service = FieldService::new(state.db.clone());
    service.delete_field(field_id, hard).await?;
    Ok(StatusCode::NO_CONTENT)
}
