//! NDVI endpoints: latest-scene report, zonal statistics, preview PNGs,
//! and the geometry-only "simple" variants used by external tooling

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::scene::{clamp_cloud, clamp_days};
use crate::services::NdviService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NdviQuery {
    pub field_id: Option<String>,
    /// Older clients send `id` instead of `field_id`
    pub id: Option<String>,
    pub days: Option<u32>,
    pub cloud: Option<u32>,
    pub size: Option<u32>,
    pub item_url: Option<String>,
}

impl NdviQuery {
    fn field_id(&self) -> AppResult<Uuid> {
        let raw = self
            .field_id
            .as_deref()
            .or(self.id.as_deref())
            .ok_or_else(|| AppError::InvalidFieldId("missing".to_string()))?;
        Uuid::parse_str(raw).map_err(|_| AppError::InvalidFieldId(raw.to_string()))
    }
}

fn ndvi_service(state: &AppState) -> NdviService {
    NdviService::new(state.db.clone(), state.stac.clone(), state.titiler.clone())
}

/// Previews are stamped per scene; never let intermediaries cache them.
fn png_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Search/render parameters for the `.simple` endpoints. The map client
/// POSTs them alongside the geometry, so body members win over query
/// parameters.
#[derive(Debug, PartialEq)]
struct SimpleParams {
    days: Option<u32>,
    cloud: Option<u32>,
    size: Option<u32>,
    item_url: Option<String>,
}

impl SimpleParams {
    fn from_request(body: &Value, query: &NdviQuery) -> Self {
        Self {
            days: body_u32(body, "days").or(query.days),
            cloud: body_u32(body, "cloud").or(query.cloud),
            size: body_u32(body, "size").or(query.size),
            item_url: body
                .get("item_url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| query.item_url.clone()),
        }
    }
}

/// Body members arrive as JSON numbers or numeric strings; anything else
/// falls through to the query/default.
fn body_u32(body: &Value, key: &str) -> Option<u32> {
    match body.get(key) {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pull the geometry out of a posted body that may be a bare geometry, a
/// Feature, or a wrapper object with a `feature` or `geometry` member.
fn extract_geometry(body: &Value) -> AppResult<Value> {
    let feature = if body.get("type").and_then(Value::as_str) == Some("Feature") {
        body
    } else if let Some(feature) = body.get("feature") {
        feature
    } else {
        body
    };

    let geometry = feature.get("geometry").unwrap_or(feature);
    if geometry.is_object() {
        Ok(geometry.clone())
    } else {
        Err(AppError::InvalidGeometry)
    }
}

/// GET /api/s2/ndvi/latest
pub async fn ndvi_latest(
    State(state): State<AppState>,
    Query(query): Query<NdviQuery>,
) -> AppResult<impl IntoResponse> {
    let field_id = query.field_id()?;
    let report = ndvi_service(&state)
        .latest(field_id, clamp_days(query.days), clamp_cloud(query.cloud))
        .await?;
    Ok(Json(report))
}

/// GET /api/s2/ndvi/stats
pub async fn ndvi_stats(
    State(state): State<AppState>,
    Query(query): Query<NdviQuery>,
) -> AppResult<impl IntoResponse> {
    let field_id = query.field_id()?;
    let report = ndvi_service(&state)
        .statistics(field_id, clamp_days(query.days), clamp_cloud(query.cloud))
        .await?;
    Ok(Json(report))
}

/// GET /api/s2/preview.png
pub async fn ndvi_preview(
    State(state): State<AppState>,
    Query(query): Query<NdviQuery>,
) -> AppResult<impl IntoResponse> {
    let field_id = query.field_id()?;
    let png = ndvi_service(&state)
        .preview_png(
            field_id,
            clamp_days(query.days),
            clamp_cloud(query.cloud),
            query.size,
            query.item_url.clone(),
        )
        .await?;
    Ok((png_headers(), png))
}

/// POST /api/s2/preview.simple
pub async fn ndvi_preview_simple(
    State(state): State<AppState>,
    Query(query): Query<NdviQuery>,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let geometry = extract_geometry(&body)?;
    let params = SimpleParams::from_request(&body, &query);
    let png = ndvi_service(&state)
        .preview_simple(
            &geometry,
            clamp_days(params.days),
            clamp_cloud(params.cloud),
            params.size,
            params.item_url,
        )
        .await?;
    Ok((png_headers(), png))
}

/// POST /api/s2/stats.simple
pub async fn ndvi_stats_simple(
    State(state): State<AppState>,
    Query(query): Query<NdviQuery>,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let geometry = extract_geometry(&body)?;
    let params = SimpleParams::from_request(&body, &query);
    let report = ndvi_service(&state)
        .stats_simple(
            &geometry,
            clamp_days(params.days),
            clamp_cloud(params.cloud),
            params.item_url,
        )
        .await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_geometry_variants() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [[[139.0, 35.0], [139.1, 35.0], [139.1, 35.1], [139.0, 35.0]]],
        });

        // Bare geometry
        assert_eq!(extract_geometry(&geometry).unwrap(), geometry);

        // Feature
        let feature = json!({"type": "Feature", "properties": {}, "geometry": geometry});
        assert_eq!(extract_geometry(&feature).unwrap(), geometry);

        // Wrapper with a feature member
        let wrapped = json!({"feature": feature});
        assert_eq!(extract_geometry(&wrapped).unwrap(), geometry);

        // Wrapper with a geometry member
        let wrapped = json!({"geometry": geometry});
        assert_eq!(extract_geometry(&wrapped).unwrap(), geometry);

        assert!(extract_geometry(&json!({"geometry": "nope"})).is_err());
    }

    fn empty_query() -> NdviQuery {
        NdviQuery {
            field_id: None,
            id: None,
            days: None,
            cloud: None,
            size: None,
            item_url: None,
        }
    }

    #[test]
    fn test_simple_params_come_from_the_body() {
        let body = json!({
            "geometry": { "type": "Polygon", "coordinates": [[]] },
            "days": 60,
            "cloud": 85,
            "size": 512,
            "item_url": "https://catalog.example/items/S2B_123",
        });
        let params = SimpleParams::from_request(&body, &empty_query());
        assert_eq!(params.days, Some(60));
        assert_eq!(params.cloud, Some(85));
        assert_eq!(params.size, Some(512));
        assert_eq!(
            params.item_url.as_deref(),
            Some("https://catalog.example/items/S2B_123")
        );
    }

    #[test]
    fn test_simple_params_accept_numeric_strings() {
        let body = json!({ "days": "60", "size": " 512 " });
        let params = SimpleParams::from_request(&body, &empty_query());
        assert_eq!(params.days, Some(60));
        assert_eq!(params.size, Some(512));
        assert_eq!(params.cloud, None);
    }

    #[test]
    fn test_simple_params_fall_back_to_query() {
        let body = json!({ "days": 60 });
        let query = NdviQuery {
            days: Some(5),
            cloud: Some(40),
            item_url: Some("https://catalog.example/items/from-query".to_string()),
            ..empty_query()
        };
        let params = SimpleParams::from_request(&body, &query);
        // Body wins where present, query fills the rest.
        assert_eq!(params.days, Some(60));
        assert_eq!(params.cloud, Some(40));
        assert_eq!(
            params.item_url.as_deref(),
            Some("https://catalog.example/items/from-query")
        );
    }

    #[test]
    fn test_field_id_accepts_both_parameter_names() {
        let by_field_id = NdviQuery {
            field_id: Some("d4f9f8a0-0000-0000-0000-000000000000".to_string()),
            id: None,
            days: None,
            cloud: None,
            size: None,
            item_url: None,
        };
        assert!(by_field_id.field_id().is_ok());

        let by_id = NdviQuery {
            field_id: None,
            id: Some("d4f9f8a0-0000-0000-0000-000000000000".to_string()),
            days: None,
            cloud: None,
            size: None,
            item_url: None,
        };
        assert!(by_id.field_id().is_ok());

        let neither = NdviQuery {
            field_id: None,
            id: None,
            days: None,
            cloud: None,
            size: None,
            item_url: None,
        };
        assert!(matches!(
            neither.field_id(),
            Err(AppError::InvalidFieldId(_))
        ));
    }
}
