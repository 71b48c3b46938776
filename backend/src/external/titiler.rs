//! TiTiler raster service client
//!
//! Two halves: pure, deterministic construction of NDVI tile/preview URLs
//! (no network I/O, reproducible for a given scene and geometry), and the
//! reqwest calls that consume them (zonal statistics with a POST->GET
//! fallback, preview PNG fetch).

use reqwest::Client;
use serde_json::Value;
use shared::{BoundingBox, NDVI_EXPRESSION};
use url::form_urlencoded;

use crate::error::{AppError, AppResult};

/// Fixed margin in degrees added around a field's bbox so the rendered
/// preview is not clipped to the polygon's exact edge
pub const BBOX_PADDING_DEG: f64 = 0.001;

/// Preview size bounds in pixels
pub const DEFAULT_PREVIEW_SIZE: u32 = 768;
pub const MIN_PREVIEW_SIZE: u32 = 256;
pub const MAX_PREVIEW_SIZE: u32 = 2048;

/// Raster service client
#[derive(Clone)]
pub struct TitilerClient {
    client: Client,
    base_url: String,
}

impl TitilerClient {
    /// Create a new TitilerClient
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Query string shared by every NDVI render request: band selection,
    /// expression, fixed rescale to [-1, 1], color ramp and resampling.
    fn render_query(item_url: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("url", item_url)
            .append_pair("assets", "nir,red")
            .append_pair("asset_as_band", "true")
            .append_pair("expression", NDVI_EXPRESSION)
            .append_pair("rescale", "-1,1")
            .append_pair("colormap_name", "rdylgn")
            .append_pair("resampling", "nearest")
            .finish()
    }

    /// z/x/y tile-template URL for a scene; the placeholders are left for
    /// the map client to fill in
    pub fn tile_template(&self, item_url: &str) -> String {
        format!(
            "{}/stac/tiles/WebMercatorQuad/{{z}}/{{x}}/{{y}}.png?{}",
            self.base_url,
            Self::render_query(item_url)
        )
    }

    /// Fixed-size bbox preview URL for a scene. The caller is expected to
    /// pad the bbox first; cache-busting parameters are the caller's
    /// business too.
    pub fn preview_url(&self, bbox: &BoundingBox, size: u32, item_url: &str) -> String {
        format!(
            "{}/stac/bbox/{}/{}x{}.png?{}",
            self.base_url,
            bbox.to_param(),
            size,
            size,
            Self::render_query(item_url)
        )
    }

    /// Zonal-statistics URL (query part only; geometry travels separately)
    fn statistics_url(&self, item_url: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("url", item_url)
            .append_pair("assets", "nir,red")
            .append_pair("asset_as_band", "true")
            .append_pair("expression", NDVI_EXPRESSION)
            .append_pair("categorical", "false")
            .append_pair("histogram", "true")
            .finish();
        format!("{}/stac/statistics?{}", self.base_url, query)
    }

    /// Fetch zonal statistics for a scene clipped to `geometry`.
    ///
    /// POSTs the geometry as a GeoJSON Feature body; if the service
    /// rejects that, retries once as a GET with the feature percent-encoded
    /// into a `geojson` query parameter. The raw JSON is returned as-is;
    /// normalization is the caller's job.
    pub async fn fetch_statistics(&self, item_url: &str, geometry: &Value) -> AppResult<Value> {
        let url = self.statistics_url(item_url);
        let feature = serde_json::json!({
            "type": "Feature",
            "properties": {},
            "geometry": geometry,
        });

        let post = self
            .client
            .post(&url)
            .json(&feature)
            .send()
            .await
            .map_err(|e| AppError::StatsFailed(format!("request failed: {}", e)))?;

        let response = if post.status().is_success() {
            post
        } else {
            // Compatibility fallback for deployments that reject POST
            // bodies on this route.
            let encoded: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("geojson", &feature.to_string())
                .finish();
            self.client
                .get(format!("{}&{}", url, encoded))
                .send()
                .await
                .map_err(|e| AppError::StatsFailed(format!("request failed: {}", e)))?
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StatsFailed(format!("{}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StatsFailed(format!("unparseable response: {}", e)))
    }

    /// Fetch a rendered preview PNG for a (padded) bbox
    pub async fn fetch_preview(
        &self,
        bbox: &BoundingBox,
        size: u32,
        item_url: &str,
    ) -> AppResult<Vec<u8>> {
        let url = self.preview_url(bbox, size, item_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::RasterFailed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::RasterFailed(format!("{}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::RasterFailed(format!("body read failed: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// Clamp a caller-supplied preview size to the allowed range
pub fn clamp_preview_size(size: Option<u32>) -> u32 {
    size.unwrap_or(DEFAULT_PREVIEW_SIZE)
        .clamp(MIN_PREVIEW_SIZE, MAX_PREVIEW_SIZE)
}
