//! STAC catalog search client
//!
//! Issues item searches against a public STAC API and resolves each hit's
//! canonical self-URL. One search per relaxation stage, newest item only.

use chrono::{DateTime, Duration, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::SceneReference;

use crate::error::{AppError, AppResult};
use crate::services::scene::{CatalogSearch, SearchStage};

/// Characters kept verbatim in a URL path segment; everything else is
/// %XX-escaped, so a space becomes `%20`, never `+`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// STAC search client
#[derive(Clone)]
pub struct StacClient {
    client: Client,
    search_url: String,
    collection: String,
}

/// Search response; only the pieces we consume
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    features: Vec<StacItem>,
}

#[derive(Debug, Deserialize)]
struct StacItem {
    id: String,
    #[serde(default)]
    links: Vec<StacLink>,
    #[serde(default)]
    properties: StacProperties,
}

#[derive(Debug, Deserialize)]
struct StacLink {
    rel: String,
    href: String,
}

#[derive(Debug, Default, Deserialize)]
struct StacProperties {
    datetime: Option<DateTime<Utc>>,
    #[serde(rename = "eo:cloud_cover")]
    cloud_cover: Option<f64>,
}

impl StacClient {
    /// Create a new StacClient
    pub fn new(search_url: String, collection: String) -> Self {
        Self {
            client: Client::new(),
            search_url,
            collection,
        }
    }

    /// Build the search body for one stage: fixed collection, recency
    /// window, spatial intersection, cloud ceiling, newest-first, limit 1.
    fn search_body(&self, geometry: &Value, stage: SearchStage, now: DateTime<Utc>) -> Value {
        let from = now - Duration::days(i64::from(stage.days));
        json!({
            "collections": [self.collection],
            "datetime": format!("{}/{}",
                from.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            "intersects": geometry,
            "query": { "eo:cloud_cover": { "lte": stage.cloud } },
            "limit": 1,
            "sortby": [{ "field": "properties.datetime", "direction": "desc" }],
        })
    }

    /// Canonical item URL: the item's `self` link, or the collection item
    /// path derived from the search endpoint when no self link exists.
    fn item_url(&self, item: &StacItem) -> String {
        item.links
            .iter()
            .find(|l| l.rel == "self")
            .map(|l| l.href.clone())
            .unwrap_or_else(|| {
                let base = self.search_url.trim_end_matches("/search");
                let id = utf8_percent_encode(&item.id, PATH_SEGMENT);
                format!("{}/collections/{}/items/{}", base, self.collection, id)
            })
    }

    fn to_scene(&self, item: StacItem) -> SceneReference {
        let item_url = self.item_url(&item);
        SceneReference {
            id: item.id,
            item_url,
            datetime: item.properties.datetime,
            cloud_cover: item.properties.cloud_cover,
        }
    }
}

#[axum::async_trait]
impl CatalogSearch for StacClient {
    async fn latest_scene(
        &self,
        geometry: &Value,
        stage: SearchStage,
    ) -> AppResult<Option<SceneReference>> {
        let body = self.search_body(geometry, stage, Utc::now());

        let response = self
            .client
            .post(&self.search_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::CatalogSearch(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::CatalogSearch(format!("{}: {}", status, body)));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::CatalogSearch(format!("unparseable response: {}", e)))?;

        Ok(data.features.into_iter().next().map(|i| self.to_scene(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StacClient {
        StacClient::new(
            "https://earth-search.aws.element84.com/v1/search".to_string(),
            "sentinel-2-l2a".to_string(),
        )
    }

    #[test]
    fn test_search_body_shape() {
        let geometry = json!({"type": "Polygon", "coordinates": [[]]});
        let now = "2026-08-30T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let body = client().search_body(&geometry, SearchStage { days: 10, cloud: 70 }, now);

        assert_eq!(body["collections"], json!(["sentinel-2-l2a"]));
        assert_eq!(body["limit"], json!(1));
        assert_eq!(body["query"]["eo:cloud_cover"]["lte"], json!(70));
        assert_eq!(body["sortby"][0]["direction"], json!("desc"));
        assert_eq!(
            body["datetime"],
            json!("2026-08-20T00:00:00.000Z/2026-08-30T00:00:00.000Z")
        );
    }

    #[test]
    fn test_item_url_prefers_self_link() {
        let item = StacItem {
            id: "S2B_123".to_string(),
            links: vec![
                StacLink {
                    rel: "collection".to_string(),
                    href: "https://x/collections/sentinel-2-l2a".to_string(),
                },
                StacLink {
                    rel: "self".to_string(),
                    href: "https://x/items/S2B_123".to_string(),
                },
            ],
            properties: StacProperties::default(),
        };
        assert_eq!(client().item_url(&item), "https://x/items/S2B_123");
    }

    #[test]
    fn test_item_url_fallback_percent_encodes_path_segment() {
        let item = StacItem {
            id: "S2B 12/3".to_string(),
            links: vec![],
            properties: StacProperties::default(),
        };
        // Path segments use %20 for spaces, not the form-encoding `+`.
        assert_eq!(
            client().item_url(&item),
            "https://earth-search.aws.element84.com/v1/collections/sentinel-2-l2a/items/S2B%2012%2F3"
        );
    }

    #[test]
    fn test_item_url_fallback_keeps_typical_ids_verbatim() {
        let item = StacItem {
            id: "S2B_54SVE_20260820_0_L2A".to_string(),
            links: vec![],
            properties: StacProperties::default(),
        };
        assert_eq!(
            client().item_url(&item),
            "https://earth-search.aws.element84.com/v1/collections/sentinel-2-l2a/items/S2B_54SVE_20260820_0_L2A"
        );
    }
}
