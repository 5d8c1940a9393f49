//! Prowlarr adapter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::adapter::{classify_request_error, error_for_status, IndexerAdapter};
use super::inference::{infer_language, infer_quality};
use super::types::{
    AdapterQuery, BackendKind, IndexerEndpoint, SearchError, Torrent, TorrentIndexer,
};

const API_KEY_HEADER: &str = "X-Api-Key";
const API_SUFFIX: &str = "/api/v1";

/// Prowlarr exposes a camelCase JSON API under `/api/v1`, authenticated with
/// an `X-Api-Key` header.
pub struct ProwlarrAdapter {
    client: Client,
}

impl ProwlarrAdapter {
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::ApiError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn api_url(base_url: &str) -> String {
        let trimmed = base_url.trim_end_matches('/');
        let root = trimmed.strip_suffix(API_SUFFIX).unwrap_or(trimmed);
        format!("{}{}", root, API_SUFFIX)
    }

    fn build_search_url(endpoint: &IndexerEndpoint, query: &AdapterQuery) -> String {
        let mut url = format!(
            "{}/search?query={}&type=search",
            Self::api_url(&endpoint.base_url),
            urlencoding::encode(&query.query)
        );

        if let Some(indexer) = &query.indexer_id {
            url.push_str(&format!("&indexerIds={}", urlencoding::encode(indexer)));
        }
        if let Some(kind) = query.media_kind {
            url.push_str(&format!("&categories={}", kind.category_id()));
        }

        url
    }

    fn map_result(result: ProwlarrResult) -> Option<Torrent> {
        let link = result.magnet_url.or(result.download_url)?;
        let seeders = result.seeders.unwrap_or(0).max(0) as u32;
        let leechers = result.leechers.unwrap_or(0).max(0) as u32;

        Some(Torrent {
            quality: infer_quality(&result.title),
            language: infer_language(&result.title),
            tracker: result.indexer.unwrap_or_default(),
            size: result.size.unwrap_or(0).max(0) as u64,
            publish_date: result.publish_date,
            seeders,
            peers: seeders.saturating_add(leechers),
            guid: result.guid.unwrap_or_else(|| link.clone()),
            link,
            details_url: result.info_url,
            title: result.title,
            backend: BackendKind::Prowlarr,
        })
    }
}

#[async_trait]
impl IndexerAdapter for ProwlarrAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Prowlarr
    }

    async fn list_indexers(&self, endpoint: &IndexerEndpoint) -> Vec<TorrentIndexer> {
        let url = format!("{}/indexer", Self::api_url(&endpoint.base_url));

        let response = match self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &endpoint.api_key)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Failed to list Prowlarr indexers");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Prowlarr rejected indexer listing");
            return Vec::new();
        }

        match response.json::<Vec<ProwlarrIndexer>>().await {
            Ok(indexers) => indexers
                .into_iter()
                .filter(|i| i.enable.unwrap_or(true))
                .map(|i| TorrentIndexer {
                    id: i.id.to_string(),
                    name: i.name,
                    privacy: i.privacy,
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Malformed Prowlarr indexer listing");
                Vec::new()
            }
        }
    }

    async fn search(
        &self,
        query: &AdapterQuery,
        endpoint: &IndexerEndpoint,
    ) -> Result<Vec<Torrent>, SearchError> {
        let url = Self::build_search_url(endpoint, query);
        let indexer = query.indexer_id.as_deref().unwrap_or("all");
        debug!(indexer = indexer, "Searching Prowlarr");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &endpoint.api_key)
            .send()
            .await
            .map_err(classify_request_error)?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let results: Vec<ProwlarrResult> = response
            .json()
            .await
            .map_err(|e| SearchError::ApiError(format!("Failed to parse response: {}", e)))?;

        debug!(
            indexer = indexer,
            results = results.len(),
            "Prowlarr search complete"
        );

        Ok(results.into_iter().filter_map(Self::map_result).collect())
    }
}

#[derive(Debug, Deserialize)]
struct ProwlarrIndexer {
    id: i64,
    name: String,
    #[serde(default)]
    privacy: Option<String>,
    #[serde(default)]
    enable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProwlarrResult {
    title: String,
    #[serde(default)]
    guid: Option<String>,
    #[serde(default)]
    indexer: Option<String>,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default)]
    publish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    seeders: Option<i32>,
    #[serde(default)]
    leechers: Option<i32>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    magnet_url: Option<String>,
    #[serde(default)]
    info_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::types::{MediaKind, Quality};

    fn endpoint(base_url: &str) -> IndexerEndpoint {
        IndexerEndpoint {
            base_url: base_url.to_string(),
            api_key: "secret".to_string(),
        }
    }

    #[test]
    fn test_api_url_normalization() {
        assert_eq!(
            ProwlarrAdapter::api_url("http://localhost:9696/"),
            "http://localhost:9696/api/v1"
        );
        assert_eq!(
            ProwlarrAdapter::api_url("http://localhost:9696/api/v1"),
            "http://localhost:9696/api/v1"
        );
    }

    #[test]
    fn test_build_search_url_keeps_key_out_of_query() {
        let query = AdapterQuery {
            query: "the matrix".to_string(),
            media_kind: Some(MediaKind::Movie),
            indexer_id: Some("12".to_string()),
        };

        let url = ProwlarrAdapter::build_search_url(&endpoint("http://p:9696"), &query);
        assert!(url.starts_with("http://p:9696/api/v1/search?query=the%20matrix&type=search"));
        assert!(url.contains("&indexerIds=12"));
        assert!(url.contains("&categories=2000"));
        assert!(!url.contains("secret"));
    }

    #[test]
    fn test_map_result_counts_peers() {
        let result: ProwlarrResult = serde_json::from_value(serde_json::json!({
            "title": "Show.S01E01.2160p",
            "guid": "https://tracker/t/1",
            "indexer": "TorrentLeech",
            "size": 4_000_000_000i64,
            "publishDate": "2021-03-04T05:06:07Z",
            "seeders": 10,
            "leechers": 5,
            "downloadUrl": "http://p/download/1"
        }))
        .unwrap();

        let torrent = ProwlarrAdapter::map_result(result).unwrap();
        assert_eq!(torrent.link, "http://p/download/1");
        assert_eq!(torrent.tracker, "TorrentLeech");
        assert_eq!(torrent.seeders, 10);
        assert_eq!(torrent.peers, 15);
        assert_eq!(torrent.quality, Quality::FourK);
        assert!(torrent.publish_date.is_some());
        assert_eq!(torrent.backend, BackendKind::Prowlarr);
    }

    #[test]
    fn test_map_result_without_link_is_dropped() {
        let result: ProwlarrResult =
            serde_json::from_value(serde_json::json!({ "title": "orphan" })).unwrap();
        assert!(ProwlarrAdapter::map_result(result).is_none());
    }
}
