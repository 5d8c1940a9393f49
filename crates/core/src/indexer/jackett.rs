//! Jackett adapter.

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

const API_SUFFIX: &str = "/api/v2.0";

/// Jackett speaks the Torznab-flavoured JSON API under `/api/v2.0` and takes
/// the key as an `apikey` query parameter.
pub struct JackettAdapter {
    client: Client,
}

impl JackettAdapter {
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::ApiError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Accepts base URLs with or without the `/api/v2.0` suffix.
    fn api_url(base_url: &str) -> String {
        let trimmed = base_url.trim_end_matches('/');
        if trimmed.ends_with(API_SUFFIX) {
            trimmed.to_string()
        } else {
            format!("{}{}", trimmed, API_SUFFIX)
        }
    }

    fn build_indexers_url(endpoint: &IndexerEndpoint) -> String {
        format!(
            "{}/indexers?apikey={}&configured=true",
            Self::api_url(&endpoint.base_url),
            urlencoding::encode(&endpoint.api_key)
        )
    }

    fn build_search_url(endpoint: &IndexerEndpoint, query: &AdapterQuery) -> String {
        let indexer = query.indexer_id.as_deref().unwrap_or("all");
        let mut url = format!(
            "{}/indexers/{}/results?apikey={}&Query={}",
            Self::api_url(&endpoint.base_url),
            urlencoding::encode(indexer),
            urlencoding::encode(&endpoint.api_key),
            urlencoding::encode(&query.query)
        );

        if let Some(kind) = query.media_kind {
            url.push_str(&format!(
                "&Type={}&Category[]={}",
                kind.as_str(),
                kind.category_id()
            ));
        }

        url
    }

    fn map_result(result: JackettResult, fallback_tracker: &str) -> Option<Torrent> {
        let link = result.MagnetUri.or(result.Link)?;
        let seeders = result.Seeders.unwrap_or(0).max(0) as u32;

        Some(Torrent {
            quality: infer_quality(&result.Title),
            language: infer_language(&result.Title),
            tracker: result
                .Tracker
                .unwrap_or_else(|| fallback_tracker.to_string()),
            size: result.Size.unwrap_or(0).max(0) as u64,
            publish_date: result.PublishDate.as_deref().and_then(parse_jackett_date),
            seeders,
            peers: result.Peers.unwrap_or(0).max(0) as u32,
            guid: result.Guid.unwrap_or_else(|| link.clone()),
            link,
            details_url: result.Details,
            title: result.Title,
            backend: BackendKind::Jackett,
        })
    }
}

#[async_trait]
impl IndexerAdapter for JackettAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Jackett
    }

    async fn list_indexers(&self, endpoint: &IndexerEndpoint) -> Vec<TorrentIndexer> {
        let url = Self::build_indexers_url(endpoint);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Failed to list Jackett indexers");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Jackett rejected indexer listing");
            return Vec::new();
        }

        match response.json::<Vec<JackettIndexer>>().await {
            Ok(indexers) => indexers
                .into_iter()
                .map(|i| TorrentIndexer {
                    id: i.id,
                    name: i.name,
                    privacy: i.privacy,
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Malformed Jackett indexer listing");
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
        debug!(indexer = indexer, "Searching Jackett");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_request_error)?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body: JackettResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ApiError(format!("Failed to parse response: {}", e)))?;

        debug!(
            indexer = indexer,
            results = body.Results.len(),
            "Jackett search complete"
        );

        Ok(body
            .Results
            .into_iter()
            .filter_map(|r| Self::map_result(r, indexer))
            .collect())
    }
}

/// Parse Jackett's date format.
fn parse_jackett_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

#[derive(Debug, Deserialize)]
struct JackettIndexer {
    #[serde(alias = "ID")]
    id: String,
    #[serde(alias = "Name")]
    name: String,
    #[serde(default, alias = "type", alias = "Type")]
    privacy: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    Tracker: Option<String>,
    Size: Option<i64>,
    PublishDate: Option<String>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
    Link: Option<String>,
    MagnetUri: Option<String>,
    Guid: Option<String>,
    Details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::types::{MediaKind, Quality};
    use chrono::Datelike;

    fn endpoint(base_url: &str) -> IndexerEndpoint {
        IndexerEndpoint {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
        }
    }

    #[test]
    fn test_api_url_normalization() {
        assert_eq!(
            JackettAdapter::api_url("http://localhost:9117"),
            "http://localhost:9117/api/v2.0"
        );
        assert_eq!(
            JackettAdapter::api_url("http://localhost:9117/"),
            "http://localhost:9117/api/v2.0"
        );
        assert_eq!(
            JackettAdapter::api_url("http://localhost:9117/api/v2.0/"),
            "http://localhost:9117/api/v2.0"
        );
    }

    #[test]
    fn test_build_search_url_all_indexers() {
        let query = AdapterQuery {
            query: "test query".to_string(),
            media_kind: None,
            indexer_id: None,
        };

        let url = JackettAdapter::build_search_url(&endpoint("http://localhost:9117"), &query);
        assert!(url.starts_with("http://localhost:9117/api/v2.0/indexers/all/results?"));
        assert!(url.contains("apikey=test-key"));
        assert!(url.contains("Query=test%20query"));
        assert!(!url.contains("Category"));
        assert!(!url.contains("Type="));
    }

    #[test]
    fn test_build_search_url_with_indexer_and_category() {
        let query = AdapterQuery {
            query: "dune".to_string(),
            media_kind: Some(MediaKind::Tv),
            indexer_id: Some("1337x".to_string()),
        };

        let url = JackettAdapter::build_search_url(&endpoint("http://j:9117/"), &query);
        assert!(url.contains("/indexers/1337x/results"));
        assert!(url.contains("&Type=tv&Category[]=5000"));
    }

    #[test]
    fn test_build_indexers_url() {
        let url = JackettAdapter::build_indexers_url(&endpoint("http://j:9117"));
        assert_eq!(
            url,
            "http://j:9117/api/v2.0/indexers?apikey=test-key&configured=true"
        );
    }

    #[test]
    fn test_map_result_prefers_magnet() {
        let result: JackettResult = serde_json::from_value(serde_json::json!({
            "Title": "Movie.2020.1080p.FRENCH",
            "Tracker": "YTS",
            "Size": 1_500_000_000i64,
            "PublishDate": "2020-05-01T12:00:00",
            "Seeders": 42,
            "Peers": 50,
            "Link": "http://j/dl/1.torrent",
            "MagnetUri": "magnet:?xt=urn:btih:abc",
            "Guid": "guid-1",
            "Details": "http://yts/1"
        }))
        .unwrap();

        let torrent = JackettAdapter::map_result(result, "all").unwrap();
        assert_eq!(torrent.link, "magnet:?xt=urn:btih:abc");
        assert_eq!(torrent.tracker, "YTS");
        assert_eq!(torrent.seeders, 42);
        assert_eq!(torrent.peers, 50);
        assert_eq!(torrent.quality, Quality::Hd);
        assert_eq!(torrent.language.as_deref(), Some("fr"));
        assert_eq!(torrent.publish_date.unwrap().year(), 2020);
        assert_eq!(torrent.backend, BackendKind::Jackett);
    }

    #[test]
    fn test_map_result_without_link_is_dropped() {
        let result: JackettResult =
            serde_json::from_value(serde_json::json!({ "Title": "No links" })).unwrap();
        assert!(JackettAdapter::map_result(result, "all").is_none());
    }

    #[test]
    fn test_parse_jackett_date() {
        assert!(parse_jackett_date("2024-06-15T10:30:00Z").is_some());
        assert!(parse_jackett_date("2024-06-15T10:30:00+02:00").is_some());
        assert!(parse_jackett_date("2024-06-15T10:30:00").is_some());
        assert!(parse_jackett_date("invalid").is_none());
    }
}
