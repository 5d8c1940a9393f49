//! Types shared by indexer adapters, the config store and the aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Third-party search service a user can configure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Jackett,
    Prowlarr,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Jackett, BackendKind::Prowlarr];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Jackett => "jackett",
            BackendKind::Prowlarr => "prowlarr",
        }
    }

    /// Base URL used when a config leaves `base_url` empty.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            BackendKind::Jackett => "http://localhost:9117",
            BackendKind::Prowlarr => "http://localhost:9696",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jackett" => Ok(BackendKind::Jackett),
            "prowlarr" => Ok(BackendKind::Prowlarr),
            other => Err(format!("unknown backend kind: {}", other)),
        }
    }
}

/// What the user is looking for. Drives the backend category filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }

    /// Newznab category id understood by both Jackett and Prowlarr.
    pub fn category_id(&self) -> u32 {
        match self {
            MediaKind::Movie => 2000,
            MediaKind::Tv => 5000,
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "tv" | "show" | "series" => Ok(MediaKind::Tv),
            other => Err(format!("unknown media type: {}", other)),
        }
    }
}

/// Resolution tier inferred from a release title.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Quality {
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "HD")]
    Hd,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
    #[serde(rename = "unknown")]
    Unknown,
}

/// A tracker/indexer exposed by a backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TorrentIndexer {
    pub id: String,
    pub name: String,
    /// `public`, `semi-private` or `private`, as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
}

/// A normalized search result. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Torrent {
    pub title: String,
    /// Name of the tracker that listed it.
    pub tracker: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    pub seeders: u32,
    pub peers: u32,
    /// Magnet URI or `.torrent` download link.
    pub link: String,
    pub guid: String,
    pub quality: Quality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
    pub backend: BackendKind,
}

/// A single adapter call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_kind: Option<MediaKind>,
    /// Restrict to one backend-native indexer. All indexers when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_id: Option<String>,
}

/// Where and how to reach a backend.
#[derive(Debug, Clone)]
pub struct IndexerEndpoint {
    pub base_url: String,
    pub api_key: String,
}

/// Per-user backend credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub id: String,
    pub user_id: String,
    pub kind: BackendKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    pub selected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexerConfig {
    /// Resolve the endpoint for this config.
    ///
    /// Fails when no API key is set. An empty base URL falls back to the
    /// backend's conventional local address.
    pub fn endpoint(&self) -> Result<IndexerEndpoint, SearchError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                SearchError::NotConfigured(format!(
                    "No API key is configured for the {} indexer",
                    self.kind
                ))
            })?;

        let base_url = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.kind.default_base_url());

        Ok(IndexerEndpoint {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// Create-or-replace payload, keyed by (user, kind).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertIndexerConfig {
    pub kind: BackendKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIndexerConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Config as returned over the API: the key itself is never echoed.
#[derive(Debug, Clone, Serialize)]
pub struct IndexerConfigView {
    pub id: String,
    pub kind: BackendKind,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub selected: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&IndexerConfig> for IndexerConfigView {
    fn from(config: &IndexerConfig) -> Self {
        Self {
            id: config.id.clone(),
            kind: config.kind,
            api_key_configured: config
                .api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty()),
            base_url: config.base_url.clone(),
            selected: config.selected,
            updated_at: config.updated_at,
        }
    }
}

/// Errors from the indexer config store.
#[derive(Debug, Error)]
pub enum IndexerConfigError {
    #[error("Indexer config not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("All indexers failed: {}", format_indexer_errors(.0))]
    AllIndexersFailed(HashMap<String, String>),

    #[error("Indexer config error: {0}")]
    Store(#[from] IndexerConfigError),
}

fn format_indexer_errors(errors: &HashMap<String, String>) -> String {
    let mut parts: Vec<_> = errors
        .iter()
        .map(|(indexer, e)| format!("{}: {}", indexer, e))
        .collect();
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>, base_url: Option<&str>) -> IndexerConfig {
        IndexerConfig {
            id: "cfg-1".to_string(),
            user_id: "alice".to_string(),
            kind: BackendKind::Prowlarr,
            api_key: api_key.map(String::from),
            base_url: base_url.map(String::from),
            selected: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_backend_kind_parse_and_display() {
        assert_eq!("Jackett".parse::<BackendKind>().unwrap(), BackendKind::Jackett);
        assert_eq!("prowlarr".parse::<BackendKind>().unwrap(), BackendKind::Prowlarr);
        assert!("sonarr".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Prowlarr.to_string(), "prowlarr");
    }

    #[test]
    fn test_quality_serializes_to_tags() {
        let tags: Vec<String> = [
            Quality::Sd,
            Quality::Hd,
            Quality::TwoK,
            Quality::FourK,
            Quality::Unknown,
        ]
        .iter()
        .map(|q| serde_json::to_value(q).unwrap().as_str().unwrap().to_string())
        .collect();
        assert_eq!(tags, vec!["SD", "HD", "2K", "4K", "unknown"]);
    }

    #[test]
    fn test_media_kind_categories() {
        assert_eq!(MediaKind::Movie.category_id(), 2000);
        assert_eq!(MediaKind::Tv.category_id(), 5000);
        assert_eq!("series".parse::<MediaKind>().unwrap(), MediaKind::Tv);
    }

    #[test]
    fn test_endpoint_requires_api_key() {
        let err = config(None, None).endpoint().unwrap_err();
        assert!(matches!(err, SearchError::NotConfigured(_)));

        let err = config(Some("  "), None).endpoint().unwrap_err();
        assert!(matches!(err, SearchError::NotConfigured(_)));
    }

    #[test]
    fn test_endpoint_falls_back_to_default_base_url() {
        let endpoint = config(Some("key"), None).endpoint().unwrap();
        assert_eq!(endpoint.base_url, "http://localhost:9696");

        let endpoint = config(Some("key"), Some("http://indexer.lan:9696"))
            .endpoint()
            .unwrap();
        assert_eq!(endpoint.base_url, "http://indexer.lan:9696");
        assert_eq!(endpoint.api_key, "key");
    }

    #[test]
    fn test_view_hides_api_key() {
        let view = IndexerConfigView::from(&config(Some("secret"), None));
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"api_key_configured\":true"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_all_indexers_failed_message_is_sorted() {
        let err = SearchError::AllIndexersFailed(HashMap::from([
            ("b".to_string(), "HTTP 500".to_string()),
            ("a".to_string(), "Request timed out".to_string()),
        ]));
        assert_eq!(
            err.to_string(),
            "All indexers failed: a: Request timed out; b: HTTP 500"
        );
    }
}
