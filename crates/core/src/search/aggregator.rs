//! Multi-indexer search fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::indexer::{
    AdapterQuery, AdapterRegistry, BackendKind, IndexerAdapter, IndexerConfigStore,
    IndexerEndpoint, MediaKind, SearchError, Torrent, TorrentIndexer,
};
use crate::metrics;

use super::sanitize::sanitize_query;

/// Label used in `indexer_errors` for a call that spans every indexer.
pub const ALL_INDEXERS: &str = "all";

/// A logical search as requested by a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_kind: Option<MediaKind>,
    /// Release year. Titles containing it are recommended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// Use this backend instead of the user's selected one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    /// Backend-native indexer ids to query. Every indexer when empty.
    #[serde(default)]
    pub indexer_ids: Vec<String>,
}

/// Merged, ranked results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub recommended: Vec<Torrent>,
    pub others: Vec<Torrent>,
    /// Indexer id -> error, for calls that failed or timed out.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub indexer_errors: HashMap<String, String>,
    pub duration_ms: u64,
}

/// Resolves a user's backend and fans queries out to its adapter.
pub struct SearchAggregator {
    store: Arc<dyn IndexerConfigStore>,
    adapters: AdapterRegistry,
    call_timeout: Duration,
}

impl SearchAggregator {
    pub fn new(
        store: Arc<dyn IndexerConfigStore>,
        adapters: AdapterRegistry,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            adapters,
            call_timeout,
        }
    }

    /// Trackers available under the user's selected backend.
    pub async fn list_indexers(&self, user_id: &str) -> Result<Vec<TorrentIndexer>, SearchError> {
        let (adapter, endpoint) = self.resolve(user_id, None)?;
        Ok(adapter.list_indexers(&endpoint).await)
    }

    pub async fn search_torrents(
        &self,
        user_id: &str,
        request: &SearchRequest,
    ) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let (adapter, endpoint) = self.resolve(user_id, request.backend)?;
        let backend = adapter.kind();

        let query = sanitize_query(&request.query);
        if query.is_empty() {
            return Err(SearchError::InvalidQuery(
                "query is empty after removing unsupported characters".to_string(),
            ));
        }

        let targets: Vec<Option<String>> = if request.indexer_ids.is_empty() {
            vec![None]
        } else {
            let mut seen = HashSet::new();
            request
                .indexer_ids
                .iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .map(Some)
                .collect()
        };

        debug!(
            backend = %backend,
            query = %query,
            calls = targets.len(),
            "Starting parallel search"
        );

        let calls: Vec<_> = targets
            .into_iter()
            .map(|indexer_id| {
                let adapter = Arc::clone(&adapter);
                let endpoint = endpoint.clone();
                let adapter_query = AdapterQuery {
                    query: query.clone(),
                    media_kind: request.media_kind,
                    indexer_id,
                };
                async move {
                    let label = adapter_query
                        .indexer_id
                        .clone()
                        .unwrap_or_else(|| ALL_INDEXERS.to_string());
                    let result = self.call(adapter.as_ref(), &adapter_query, &endpoint).await;
                    (label, result)
                }
            })
            .collect();

        let results = futures::future::join_all(calls).await;
        let call_count = results.len();

        let mut merged: Vec<Torrent> = Vec::new();
        let mut indexer_errors: HashMap<String, String> = HashMap::new();
        let mut failed_calls = 0;

        for (indexer, result) in results {
            match result {
                Ok(mut torrents) => merged.append(&mut torrents),
                Err(e) => {
                    failed_calls += 1;
                    warn!(backend = %backend, indexer = %indexer, error = %e, "Indexer search failed");
                    metrics::INDEXER_FAILURES
                        .with_label_values(&[backend.as_str()])
                        .inc();
                    indexer_errors.insert(indexer, e.to_string());
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        if failed_calls == call_count {
            metrics::SEARCHES
                .with_label_values(&[backend.as_str(), "failed"])
                .inc();
            return Err(SearchError::AllIndexersFailed(indexer_errors));
        }

        sort_by_seeders(&mut merged);
        let (recommended, others) = partition_by_year(merged, request.year.as_deref());

        metrics::SEARCHES
            .with_label_values(&[backend.as_str(), "ok"])
            .inc();
        metrics::SEARCH_DURATION
            .with_label_values(&[backend.as_str()])
            .observe(duration_ms as f64 / 1000.0);

        info!(
            backend = %backend,
            recommended = recommended.len(),
            others = others.len(),
            failed_indexers = indexer_errors.len(),
            duration_ms = duration_ms,
            "Search complete"
        );

        Ok(SearchOutcome {
            recommended,
            others,
            indexer_errors,
            duration_ms,
        })
    }

    /// One adapter call, with a timeout counted as a failure of that indexer.
    async fn call(
        &self,
        adapter: &dyn IndexerAdapter,
        query: &AdapterQuery,
        endpoint: &IndexerEndpoint,
    ) -> Result<Vec<Torrent>, SearchError> {
        match tokio::time::timeout(self.call_timeout, adapter.search(query, endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout),
        }
    }

    /// The explicitly requested backend, or else the user's selected one.
    fn resolve(
        &self,
        user_id: &str,
        backend: Option<BackendKind>,
    ) -> Result<(Arc<dyn IndexerAdapter>, IndexerEndpoint), SearchError> {
        let config = match backend {
            Some(kind) => self.store.get_by_kind(user_id, kind)?.ok_or_else(|| {
                SearchError::NotConfigured(format!(
                    "The {} indexer is not configured for this user",
                    kind
                ))
            })?,
            None => self.store.get_selected(user_id)?.ok_or_else(|| {
                SearchError::NotConfigured("No indexer is configured for this user".to_string())
            })?,
        };

        let endpoint = config.endpoint()?;
        let adapter = self.adapters.get(config.kind).ok_or_else(|| {
            SearchError::NotConfigured(format!("No adapter available for {}", config.kind))
        })?;

        Ok((adapter, endpoint))
    }
}

/// Descending by seeders. Stable, so ties keep backend order.
pub fn sort_by_seeders(torrents: &mut [Torrent]) {
    torrents.sort_by(|a, b| b.seeders.cmp(&a.seeders));
}

/// Split into (titles containing `year`, the rest). Without a year everything
/// is recommended.
pub fn partition_by_year(torrents: Vec<Torrent>, year: Option<&str>) -> (Vec<Torrent>, Vec<Torrent>) {
    match year.map(str::trim).filter(|y| !y.is_empty()) {
        Some(year) => torrents.into_iter().partition(|t| t.title.contains(year)),
        None => (torrents, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{
        BackendKind, IndexerConfigStore, SqliteIndexerConfigStore, UpsertIndexerConfig,
    };
    use crate::testing::{fixtures, MockIndexerAdapter};

    fn titles(torrents: &[Torrent]) -> Vec<&str> {
        torrents.iter().map(|t| t.title.as_str()).collect()
    }

    fn aggregator_with(adapter: MockIndexerAdapter, timeout: Duration) -> SearchAggregator {
        let store = Arc::new(SqliteIndexerConfigStore::in_memory().unwrap());
        store
            .upsert(
                "alice",
                UpsertIndexerConfig {
                    kind: adapter.kind(),
                    api_key: Some("key".to_string()),
                    base_url: None,
                },
            )
            .unwrap();
        let mut adapters = AdapterRegistry::new();
        adapters.register(Arc::new(adapter));
        SearchAggregator::new(store, adapters, timeout)
    }

    #[test]
    fn test_sort_by_seeders_descending() {
        let mut torrents = vec![
            fixtures::torrent("a", 3),
            fixtures::torrent("b", 10),
            fixtures::torrent("c", 1),
        ];
        sort_by_seeders(&mut torrents);
        let seeders: Vec<u32> = torrents.iter().map(|t| t.seeders).collect();
        assert_eq!(seeders, vec![10, 3, 1]);
    }

    #[test]
    fn test_partition_by_year() {
        let torrents = vec![
            fixtures::torrent("Movie.2020.1080p", 5),
            fixtures::torrent("Movie.2019.1080p", 7),
        ];
        let (recommended, others) = partition_by_year(torrents, Some("2020"));
        assert_eq!(titles(&recommended), vec!["Movie.2020.1080p"]);
        assert_eq!(titles(&others), vec!["Movie.2019.1080p"]);
    }

    #[test]
    fn test_partition_without_year_recommends_everything() {
        let torrents = vec![fixtures::torrent("a", 1), fixtures::torrent("b", 2)];
        let (recommended, others) = partition_by_year(torrents, None);
        assert_eq!(recommended.len(), 2);
        assert!(others.is_empty());
    }

    #[tokio::test]
    async fn test_search_sanitizes_before_calling_adapter() {
        let adapter = MockIndexerAdapter::new(BackendKind::Jackett);
        let calls = adapter.calls();
        let aggregator = aggregator_with(adapter, Duration::from_secs(5));

        let request = SearchRequest {
            query: "  Alien: Romulus  ".to_string(),
            ..Default::default()
        };
        aggregator.search_torrents("alice", &request).await.unwrap();

        let recorded = calls.read().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].query, "Alien Romulus");
        assert!(recorded[0].indexer_id.is_none());
    }

    #[tokio::test]
    async fn test_repeated_indexer_ids_searched_once() {
        let adapter =
            MockIndexerAdapter::new(BackendKind::Jackett).with_error("yts", "HTTP 500: down");
        let calls = adapter.calls();
        let aggregator = aggregator_with(adapter, Duration::from_secs(5));

        let request = SearchRequest {
            query: "dune".to_string(),
            indexer_ids: vec!["yts".to_string(), "yts".to_string()],
            ..Default::default()
        };
        let result = aggregator.search_torrents("alice", &request).await;

        match result {
            Err(SearchError::AllIndexersFailed(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors["yts"].contains("HTTP 500"));
            }
            other => panic!("expected all indexers failed, got {other:?}"),
        }
        assert_eq!(calls.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let aggregator =
            aggregator_with(MockIndexerAdapter::new(BackendKind::Jackett), Duration::from_secs(5));
        let request = SearchRequest {
            query: " ?? ".to_string(),
            ..Default::default()
        };
        let result = aggregator.search_torrents("alice", &request).await;
        assert!(matches!(result, Err(SearchError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_search_without_config_is_configuration_error() {
        let aggregator =
            aggregator_with(MockIndexerAdapter::new(BackendKind::Jackett), Duration::from_secs(5));
        let request = SearchRequest {
            query: "dune".to_string(),
            ..Default::default()
        };
        let err = aggregator.search_torrents("bob", &request).await.unwrap_err();
        assert!(matches!(err, SearchError::NotConfigured(_)));
        assert_eq!(err.to_string(), "No indexer is configured for this user");
    }

    #[tokio::test]
    async fn test_slow_indexer_times_out_without_blocking_others() {
        let adapter = MockIndexerAdapter::new(BackendKind::Jackett)
            .with_results("fast", vec![fixtures::torrent("Fast.Result", 4)])
            .with_delay("slow", Duration::from_secs(30));
        let aggregator = aggregator_with(adapter, Duration::from_millis(100));

        let request = SearchRequest {
            query: "anything".to_string(),
            indexer_ids: vec!["fast".to_string(), "slow".to_string()],
            ..Default::default()
        };
        let outcome = aggregator.search_torrents("alice", &request).await.unwrap();

        assert_eq!(titles(&outcome.recommended), vec!["Fast.Result"]);
        assert_eq!(
            outcome.indexer_errors.get("slow").map(String::as_str),
            Some("Request timed out")
        );
    }
}
