//! Mock indexer adapter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::indexer::{
    AdapterQuery, BackendKind, IndexerAdapter, IndexerEndpoint, SearchError, Torrent,
    TorrentIndexer,
};
use crate::search::ALL_INDEXERS;

/// Mock implementation of the IndexerAdapter trait.
///
/// Results, failures and delays are configured per indexer id. A call
/// without an indexer id is keyed as [`ALL_INDEXERS`].
///
/// # Example
///
/// ```rust,ignore
/// let adapter = MockIndexerAdapter::new(BackendKind::Jackett)
///     .with_results("yts", vec![fixtures::torrent("Dune.2021.1080p", 40)])
///     .with_error("rarbg", "HTTP 500: boom")
///     .with_delay("slow", Duration::from_secs(30));
///
/// let calls = adapter.calls();
/// // ... run the aggregator ...
/// assert_eq!(calls.read().await.len(), 3);
/// ```
#[derive(Debug)]
pub struct MockIndexerAdapter {
    kind: BackendKind,
    indexers: Vec<TorrentIndexer>,
    results: HashMap<String, Vec<Torrent>>,
    errors: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: Arc<RwLock<Vec<AdapterQuery>>>,
    endpoints: Arc<RwLock<Vec<IndexerEndpoint>>>,
}

impl MockIndexerAdapter {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            indexers: Vec::new(),
            results: HashMap::new(),
            errors: HashMap::new(),
            delays: HashMap::new(),
            calls: Arc::new(RwLock::new(Vec::new())),
            endpoints: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Trackers returned by `list_indexers`.
    pub fn with_indexers(mut self, indexers: Vec<TorrentIndexer>) -> Self {
        self.indexers = indexers;
        self
    }

    pub fn with_results(mut self, indexer_id: &str, torrents: Vec<Torrent>) -> Self {
        self.results.insert(indexer_id.to_string(), torrents);
        self
    }

    /// Fail searches on `indexer_id` with an API error.
    pub fn with_error(mut self, indexer_id: &str, message: &str) -> Self {
        self.errors
            .insert(indexer_id.to_string(), message.to_string());
        self
    }

    /// Sleep before answering searches on `indexer_id`.
    pub fn with_delay(mut self, indexer_id: &str, delay: Duration) -> Self {
        self.delays.insert(indexer_id.to_string(), delay);
        self
    }

    /// Shared log of every search call, in call order.
    pub fn calls(&self) -> Arc<RwLock<Vec<AdapterQuery>>> {
        Arc::clone(&self.calls)
    }

    /// Shared log of the endpoints each call was given.
    pub fn endpoints(&self) -> Arc<RwLock<Vec<IndexerEndpoint>>> {
        Arc::clone(&self.endpoints)
    }
}

#[async_trait]
impl IndexerAdapter for MockIndexerAdapter {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn list_indexers(&self, endpoint: &IndexerEndpoint) -> Vec<TorrentIndexer> {
        self.endpoints.write().await.push(endpoint.clone());
        self.indexers.clone()
    }

    async fn search(
        &self,
        query: &AdapterQuery,
        endpoint: &IndexerEndpoint,
    ) -> Result<Vec<Torrent>, SearchError> {
        self.calls.write().await.push(query.clone());
        self.endpoints.write().await.push(endpoint.clone());

        let key = query.indexer_id.as_deref().unwrap_or(ALL_INDEXERS);

        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.errors.get(key) {
            return Err(SearchError::ApiError(message.clone()));
        }

        let mut torrents = self.results.get(key).cloned().unwrap_or_default();
        for torrent in &mut torrents {
            torrent.backend = self.kind;
        }
        Ok(torrents)
    }
}
