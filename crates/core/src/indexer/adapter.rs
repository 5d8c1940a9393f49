//! Adapter contract and the kind-keyed lookup table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::jackett::JackettAdapter;
use super::prowlarr::ProwlarrAdapter;
use super::types::{AdapterQuery, BackendKind, IndexerEndpoint, SearchError, Torrent, TorrentIndexer};

/// Translates normalized queries into one backend's HTTP API.
#[async_trait]
pub trait IndexerAdapter: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Trackers available under these credentials.
    ///
    /// Listing is advisory: transport errors, non-2xx answers and malformed
    /// bodies are logged and produce an empty list.
    async fn list_indexers(&self, endpoint: &IndexerEndpoint) -> Vec<TorrentIndexer>;

    /// Run one search call.
    async fn search(
        &self,
        query: &AdapterQuery,
        endpoint: &IndexerEndpoint,
    ) -> Result<Vec<Torrent>, SearchError>;
}

/// One adapter per backend kind.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<BackendKind, Arc<dyn IndexerAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the HTTP adapters for every supported backend.
    pub fn with_http_adapters(timeout: Duration) -> Result<Self, SearchError> {
        let mut registry = Self::new();
        registry.register(Arc::new(JackettAdapter::new(timeout)?));
        registry.register(Arc::new(ProwlarrAdapter::new(timeout)?));
        Ok(registry)
    }

    /// Install an adapter, replacing any previous one of the same kind.
    pub fn register(&mut self, adapter: Arc<dyn IndexerAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn IndexerAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

/// Map a reqwest transport error onto the search taxonomy.
pub(crate) fn classify_request_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else if e.is_connect() {
        SearchError::ConnectionFailed(e.to_string())
    } else {
        SearchError::ApiError(e.to_string())
    }
}

/// Turn a non-success response into an `ApiError` carrying a body excerpt.
pub(crate) async fn error_for_status(response: reqwest::Response) -> SearchError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    SearchError::ApiError(format!(
        "HTTP {}: {}",
        status,
        body.chars().take(200).collect::<String>()
    ))
}
