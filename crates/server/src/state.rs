use std::sync::Arc;

use seedarr_core::{
    Authenticator, Config, DownloadManager, DownloadStore, IndexerConfigStore, SanitizedConfig,
    SearchAggregator,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    indexer_configs: Arc<dyn IndexerConfigStore>,
    search: Arc<SearchAggregator>,
    download_store: Arc<dyn DownloadStore>,
    downloads: Option<Arc<DownloadManager>>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        indexer_configs: Arc<dyn IndexerConfigStore>,
        search: Arc<SearchAggregator>,
        download_store: Arc<dyn DownloadStore>,
        downloads: Option<Arc<DownloadManager>>,
    ) -> Self {
        Self {
            config,
            authenticator,
            indexer_configs,
            search,
            download_store,
            downloads,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn indexer_configs(&self) -> &Arc<dyn IndexerConfigStore> {
        &self.indexer_configs
    }

    pub fn search(&self) -> &SearchAggregator {
        &self.search
    }

    pub fn download_store(&self) -> &Arc<dyn DownloadStore> {
        &self.download_store
    }

    /// The lifecycle manager. `None` when no peer engine is configured.
    pub fn downloads(&self) -> Option<&Arc<DownloadManager>> {
        self.downloads.as_ref()
    }
}
