pub mod auth;
pub mod config;
pub mod download;
pub mod engine;
pub mod indexer;
pub mod metrics;
pub mod search;
pub mod swarm;
pub mod testing;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
};
pub use config::{
    config_path_from_env, load_config, load_config_from_str, validate_config, AuthMethod, Config,
    ConfigError, DownloadsConfig, EngineConfig, SanitizedConfig,
};
pub use download::{
    DownloadError, DownloadFilter, DownloadManager, DownloadStatus, DownloadStore, DownloadView,
    InspectResult, SqliteDownloadStore, StartDownloadRequest, TorrentDownload,
};
pub use engine::{EngineError, LibrqbitEngine, PeerEngine, SwarmHandle};
pub use indexer::{
    AdapterRegistry, BackendKind, IndexerAdapter, IndexerConfig, IndexerConfigError,
    IndexerConfigStore, MediaKind, SearchError, SqliteIndexerConfigStore, Torrent, TorrentIndexer,
};
pub use search::{SearchAggregator, SearchOutcome, SearchRequest};
pub use swarm::{extract_live_data, LiveData, SwarmRegistry};
