use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    /// Peer engine. Download endpoints are unavailable without it.
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// API keys accepted when `method = "api_key"`, each bound to a user.
    #[serde(default)]
    pub keys: Vec<ApiKeyEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// One accepted API key and the user it authenticates as.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("seedarr.db")
}

/// Search fan-out configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Timeout for a single indexer call, in seconds (default: 30)
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_timeout() -> u32 {
    30
}

/// Download lifecycle configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    /// Where downloaded content is stored
    #[serde(default = "default_download_path")]
    pub path: PathBuf,
    /// Scratch directory used while inspecting torrents
    #[serde(default = "default_inspect_path")]
    pub inspect_path: PathBuf,
    /// Hard bound on metadata resolution during inspection (default: 30)
    #[serde(default = "default_inspect_timeout")]
    pub inspect_timeout_secs: u32,
    /// Re-attach persisted downloads when the process starts
    #[serde(default = "default_true")]
    pub restore_on_startup: bool,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            path: default_download_path(),
            inspect_path: default_inspect_path(),
            inspect_timeout_secs: default_inspect_timeout(),
            restore_on_startup: true,
        }
    }
}

fn default_download_path() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_inspect_path() -> PathBuf {
    std::env::temp_dir().join("seedarr-inspect")
}

fn default_inspect_timeout() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// Peer engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: EngineBackend,
    /// Enable DHT for peer discovery (default: true)
    #[serde(default = "default_true")]
    pub enable_dht: bool,
    /// Fixed TCP listen port. Random when unset.
    #[serde(default)]
    pub listen_port: Option<u16>,
    /// How long to wait for magnet metadata before giving up (default: 60)
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u32,
    /// Directory for engine session state. Disabled when unset.
    #[serde(default)]
    pub persistence_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    #[default]
    Librqbit,
}

fn default_metadata_timeout() -> u32 {
    60
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub downloads: DownloadsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    /// Users that have a key configured. Keys themselves are never exposed.
    pub key_users: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                key_users: config
                    .auth
                    .keys
                    .iter()
                    .map(|k| k.user_id.clone())
                    .collect(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            search: config.search.clone(),
            downloads: config.downloads.clone(),
            engine: config.engine.clone(),
        }
    }
}
