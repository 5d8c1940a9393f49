//! Peer engine boundary: the engine adds swarms, a handle controls one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the peer engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Failed to initialize engine: {0}")]
    Initialization(String),

    #[error("Invalid torrent URI: {0}")]
    InvalidUri(String),

    #[error("Failed to add torrent: {0}")]
    AddFailed(String),

    #[error("Timed out resolving torrent metadata after {0}s")]
    MetadataTimeout(u64),

    #[error("Swarm was destroyed")]
    Destroyed,

    #[error("Engine operation failed: {0}")]
    OperationFailed(String),
}

/// How an added swarm should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMode {
    /// Download selected data and keep seeding.
    Download,
    /// Resolve metadata only. No content is fetched.
    Inspect,
}

#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Directory the swarm stores data under.
    pub path: PathBuf,
    pub mode: AddMode,
}

impl AddOptions {
    pub fn download(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: AddMode::Download,
        }
    }

    pub fn inspect(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: AddMode::Inspect,
        }
    }
}

/// A file inside a torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmFile {
    /// Final path component.
    pub name: String,
    /// Path relative to the torrent root.
    pub path: String,
    pub length: u64,
}

impl SwarmFile {
    pub fn from_relative(path: &Path, length: u64) -> Self {
        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_string_lossy().into_owned(),
            length,
        }
    }
}

/// Point-in-time counters for one swarm. Speeds are bytes per second.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwarmStats {
    /// Metadata is resolved and the swarm is running.
    pub ready: bool,
    /// Every selected byte is on disk.
    pub finished: bool,
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub uploaded_bytes: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub peers: u32,
    /// Downloaded bytes per file, in file order.
    pub file_progress: Vec<u64>,
}

/// A live connection to one swarm.
///
/// Handles are returned before metadata is resolved. Until then `name`,
/// `files` and most stats are empty.
#[async_trait]
pub trait SwarmHandle: Send + Sync {
    /// Hex info-hash, when known.
    fn info_hash(&self) -> Option<String>;

    fn name(&self) -> Option<String>;

    /// Directory the swarm stores data under.
    fn save_path(&self) -> PathBuf;

    fn stats(&self) -> SwarmStats;

    fn files(&self) -> Vec<SwarmFile>;

    /// Resolve once metadata is known and the swarm is running.
    async fn wait_until_ready(&self) -> Result<(), EngineError>;

    /// Resolve once every selected byte is on disk.
    async fn wait_until_completed(&self) -> Result<(), EngineError>;

    /// Stop fetching any file.
    async fn deselect_all(&self) -> Result<(), EngineError>;

    /// Tear down all peer connections. With `destroy_store` the on-disk data
    /// is removed as well.
    async fn destroy(&self, destroy_store: bool) -> Result<(), EngineError>;
}

/// The BitTorrent engine the lifecycle manager drives.
#[async_trait]
pub trait PeerEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Start attaching to the swarm behind `uri` (magnet or `.torrent` URL).
    ///
    /// Returns as soon as the engine accepted the request. Metadata
    /// resolution continues in the background; see
    /// [`SwarmHandle::wait_until_ready`].
    async fn add(&self, uri: &str, options: AddOptions)
        -> Result<Arc<dyn SwarmHandle>, EngineError>;
}

/// Validate the URI scheme before handing it to an engine.
pub fn validate_uri(uri: &str) -> Result<(), EngineError> {
    let trimmed = uri.trim();
    if trimmed.starts_with("magnet:?")
        || trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
    {
        Ok(())
    } else {
        Err(EngineError::InvalidUri(format!(
            "expected a magnet or http(s) link, got '{}'",
            trimmed.chars().take(64).collect::<String>()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_uri() {
        assert!(validate_uri("magnet:?xt=urn:btih:abcdef").is_ok());
        assert!(validate_uri("https://tracker.example/file.torrent").is_ok());
        assert!(matches!(
            validate_uri("ftp://nope"),
            Err(EngineError::InvalidUri(_))
        ));
        assert!(validate_uri("").is_err());
    }

    #[test]
    fn test_swarm_file_from_relative() {
        let file = SwarmFile::from_relative(Path::new("Movie (2020)/movie.mkv"), 42);
        assert_eq!(file.name, "movie.mkv");
        assert_eq!(file.path, "Movie (2020)/movie.mkv");
        assert_eq!(file.length, 42);
    }

    #[test]
    fn test_add_options_modes() {
        assert_eq!(AddOptions::download("/d").mode, AddMode::Download);
        assert_eq!(AddOptions::inspect("/tmp/x").mode, AddMode::Inspect);
    }
}
