//! Embedded librqbit peer engine.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use librqbit::{
    AddTorrent, AddTorrentOptions, AddTorrentResponse, ManagedTorrent, Session, SessionOptions,
    SessionPersistenceConfig, TorrentStatsState,
};
use librqbit_core::magnet::Magnet;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{
    validate_uri, AddMode, AddOptions, EngineError, PeerEngine, SwarmFile, SwarmHandle,
    SwarmStats,
};
use crate::config::EngineConfig;

/// Outcome of the background add task.
#[derive(Clone)]
enum Resolution {
    Pending,
    Ready(Arc<ManagedTorrent>),
    Failed(EngineError),
}

/// librqbit session shared by every swarm the service manages.
pub struct LibrqbitEngine {
    session: Arc<Session>,
    metadata_timeout: Duration,
}

impl LibrqbitEngine {
    /// Start a session rooted at `default_path`.
    pub async fn new(config: &EngineConfig, default_path: &Path) -> Result<Self, EngineError> {
        std::fs::create_dir_all(default_path).map_err(|e| {
            EngineError::Initialization(format!("Failed to create download directory: {}", e))
        })?;

        let mut opts = SessionOptions::default();

        if !config.enable_dht {
            opts.disable_dht = true;
        }

        if let Some(port) = config.listen_port {
            opts.listen_port_range = Some(port..(port + 1));
        }

        if let Some(ref persistence_dir) = config.persistence_path {
            std::fs::create_dir_all(persistence_dir).map_err(|e| {
                EngineError::Initialization(format!(
                    "Failed to create persistence directory: {}",
                    e
                ))
            })?;
            opts.persistence = Some(SessionPersistenceConfig::Json {
                folder: Some(persistence_dir.clone()),
            });
        }

        info!(
            download_path = %default_path.display(),
            dht_enabled = !opts.disable_dht,
            "Initializing librqbit session"
        );

        let session = Session::new_with_opts(default_path.to_path_buf(), opts)
            .await
            .map_err(|e| {
                EngineError::Initialization(format!("Failed to start librqbit session: {}", e))
            })?;

        if let Some(port) = session.tcp_listen_port() {
            info!(port = port, "librqbit listening on TCP port");
        }

        Ok(Self {
            session,
            metadata_timeout: Duration::from_secs(config.metadata_timeout_secs as u64),
        })
    }
}

#[async_trait]
impl PeerEngine for LibrqbitEngine {
    fn name(&self) -> &str {
        "librqbit"
    }

    async fn add(
        &self,
        uri: &str,
        options: AddOptions,
    ) -> Result<Arc<dyn SwarmHandle>, EngineError> {
        validate_uri(uri)?;
        std::fs::create_dir_all(&options.path).map_err(|e| {
            EngineError::AddFailed(format!(
                "Failed to create {}: {}",
                options.path.display(),
                e
            ))
        })?;

        let add_opts = AddTorrentOptions {
            output_folder: Some(options.path.to_string_lossy().into_owned()),
            overwrite: true,
            paused: options.mode == AddMode::Inspect,
            ..Default::default()
        };

        let (resolution_tx, resolution_rx) = watch::channel(Resolution::Pending);
        let (shutdown_tx, _) = watch::channel(false);

        let session = Arc::clone(&self.session);
        let owned_uri = uri.trim().to_string();
        let timeout = self.metadata_timeout;
        let task = tokio::spawn(async move {
            let add = session.add_torrent(AddTorrent::from_url(owned_uri), Some(add_opts));
            let resolution = match tokio::time::timeout(timeout, add).await {
                Err(_) => Resolution::Failed(EngineError::MetadataTimeout(timeout.as_secs())),
                Ok(Err(e)) => Resolution::Failed(EngineError::AddFailed(e.to_string())),
                Ok(Ok(AddTorrentResponse::Added(_, handle))) => Resolution::Ready(handle),
                Ok(Ok(AddTorrentResponse::AlreadyManaged(_, handle))) => {
                    warn!(info_hash = %handle.info_hash().as_string(), "Torrent already managed");
                    Resolution::Ready(handle)
                }
                Ok(Ok(AddTorrentResponse::ListOnly(_))) => Resolution::Failed(
                    EngineError::AddFailed("Torrent was added in list-only mode".to_string()),
                ),
            };
            let _ = resolution_tx.send(resolution);
        });

        debug!(path = %options.path.display(), mode = ?options.mode, "Swarm add requested");

        Ok(Arc::new(LibrqbitSwarm {
            session: Arc::clone(&self.session),
            declared_hash: magnet_info_hash(uri),
            mode: options.mode,
            save_path: options.path,
            resolution: resolution_rx,
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
        }))
    }
}

/// One swarm inside the shared session.
struct LibrqbitSwarm {
    session: Arc<Session>,
    /// Hash parsed from the magnet link, known before metadata.
    declared_hash: Option<String>,
    mode: AddMode,
    save_path: PathBuf,
    resolution: watch::Receiver<Resolution>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LibrqbitSwarm {
    fn torrent(&self) -> Option<Arc<ManagedTorrent>> {
        match &*self.resolution.borrow() {
            Resolution::Ready(t) => Some(Arc::clone(t)),
            _ => None,
        }
    }

    /// Wait for the add task, or fail if the swarm is destroyed first.
    async fn resolved(&self) -> Result<Arc<ManagedTorrent>, EngineError> {
        let mut rx = self.resolution.clone();
        let waited = self
            .until_destroyed(async move {
                let outcome = match rx.wait_for(|r| !matches!(r, Resolution::Pending)).await {
                    Ok(r) => r.clone(),
                    Err(_) => Resolution::Failed(EngineError::Destroyed),
                };
                Ok(outcome)
            })
            .await?;

        match waited {
            Resolution::Ready(t) => Ok(t),
            Resolution::Failed(e) => Err(e),
            Resolution::Pending => Err(EngineError::Destroyed),
        }
    }

    /// Race `fut` against teardown of this swarm.
    async fn until_destroyed<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            result = fut => result,
            _ = shutdown.wait_for(|destroyed| *destroyed) => Err(EngineError::Destroyed),
        }
    }
}

#[async_trait]
impl SwarmHandle for LibrqbitSwarm {
    fn info_hash(&self) -> Option<String> {
        self.torrent()
            .map(|t| t.info_hash().as_string())
            .or_else(|| self.declared_hash.clone())
    }

    fn name(&self) -> Option<String> {
        self.torrent().and_then(|t| t.name().map(|s| s.to_string()))
    }

    fn save_path(&self) -> PathBuf {
        self.save_path.clone()
    }

    fn stats(&self) -> SwarmStats {
        let Some(torrent) = self.torrent() else {
            return SwarmStats::default();
        };
        let stats = torrent.stats();

        // `mbps` holds MiB/s.
        let (download_speed, upload_speed, peers) = stats
            .live
            .as_ref()
            .map(|live| {
                (
                    (live.download_speed.mbps * 1024.0 * 1024.0) as u64,
                    (live.upload_speed.mbps * 1024.0 * 1024.0) as u64,
                    live.snapshot.peer_stats.live as u32,
                )
            })
            .unwrap_or((0, 0, 0));

        SwarmStats {
            ready: matches!(
                stats.state,
                TorrentStatsState::Live | TorrentStatsState::Paused
            ),
            finished: stats.finished,
            total_bytes: stats.total_bytes,
            downloaded_bytes: stats.progress_bytes,
            uploaded_bytes: stats.uploaded_bytes,
            download_speed,
            upload_speed,
            peers,
            file_progress: stats.file_progress.clone(),
        }
    }

    fn files(&self) -> Vec<SwarmFile> {
        let Some(torrent) = self.torrent() else {
            return Vec::new();
        };
        torrent
            .with_metadata(|meta| {
                meta.file_infos
                    .iter()
                    .map(|fi| SwarmFile::from_relative(&fi.relative_filename, fi.len))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    }

    async fn wait_until_ready(&self) -> Result<(), EngineError> {
        let torrent = self.resolved().await?;
        // Inspection swarms are added paused and never initialize storage.
        if self.mode == AddMode::Inspect {
            return Ok(());
        }
        self.until_destroyed(async move {
            torrent
                .wait_until_initialized()
                .await
                .map_err(|e| EngineError::OperationFailed(e.to_string()))
        })
        .await
    }

    async fn wait_until_completed(&self) -> Result<(), EngineError> {
        let torrent = self.resolved().await?;
        self.until_destroyed(async move {
            torrent
                .wait_until_completed()
                .await
                .map_err(|e| EngineError::OperationFailed(e.to_string()))
        })
        .await
    }

    async fn deselect_all(&self) -> Result<(), EngineError> {
        let torrent = self.torrent().ok_or_else(|| {
            EngineError::OperationFailed("metadata not resolved yet".to_string())
        })?;
        self.session
            .update_only_files(&torrent, &HashSet::new())
            .await
            .map_err(|e| EngineError::OperationFailed(format!("Failed to deselect files: {}", e)))
    }

    async fn destroy(&self, destroy_store: bool) -> Result<(), EngineError> {
        if self.shutdown.send_replace(true) {
            return Ok(());
        }

        let pending_task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = pending_task {
            if !task.is_finished() {
                task.abort();
            }
        }

        if let Some(torrent) = self.torrent() {
            self.session
                .delete(torrent.id().into(), destroy_store)
                .await
                .map_err(|e| {
                    EngineError::OperationFailed(format!("Failed to remove torrent: {}", e))
                })?;
            debug!(
                info_hash = %torrent.info_hash().as_string(),
                destroy_store = destroy_store,
                "Swarm destroyed"
            );
        }

        Ok(())
    }
}

/// Info-hash encoded in a magnet link, as lowercase hex.
fn magnet_info_hash(uri: &str) -> Option<String> {
    Magnet::parse(uri.trim())
        .ok()
        .and_then(|m| m.as_id20())
        .map(|id| id.as_string())
}
