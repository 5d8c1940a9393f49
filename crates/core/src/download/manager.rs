//! Download lifecycle: queued -> downloading <-> paused -> completed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::store::{DownloadStore, NewDownload};
use super::types::{
    largest_video_file, DownloadError, DownloadFilter, DownloadStatus, DownloadView,
    InspectResult, StartDownloadRequest, TorrentDownload,
};
use crate::config::DownloadsConfig;
use crate::engine::{validate_uri, AddOptions, PeerEngine, SwarmHandle};
use crate::metrics;
use crate::swarm::{extract_live_data, LiveData, SwarmRegistry};

/// Keeps persisted download records and registered swarm handles in step.
///
/// Every operation on a download id runs under that id's registry lock.
/// Starts are additionally serialized per magnet URI.
pub struct DownloadManager {
    store: Arc<dyn DownloadStore>,
    engine: Arc<dyn PeerEngine>,
    registry: Arc<SwarmRegistry>,
    config: DownloadsConfig,
    inspect_timeout: Duration,
}

impl DownloadManager {
    pub fn new(
        store: Arc<dyn DownloadStore>,
        engine: Arc<dyn PeerEngine>,
        registry: Arc<SwarmRegistry>,
        config: DownloadsConfig,
    ) -> Self {
        let inspect_timeout = Duration::from_secs(config.inspect_timeout_secs as u64);
        Self {
            store,
            engine,
            registry,
            config,
            inspect_timeout,
        }
    }

    /// Override the inspection bound from config.
    pub fn with_inspect_timeout(mut self, timeout: Duration) -> Self {
        self.inspect_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<SwarmRegistry> {
        &self.registry
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Start acquiring `request.magnet_uri`, or return the existing record
    /// for that URI.
    ///
    /// An existing completed download without a live handle is re-attached
    /// for seeding.
    pub async fn start(
        &self,
        user_id: &str,
        request: StartDownloadRequest,
    ) -> Result<TorrentDownload, DownloadError> {
        let magnet_uri = request.magnet_uri.trim().to_string();
        validate_uri(&magnet_uri).map_err(|e| DownloadError::Validation(e.to_string()))?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(DownloadError::Validation("name is required".to_string()));
        }

        let _uri_guard = self.registry.lock(&uri_key(&magnet_uri)).await;

        if let Some(existing) = self.store.find_by_magnet(&magnet_uri)? {
            debug!(download_id = %existing.id, status = %existing.status, "Download already exists");
            if existing.status == DownloadStatus::Completed {
                let _guard = self.registry.lock(&existing.id).await;
                if !self.registry.contains(&existing.id).await {
                    match self.attach(&existing).await {
                        Ok(()) => info!(download_id = %existing.id, "Re-seeding completed download"),
                        Err(e) => {
                            warn!(download_id = %existing.id, error = %e, "Failed to re-seed completed download")
                        }
                    }
                }
            }
            return Ok(existing);
        }

        let created = self.store.create(NewDownload {
            user_id: user_id.to_string(),
            name: name.to_string(),
            magnet_uri: magnet_uri.clone(),
            media_id: request.media_id,
            origin: request.origin,
            quality: request.quality,
            language: request.language,
            save_path: self.config.path.display().to_string(),
        });
        let download = match created {
            Ok(download) => download,
            Err(DownloadError::AlreadyExists(_)) => {
                // Written by another process sharing the database.
                return self
                    .store
                    .find_by_magnet(&magnet_uri)?
                    .ok_or(DownloadError::AlreadyExists(magnet_uri));
            }
            Err(e) => return Err(e),
        };

        let _guard = self.registry.lock(&download.id).await;
        if let Err(e) = self.attach(&download).await {
            warn!(download_id = %download.id, error = %e, "Engine rejected download");
            if let Err(cleanup) = self.store.delete(&download.id) {
                warn!(download_id = %download.id, error = %cleanup, "Failed to remove rejected download");
            }
            return Err(e);
        }

        metrics::DOWNLOADS_STARTED.inc();
        info!(
            download_id = %download.id,
            user_id = %user_id,
            name = %download.name,
            "Download started"
        );
        Ok(download)
    }

    /// Snapshot telemetry, disconnect from the swarm keeping data on disk,
    /// and persist `paused`.
    pub async fn pause(&self, id: &str) -> Result<TorrentDownload, DownloadError> {
        let _guard = self.registry.lock(id).await;
        let download = self.require(id)?;

        let Some(handle) = self.registry.get(id).await else {
            return Err(DownloadError::InvalidState {
                id: id.to_string(),
                status: download.status,
                operation: "pause",
            });
        };

        let snapshot = extract_live_data(handle.as_ref()).frozen();
        handle.destroy(false).await?;
        self.registry.deregister(id).await;

        if download.info_hash.is_empty() && !snapshot.info_hash.is_empty() {
            self.store.update_info_hash(id, &snapshot.info_hash)?;
        }
        self.registry.set_snapshot(id, snapshot).await;

        let paused = set_status(self.store.as_ref(), &download, DownloadStatus::Paused)?;
        info!(download_id = %id, "Download paused");
        Ok(paused)
    }

    /// Reconnect a paused download. The handle is registered only once the
    /// engine reports it ready.
    ///
    /// On failure the download stays paused with its snapshot intact.
    pub async fn resume(&self, id: &str) -> Result<TorrentDownload, DownloadError> {
        let _guard = self.registry.lock(id).await;
        let download = self.require(id)?;

        if download.status != DownloadStatus::Paused {
            return Err(DownloadError::InvalidState {
                id: id.to_string(),
                status: download.status,
                operation: "resume",
            });
        }

        let snapshot = self.registry.take_snapshot(id).await;

        let handle = match self
            .engine
            .add(&download.magnet_uri, AddOptions::download(&download.save_path))
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                self.restore_snapshot(id, snapshot).await;
                return Err(e.into());
            }
        };

        if let Err(e) = handle.wait_until_ready().await {
            warn!(download_id = %id, error = %e, "Swarm failed to become ready on resume");
            if let Err(teardown) = handle.destroy(false).await {
                warn!(download_id = %id, error = %teardown, "Failed to tear down swarm");
            }
            self.restore_snapshot(id, snapshot).await;
            return Err(e.into());
        }

        let generation = self.registry.register(id, Arc::clone(&handle)).await;

        let persisted = set_status(self.store.as_ref(), &download, DownloadStatus::Downloading)
            .and_then(|resumed| {
                if resumed.info_hash.is_empty() {
                    if let Some(hash) = handle.info_hash() {
                        self.store.update_info_hash(id, &hash)?;
                    }
                }
                Ok(resumed)
            });
        let resumed = match persisted {
            Ok(resumed) => resumed,
            Err(e) => {
                self.registry.deregister(id).await;
                if let Err(teardown) = handle.destroy(false).await {
                    warn!(download_id = %id, error = %teardown, "Failed to tear down swarm");
                }
                self.restore_snapshot(id, snapshot).await;
                return Err(e);
            }
        };

        self.spawn_watcher(id, generation, handle).await;
        info!(download_id = %id, "Download resumed");
        Ok(resumed)
    }

    /// Disconnect any live swarm and remove the record.
    ///
    /// `delete_files` removes on-disk data, which is only reachable through a
    /// live handle.
    pub async fn delete(
        &self,
        id: &str,
        delete_files: bool,
    ) -> Result<TorrentDownload, DownloadError> {
        let guard = self.registry.lock(id).await;
        let download = self.require(id)?;

        if let Some(handle) = self.registry.deregister(id).await {
            if let Err(e) = handle.destroy(delete_files).await {
                warn!(download_id = %id, error = %e, "Failed to tear down swarm during delete");
            }
        }
        self.registry.clear_snapshot(id).await;
        self.store.delete(id)?;
        drop(guard);

        info!(download_id = %id, delete_files = delete_files, "Download deleted");
        Ok(download)
    }

    pub async fn get(&self, id: &str) -> Result<DownloadView, DownloadError> {
        let download = self.require(id)?;
        Ok(self.view(download).await)
    }

    pub async fn list(&self, filter: &DownloadFilter) -> Result<Vec<DownloadView>, DownloadError> {
        let downloads = self.store.list(filter)?;
        let mut views = Vec::with_capacity(downloads.len());
        for download in downloads {
            views.push(self.view(download).await);
        }
        Ok(views)
    }

    /// Resolve a torrent's metadata without downloading its content.
    ///
    /// Attaching and metadata resolution share one deadline. Whatever the
    /// outcome, the swarm is destroyed together with its scratch data before
    /// returning.
    pub async fn inspect(&self, uri: &str) -> Result<InspectResult, DownloadError> {
        let uri = uri.trim();
        validate_uri(uri).map_err(|e| DownloadError::Validation(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + self.inspect_timeout;
        let scratch = self
            .config
            .inspect_path
            .join(uuid::Uuid::new_v4().to_string());

        let handle =
            match tokio::time::timeout_at(deadline, self.engine.add(uri, AddOptions::inspect(&scratch)))
                .await
            {
                Ok(Ok(handle)) => handle,
                Ok(Err(e)) => {
                    metrics::INSPECTIONS.with_label_values(&["error"]).inc();
                    return Err(e.into());
                }
                Err(_) => {
                    metrics::INSPECTIONS.with_label_values(&["timeout"]).inc();
                    return Err(DownloadError::Timeout(self.inspect_timeout));
                }
            };

        match tokio::time::timeout_at(deadline, handle.wait_until_ready()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                discard(handle.as_ref(), &scratch).await;
                metrics::INSPECTIONS.with_label_values(&["error"]).inc();
                return Err(e.into());
            }
            Err(_) => {
                warn!(timeout = ?self.inspect_timeout, "Torrent inspection timed out");
                discard(handle.as_ref(), &scratch).await;
                metrics::INSPECTIONS.with_label_values(&["timeout"]).inc();
                return Err(DownloadError::Timeout(self.inspect_timeout));
            }
        }

        if let Err(e) = handle.deselect_all().await {
            warn!(error = %e, "Failed to deselect files during inspection");
        }

        let files = handle.files();
        let result = InspectResult {
            name: handle.name(),
            info_hash: handle.info_hash().unwrap_or_default(),
            total_size: files.iter().map(|f| f.length).sum(),
            primary_file: largest_video_file(&files).cloned(),
            files,
        };
        discard(handle.as_ref(), &scratch).await;

        metrics::INSPECTIONS.with_label_values(&["ok"]).inc();
        debug!(info_hash = %result.info_hash, files = result.files.len(), "Torrent inspected");
        Ok(result)
    }

    /// Re-attach persisted downloads after a restart. Paused downloads stay
    /// disconnected. Returns how many were attached.
    pub async fn reconcile_on_startup(&self) -> Result<usize, DownloadError> {
        let downloads = self.store.list(&DownloadFilter::default())?;
        let mut attached = 0;

        for download in downloads {
            if download.status == DownloadStatus::Paused {
                continue;
            }
            let _guard = self.registry.lock(&download.id).await;
            if self.registry.contains(&download.id).await {
                continue;
            }
            match self.attach(&download).await {
                Ok(()) => attached += 1,
                Err(e) => {
                    warn!(download_id = %download.id, status = %download.status, error = %e, "Failed to restore download")
                }
            }
        }

        info!(attached = attached, "Restored persisted downloads");
        Ok(attached)
    }

    async fn restore_snapshot(&self, id: &str, snapshot: Option<LiveData>) {
        if let Some(snapshot) = snapshot {
            self.registry.set_snapshot(id, snapshot).await;
        }
    }

    fn require(&self, id: &str) -> Result<TorrentDownload, DownloadError> {
        self.store
            .get(id)?
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))
    }

    /// Add the download to the engine and register the handle right away.
    /// Caller holds the id lock.
    async fn attach(&self, download: &TorrentDownload) -> Result<(), DownloadError> {
        let handle = self
            .engine
            .add(&download.magnet_uri, AddOptions::download(&download.save_path))
            .await?;
        let generation = self
            .registry
            .register(&download.id, Arc::clone(&handle))
            .await;
        self.spawn_watcher(&download.id, generation, handle).await;
        Ok(())
    }

    async fn spawn_watcher(&self, id: &str, generation: u64, handle: Arc<dyn SwarmHandle>) {
        let task = tokio::spawn(watch_swarm(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            id.to_string(),
            generation,
            handle,
        ));
        self.registry.set_watcher(id, generation, task).await;
    }

    async fn view(&self, download: TorrentDownload) -> DownloadView {
        let live = match self.registry.get(&download.id).await {
            Some(handle) if download.status != DownloadStatus::Paused => {
                Some(extract_live_data(handle.as_ref()))
            }
            _ => self.registry.snapshot(&download.id).await,
        };
        DownloadView { download, live }
    }
}

/// Follow one registration: record readiness, then completion.
///
/// Does nothing once `generation` is no longer the registered handle.
async fn watch_swarm(
    store: Arc<dyn DownloadStore>,
    registry: Arc<SwarmRegistry>,
    id: String,
    generation: u64,
    handle: Arc<dyn SwarmHandle>,
) {
    if let Err(e) = handle.wait_until_ready().await {
        warn!(download_id = %id, error = %e, "Swarm never became ready");
        return;
    }

    {
        let _guard = registry.lock(&id).await;
        if !registry.is_current(&id, generation).await {
            return;
        }
        if let Some(hash) = handle.info_hash() {
            if let Err(e) = store.update_info_hash(&id, &hash) {
                warn!(download_id = %id, error = %e, "Failed to record info hash");
            }
        }
        if let Err(e) = advance(store.as_ref(), &id, &[DownloadStatus::Queued], DownloadStatus::Downloading) {
            warn!(download_id = %id, error = %e, "Failed to mark download as downloading");
        }
    }

    if let Err(e) = handle.wait_until_completed().await {
        debug!(download_id = %id, error = %e, "Stopped waiting for completion");
        return;
    }

    let _guard = registry.lock(&id).await;
    if !registry.is_current(&id, generation).await {
        return;
    }
    if let Err(e) = advance(
        store.as_ref(),
        &id,
        &[DownloadStatus::Queued, DownloadStatus::Downloading],
        DownloadStatus::Completed,
    ) {
        warn!(download_id = %id, error = %e, "Failed to mark download as completed");
    }
}

/// Move `id` to `to` if its current status is one of `from`.
fn advance(
    store: &dyn DownloadStore,
    id: &str,
    from: &[DownloadStatus],
    to: DownloadStatus,
) -> Result<(), DownloadError> {
    let Some(download) = store.get(id)? else {
        return Ok(());
    };
    if from.contains(&download.status) {
        set_status(store, &download, to)?;
    }
    Ok(())
}

fn set_status(
    store: &dyn DownloadStore,
    download: &TorrentDownload,
    to: DownloadStatus,
) -> Result<TorrentDownload, DownloadError> {
    let updated = store.update_status(&download.id, to)?;
    metrics::DOWNLOAD_TRANSITIONS
        .with_label_values(&[download.status.as_str(), to.as_str()])
        .inc();
    info!(
        download_id = %download.id,
        from = %download.status,
        to = %to,
        "Download status changed"
    );
    Ok(updated)
}

/// Best-effort teardown of an inspection swarm and its scratch directory.
async fn discard(handle: &dyn SwarmHandle, scratch: &std::path::Path) {
    if let Err(e) = handle.destroy(true).await {
        warn!(error = %e, "Failed to tear down inspection swarm");
    }
    let _ = tokio::fs::remove_dir_all(scratch).await;
}

fn uri_key(magnet_uri: &str) -> String {
    format!("uri:{}", magnet_uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::SqliteDownloadStore;
    use crate::engine::{EngineError, SwarmFile};
    use crate::testing::MockPeerEngine;

    const MAGNET: &str = "magnet:?xt=urn:btih:c9e15763f722f23e98a29decdfae341b98d53056";

    struct Harness {
        manager: DownloadManager,
        engine: Arc<MockPeerEngine>,
        store: Arc<SqliteDownloadStore>,
    }

    fn harness(engine: MockPeerEngine) -> Harness {
        let engine = Arc::new(engine);
        let store = Arc::new(SqliteDownloadStore::in_memory().unwrap());
        let config = DownloadsConfig {
            path: "/data/downloads".into(),
            inspect_path: std::env::temp_dir().join("seedarr-manager-tests"),
            ..Default::default()
        };
        let manager = DownloadManager::new(
            store.clone(),
            engine.clone(),
            Arc::new(SwarmRegistry::new()),
            config,
        );
        Harness {
            manager,
            engine,
            store,
        }
    }

    fn request(magnet: &str) -> StartDownloadRequest {
        StartDownloadRequest {
            magnet_uri: magnet.to_string(),
            name: "Cosmos Laundromat".to_string(),
            ..Default::default()
        }
    }

    async fn wait_for_status(store: &SqliteDownloadStore, id: &str, status: DownloadStatus) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if store.get(id).unwrap().map(|d| d.status) == Some(status) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("download {} never reached {}", id, status));
    }

    #[tokio::test]
    async fn test_start_registers_and_becomes_downloading() {
        let h = harness(MockPeerEngine::new());

        let download = h.manager.start("alice", request(MAGNET)).await.unwrap();
        assert_eq!(download.status, DownloadStatus::Queued);
        assert!(h.manager.registry().contains(&download.id).await);

        wait_for_status(&h.store, &download.id, DownloadStatus::Downloading).await;
        let stored = h.store.get(&download.id).unwrap().unwrap();
        assert_eq!(stored.info_hash, "c9e15763f722f23e98a29decdfae341b98d53056");
    }

    #[tokio::test]
    async fn test_start_rejects_bad_input() {
        let h = harness(MockPeerEngine::new());

        let err = h
            .manager
            .start("alice", request("ftp://nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Validation(_)));

        let mut unnamed = request(MAGNET);
        unnamed.name = "  ".to_string();
        let err = h.manager.start("alice", unnamed).await.unwrap_err();
        assert!(matches!(err, DownloadError::Validation(_)));
        assert_eq!(h.engine.add_count().await, 0);
    }

    #[tokio::test]
    async fn test_engine_rejection_leaves_no_record() {
        let h = harness(MockPeerEngine::new());
        h.engine
            .fail_next_add(EngineError::AddFailed("boom".to_string()))
            .await;

        let err = h.manager.start("alice", request(MAGNET)).await.unwrap_err();
        assert!(matches!(err, DownloadError::Engine(EngineError::AddFailed(_))));
        assert!(h.store.list(&DownloadFilter::default()).unwrap().is_empty());
        assert_eq!(h.manager.registry().active_count().await, 0);
    }

    #[tokio::test]
    async fn test_pause_without_handle_reports_status() {
        let h = harness(MockPeerEngine::new());
        let download = h.manager.start("alice", request(MAGNET)).await.unwrap();
        h.manager.pause(&download.id).await.unwrap();

        let err = h.manager.pause(&download.id).await.unwrap_err();
        match err {
            DownloadError::InvalidState { status, .. } => assert_eq!(status, DownloadStatus::Paused),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found_and_leave_no_lock() {
        let h = harness(MockPeerEngine::new());
        assert!(matches!(
            h.manager.pause("missing").await,
            Err(DownloadError::NotFound(_))
        ));
        assert!(matches!(
            h.manager.resume("missing").await,
            Err(DownloadError::NotFound(_))
        ));
        assert!(matches!(
            h.manager.delete("missing", false).await,
            Err(DownloadError::NotFound(_))
        ));
        assert_eq!(h.manager.registry().locked_keys(), 0);
    }

    #[tokio::test]
    async fn test_delete_keeps_uri_lock_for_pending_start() {
        let h = harness(MockPeerEngine::new());
        let first = h.manager.start("alice", request(MAGNET)).await.unwrap();

        // Stands in for a start of the same URI that is mid-flight.
        let in_flight = h.manager.registry().lock(&uri_key(MAGNET)).await;
        h.manager.delete(&first.id, false).await.unwrap();

        let raced =
            tokio::time::timeout(Duration::from_millis(100), h.manager.start("bob", request(MAGNET)))
                .await;
        assert!(raced.is_err(), "start ran while the URI was locked");

        drop(in_flight);
        let second = h.manager.start("bob", request(MAGNET)).await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(h.store.list(&DownloadFilter::default()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pause_keeps_data_and_snapshots() {
        let h = harness(MockPeerEngine::new());
        let download = h.manager.start("alice", request(MAGNET)).await.unwrap();
        let handle = h.engine.last_added().await.unwrap();

        h.manager.pause(&download.id).await.unwrap();

        assert_eq!(handle.destroyed_with().await, Some(false));
        assert!(!h.manager.registry().contains(&download.id).await);
        let view = h.manager.get(&download.id).await.unwrap();
        assert_eq!(view.download.status, DownloadStatus::Paused);
        assert!(view.live.unwrap().paused);
    }

    #[tokio::test]
    async fn test_failed_resume_stays_paused() {
        let h = harness(MockPeerEngine::new());
        let download = h.manager.start("alice", request(MAGNET)).await.unwrap();
        h.manager.pause(&download.id).await.unwrap();

        h.engine
            .fail_next_ready(EngineError::MetadataTimeout(60))
            .await;
        let err = h.manager.resume(&download.id).await.unwrap_err();
        assert!(matches!(err, DownloadError::Engine(EngineError::MetadataTimeout(60))));

        let failed = h.engine.last_added().await.unwrap();
        assert_eq!(failed.destroyed_with().await, Some(false));
        assert!(!h.manager.registry().contains(&download.id).await);
        assert!(h.manager.registry().snapshot(&download.id).await.is_some());
        assert_eq!(
            h.store.get(&download.id).unwrap().unwrap().status,
            DownloadStatus::Paused
        );
    }

    #[tokio::test]
    async fn test_delete_with_files_destroys_store() {
        let h = harness(MockPeerEngine::new());
        let download = h.manager.start("alice", request(MAGNET)).await.unwrap();
        let handle = h.engine.last_added().await.unwrap();

        h.manager.delete(&download.id, true).await.unwrap();

        assert_eq!(handle.destroyed_with().await, Some(true));
        assert!(h.store.get(&download.id).unwrap().is_none());
        assert!(!h.manager.registry().contains(&download.id).await);
        assert!(matches!(
            h.manager.delete(&download.id, false).await,
            Err(DownloadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_completion_moves_to_completed() {
        let h = harness(MockPeerEngine::new());
        let download = h.manager.start("alice", request(MAGNET)).await.unwrap();
        wait_for_status(&h.store, &download.id, DownloadStatus::Downloading).await;

        h.engine.last_added().await.unwrap().mark_completed();

        wait_for_status(&h.store, &download.id, DownloadStatus::Completed).await;
        assert!(h.manager.registry().contains(&download.id).await);
    }

    #[tokio::test]
    async fn test_inspect_collects_files_and_tears_down() {
        let engine = MockPeerEngine::new().with_files(vec![
            SwarmFile {
                name: "movie.mkv".to_string(),
                path: "Cosmos/movie.mkv".to_string(),
                length: 700,
            },
            SwarmFile {
                name: "poster.jpg".to_string(),
                path: "Cosmos/poster.jpg".to_string(),
                length: 30,
            },
        ]);
        let h = harness(engine);

        let result = h.manager.inspect(MAGNET).await.unwrap();

        assert_eq!(result.total_size, 730);
        assert_eq!(result.files.len(), 2);
        assert_eq!(result.primary_file.unwrap().name, "movie.mkv");
        assert_eq!(result.info_hash, "c9e15763f722f23e98a29decdfae341b98d53056");

        let handle = h.engine.last_added().await.unwrap();
        assert!(handle.is_deselected());
        assert_eq!(handle.destroyed_with().await, Some(true));
        assert_eq!(h.manager.registry().active_count().await, 0);
    }

    #[tokio::test]
    async fn test_inspect_engine_error_tears_down() {
        let h = harness(MockPeerEngine::new());
        h.engine
            .fail_next_ready(EngineError::AddFailed("bad torrent".to_string()))
            .await;

        let err = h.manager.inspect(MAGNET).await.unwrap_err();
        assert!(matches!(err, DownloadError::Engine(EngineError::AddFailed(_))));
        assert_eq!(
            h.engine.last_added().await.unwrap().destroyed_with().await,
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_reconcile_skips_paused() {
        let h = harness(MockPeerEngine::new());
        let queued = h.manager.start("alice", request(MAGNET)).await.unwrap();
        let paused = h
            .manager
            .start("alice", request("magnet:?xt=urn:btih:0000000000000000000000000000000000000001"))
            .await
            .unwrap();
        h.manager.pause(&paused.id).await.unwrap();

        // Simulate a restart: same records, fresh registry.
        let manager = DownloadManager::new(
            h.store.clone(),
            h.engine.clone(),
            Arc::new(SwarmRegistry::new()),
            DownloadsConfig::default(),
        );
        let attached = manager.reconcile_on_startup().await.unwrap();

        assert_eq!(attached, 1);
        assert!(manager.registry().contains(&queued.id).await);
        assert!(!manager.registry().contains(&paused.id).await);
    }
}
