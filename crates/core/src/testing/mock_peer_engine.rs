//! Mock peer engine and swarm handle for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::engine::{
    validate_uri, AddMode, AddOptions, EngineError, PeerEngine, SwarmFile, SwarmHandle, SwarmStats,
};

#[derive(Debug, Clone)]
enum Phase {
    Pending,
    Ready,
    Completed,
    Failed(EngineError),
    Destroyed,
}

/// Mock implementation of the SwarmHandle trait.
///
/// Readiness and completion are driven by the test through
/// [`mark_ready`](Self::mark_ready), [`mark_completed`](Self::mark_completed)
/// and [`fail`](Self::fail). Destroying the handle wakes every waiter with
/// [`EngineError::Destroyed`].
#[derive(Debug)]
pub struct MockSwarmHandle {
    uri: String,
    save_path: PathBuf,
    mode: AddMode,
    info_hash: Option<String>,
    name: Option<String>,
    files: Vec<SwarmFile>,
    phase: watch::Sender<Phase>,
    stats: std::sync::RwLock<SwarmStats>,
    /// `destroy_store` of the first destroy call.
    destroyed: RwLock<Option<bool>>,
    deselected: AtomicBool,
}

impl MockSwarmHandle {
    /// A pending handle. The info-hash and name are taken from the magnet
    /// link when present.
    pub fn new(uri: impl Into<String>, save_path: impl Into<PathBuf>) -> Self {
        let uri = uri.into();
        let (phase, _) = watch::channel(Phase::Pending);
        Self {
            info_hash: magnet_param(&uri, "xt").and_then(|xt| {
                xt.strip_prefix("urn:btih:")
                    .map(|hash| hash.to_ascii_lowercase())
            }),
            name: magnet_param(&uri, "dn"),
            uri,
            save_path: save_path.into(),
            mode: AddMode::Download,
            files: Vec::new(),
            phase,
            stats: std::sync::RwLock::new(SwarmStats::default()),
            destroyed: RwLock::new(None),
            deselected: AtomicBool::new(false),
        }
    }

    pub fn with_info_hash(mut self, info_hash: impl Into<String>) -> Self {
        self.info_hash = Some(info_hash.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_files(mut self, files: Vec<SwarmFile>) -> Self {
        self.files = files;
        self
    }

    fn with_mode(mut self, mode: AddMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mode(&self) -> AddMode {
        self.mode
    }

    /// Resolve readiness waiters.
    pub fn mark_ready(&self) {
        self.transition(Phase::Ready);
        if let Ok(mut stats) = self.stats.write() {
            stats.ready = true;
        }
    }

    /// Resolve readiness and completion waiters.
    pub fn mark_completed(&self) {
        self.transition(Phase::Completed);
        if let Ok(mut stats) = self.stats.write() {
            stats.ready = true;
            stats.finished = true;
            stats.downloaded_bytes = stats.total_bytes;
        }
    }

    /// Fail every waiter with `error`.
    pub fn fail(&self, error: EngineError) {
        self.transition(Phase::Failed(error));
    }

    pub fn set_stats(&self, stats: SwarmStats) {
        if let Ok(mut current) = self.stats.write() {
            *current = stats;
        }
    }

    /// `Some(destroy_store)` once the handle was destroyed.
    pub async fn destroyed_with(&self) -> Option<bool> {
        *self.destroyed.read().await
    }

    pub fn is_deselected(&self) -> bool {
        self.deselected.load(Ordering::SeqCst)
    }

    /// Destroyed handles stay destroyed.
    fn transition(&self, next: Phase) {
        self.phase.send_if_modified(|phase| {
            if matches!(phase, Phase::Destroyed) {
                return false;
            }
            *phase = next;
            true
        });
    }

    async fn wait_for_phase(&self, done: fn(&Phase) -> bool) -> Phase {
        let mut rx = self.phase.subscribe();
        let phase = match rx.wait_for(|p| done(p)).await {
            Ok(phase) => phase.clone(),
            Err(_) => Phase::Destroyed,
        };
        phase
    }
}

#[async_trait]
impl SwarmHandle for MockSwarmHandle {
    fn info_hash(&self) -> Option<String> {
        self.info_hash.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn save_path(&self) -> PathBuf {
        self.save_path.clone()
    }

    fn stats(&self) -> SwarmStats {
        self.stats
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    fn files(&self) -> Vec<SwarmFile> {
        self.files.clone()
    }

    async fn wait_until_ready(&self) -> Result<(), EngineError> {
        match self
            .wait_for_phase(|p| !matches!(p, Phase::Pending))
            .await
        {
            Phase::Ready | Phase::Completed => Ok(()),
            Phase::Failed(e) => Err(e),
            Phase::Pending | Phase::Destroyed => Err(EngineError::Destroyed),
        }
    }

    async fn wait_until_completed(&self) -> Result<(), EngineError> {
        match self
            .wait_for_phase(|p| {
                matches!(p, Phase::Completed | Phase::Failed(_) | Phase::Destroyed)
            })
            .await
        {
            Phase::Completed => Ok(()),
            Phase::Failed(e) => Err(e),
            _ => Err(EngineError::Destroyed),
        }
    }

    async fn deselect_all(&self) -> Result<(), EngineError> {
        self.deselected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self, destroy_store: bool) -> Result<(), EngineError> {
        {
            let mut destroyed = self.destroyed.write().await;
            if destroyed.is_none() {
                *destroyed = Some(destroy_store);
            }
        }
        self.phase.send_replace(Phase::Destroyed);
        Ok(())
    }
}

/// Mock implementation of the PeerEngine trait.
///
/// Every added handle is recorded. By default handles become ready as soon as
/// they are added.
///
/// # Example
///
/// ```rust,ignore
/// let engine = MockPeerEngine::new().never_ready();
/// let handle = engine.add("magnet:?xt=urn:btih:abc", AddOptions::download("/d")).await?;
///
/// let added = engine.last_added().await.unwrap();
/// added.mark_ready();
/// handle.wait_until_ready().await?;
/// ```
#[derive(Debug)]
pub struct MockPeerEngine {
    auto_ready: bool,
    files: Vec<SwarmFile>,
    added: Arc<RwLock<Vec<Arc<MockSwarmHandle>>>>,
    next_add_error: Arc<RwLock<Option<EngineError>>>,
    next_ready_error: Arc<RwLock<Option<EngineError>>>,
}

impl Default for MockPeerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPeerEngine {
    pub fn new() -> Self {
        Self {
            auto_ready: true,
            files: Vec::new(),
            added: Arc::new(RwLock::new(Vec::new())),
            next_add_error: Arc::new(RwLock::new(None)),
            next_ready_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Handles stay pending until the test marks them ready.
    pub fn never_ready(mut self) -> Self {
        self.auto_ready = false;
        self
    }

    /// Files reported by every added handle.
    pub fn with_files(mut self, files: Vec<SwarmFile>) -> Self {
        self.files = files;
        self
    }

    /// Make the next `add` call fail.
    pub async fn fail_next_add(&self, error: EngineError) {
        *self.next_add_error.write().await = Some(error);
    }

    /// Make the next added handle fail to become ready.
    pub async fn fail_next_ready(&self, error: EngineError) {
        *self.next_ready_error.write().await = Some(error);
    }

    pub async fn added(&self) -> Vec<Arc<MockSwarmHandle>> {
        self.added.read().await.clone()
    }

    pub async fn last_added(&self) -> Option<Arc<MockSwarmHandle>> {
        self.added.read().await.last().cloned()
    }

    pub async fn add_count(&self) -> usize {
        self.added.read().await.len()
    }
}

#[async_trait]
impl PeerEngine for MockPeerEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add(
        &self,
        uri: &str,
        options: AddOptions,
    ) -> Result<Arc<dyn SwarmHandle>, EngineError> {
        validate_uri(uri)?;
        if let Some(error) = self.next_add_error.write().await.take() {
            return Err(error);
        }

        let handle = Arc::new(
            MockSwarmHandle::new(uri.trim(), options.path)
                .with_files(self.files.clone())
                .with_mode(options.mode),
        );

        if let Some(error) = self.next_ready_error.write().await.take() {
            handle.fail(error);
        } else if self.auto_ready {
            handle.mark_ready();
        }

        self.added.write().await.push(Arc::clone(&handle));
        Ok(handle as Arc<dyn SwarmHandle>)
    }
}

/// Value of a query parameter in a magnet link.
fn magnet_param(uri: &str, key: &str) -> Option<String> {
    let query = uri.strip_prefix("magnet:?")?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k != key {
            return None;
        }
        urlencoding::decode(&v.replace('+', " "))
            .ok()
            .map(|v| v.into_owned())
    })
}
