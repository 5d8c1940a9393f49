//! Process-wide map of live swarm handles and frozen snapshots.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::engine::SwarmHandle;
use crate::metrics;

use super::live::LiveData;

struct SwarmEntry {
    handle: Arc<dyn SwarmHandle>,
    /// Distinguishes this registration from earlier ones under the same id.
    generation: u64,
    watcher: Option<JoinHandle<()>>,
}

type LockSlots = Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Exclusive access to one registry key. Returned by [`SwarmRegistry::lock`].
///
/// The key's slot is dropped with the last guard that references it, whether
/// that guard held the lock or was still waiting for it.
pub struct KeyGuard {
    key: String,
    slot: Arc<Mutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
    slots: LockSlots,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        self.held.take();
        // One reference in the map, one here: nobody else holds or waits.
        if Arc::strong_count(&self.slot) == 2
            && slots
                .get(&self.key)
                .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot))
        {
            slots.remove(&self.key);
        }
    }
}

/// Download id -> live handle, download id -> snapshot, plus a per-key lock
/// that serializes operations on the same download.
///
/// A download id has at most one live handle. Callers take [`lock`] for the
/// id before mutating either map.
///
/// [`lock`]: SwarmRegistry::lock
#[derive(Default)]
pub struct SwarmRegistry {
    entries: RwLock<HashMap<String, SwarmEntry>>,
    snapshots: RwLock<HashMap<String, LiveData>>,
    locks: LockSlots,
    next_generation: AtomicU64,
}

impl SwarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access for `key` until the guard drops.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        // Built before waiting so a cancelled wait still releases the slot.
        let mut guard = KeyGuard {
            key: key.to_string(),
            slot,
            held: None,
            slots: Arc::clone(&self.locks),
        };
        guard.held = Some(Arc::clone(&guard.slot).lock_owned().await);
        guard
    }

    /// Keys with a holder or a waiter.
    pub fn locked_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Store `handle` as the live handle for `id`, returning its generation.
    ///
    /// A previous registration is replaced and its watcher aborted.
    pub async fn register(&self, id: &str, handle: Arc<dyn SwarmHandle>) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let mut entries = self.entries.write().await;
        let previous = entries.insert(
            id.to_string(),
            SwarmEntry {
                handle,
                generation,
                watcher: None,
            },
        );
        if let Some(watcher) = previous.and_then(|e| e.watcher) {
            watcher.abort();
        }
        metrics::ACTIVE_SWARMS.set(entries.len() as i64);
        debug!(download_id = %id, generation = generation, "Swarm registered");
        generation
    }

    /// Attach the background task following registration `generation`.
    ///
    /// The task is aborted right away when that registration is gone.
    pub async fn set_watcher(&self, id: &str, generation: u64, watcher: JoinHandle<()>) {
        let mut entries = self.entries.write().await;
        match entries.get_mut(id) {
            Some(entry) if entry.generation == generation => {
                if let Some(old) = entry.watcher.replace(watcher) {
                    old.abort();
                }
            }
            _ => watcher.abort(),
        }
    }

    /// Whether registration `generation` is still the live one for `id`.
    pub async fn is_current(&self, id: &str, generation: u64) -> bool {
        self.entries
            .read()
            .await
            .get(id)
            .is_some_and(|e| e.generation == generation)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn SwarmHandle>> {
        self.entries
            .read()
            .await
            .get(id)
            .map(|e| Arc::clone(&e.handle))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.entries.read().await.contains_key(id)
    }

    /// Remove the live handle for `id`. Its watcher is aborted; the handle
    /// itself is returned for the caller to tear down.
    pub async fn deregister(&self, id: &str) -> Option<Arc<dyn SwarmHandle>> {
        let mut entries = self.entries.write().await;
        let entry = entries.remove(id)?;
        metrics::ACTIVE_SWARMS.set(entries.len() as i64);
        if let Some(watcher) = entry.watcher {
            watcher.abort();
        }
        debug!(download_id = %id, "Swarm deregistered");
        Some(entry.handle)
    }

    pub async fn active_count(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn set_snapshot(&self, id: &str, snapshot: LiveData) {
        self.snapshots
            .write()
            .await
            .insert(id.to_string(), snapshot);
    }

    pub async fn snapshot(&self, id: &str) -> Option<LiveData> {
        self.snapshots.read().await.get(id).cloned()
    }

    pub async fn take_snapshot(&self, id: &str) -> Option<LiveData> {
        self.snapshots.write().await.remove(id)
    }

    pub async fn clear_snapshot(&self, id: &str) {
        self.snapshots.write().await.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::extract_live_data;
    use crate::testing::MockSwarmHandle;
    use std::time::Duration;

    async fn wait_finished(abort: &tokio::task::AbortHandle) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !abort.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("watcher was not aborted");
    }

    fn handle(path: &str) -> Arc<dyn SwarmHandle> {
        Arc::new(MockSwarmHandle::new("magnet:?xt=urn:btih:abc", path))
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = SwarmRegistry::new();
        assert!(registry.get("d1").await.is_none());

        registry.register("d1", handle("/a")).await;

        let found = registry.get("d1").await.unwrap();
        assert_eq!(found.save_path().to_str(), Some("/a"));
        assert!(registry.contains("d1").await);
        assert_eq!(registry.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_replaces_previous_generation() {
        let registry = SwarmRegistry::new();
        let first = registry.register("d1", handle("/a")).await;
        let second = registry.register("d1", handle("/b")).await;

        assert_ne!(first, second);
        assert!(!registry.is_current("d1", first).await);
        assert!(registry.is_current("d1", second).await);
        assert_eq!(registry.active_count().await, 1);
        assert_eq!(
            registry.get("d1").await.unwrap().save_path().to_str(),
            Some("/b")
        );
    }

    #[tokio::test]
    async fn test_deregister_aborts_watcher() {
        let registry = SwarmRegistry::new();
        let generation = registry.register("d1", handle("/a")).await;

        let watcher = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let abort = watcher.abort_handle();
        registry.set_watcher("d1", generation, watcher).await;

        assert!(registry.deregister("d1").await.is_some());
        wait_finished(&abort).await;
        assert!(registry.deregister("d1").await.is_none());
        assert_eq!(registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_stale_watcher_is_aborted() {
        let registry = SwarmRegistry::new();
        let stale = registry.register("d1", handle("/a")).await;
        registry.register("d1", handle("/b")).await;

        let watcher = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let abort = watcher.abort_handle();
        registry.set_watcher("d1", stale, watcher).await;

        wait_finished(&abort).await;
    }

    #[tokio::test]
    async fn test_snapshots() {
        let registry = SwarmRegistry::new();
        let live = extract_live_data(&MockSwarmHandle::new("magnet:?xt=urn:btih:abc", "/a"));

        registry.set_snapshot("d1", live.clone().frozen()).await;
        assert!(registry.snapshot("d1").await.unwrap().paused);

        let taken = registry.take_snapshot("d1").await;
        assert!(taken.is_some());
        assert!(registry.snapshot("d1").await.is_none());

        registry.set_snapshot("d1", live).await;
        registry.clear_snapshot("d1").await;
        assert!(registry.snapshot("d1").await.is_none());
    }

    #[tokio::test]
    async fn test_lock_serializes_same_key() {
        let registry = Arc::new(SwarmRegistry::new());
        let guard = registry.lock("d1").await;

        let contender = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _guard = registry.lock("d1").await;
            })
        };

        // A different key is not blocked.
        let other = tokio::time::timeout(Duration::from_millis(100), registry.lock("d2")).await;
        assert!(other.is_ok());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_lock_slot_released_with_last_guard() {
        let registry = SwarmRegistry::new();

        let guard = registry.lock("missing").await;
        assert_eq!(registry.locked_keys(), 1);
        drop(guard);

        assert_eq!(registry.locked_keys(), 0);
    }

    #[tokio::test]
    async fn test_lock_slot_survives_while_waiter_queued() {
        let registry = Arc::new(SwarmRegistry::new());
        let guard = registry.lock("uri:m").await;

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _guard = registry.lock("uri:m").await;
                tokio::time::sleep(Duration::from_millis(50)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(registry.locked_keys(), 1);

        // A newcomer queues on the same slot instead of a fresh one.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let newcomer = tokio::time::timeout(Duration::from_millis(10), registry.lock("uri:m")).await;
        assert!(newcomer.is_err());

        waiter.await.unwrap();
        assert_eq!(registry.locked_keys(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_wait_releases_slot() {
        let registry = SwarmRegistry::new();
        let guard = registry.lock("d1").await;

        let waited = tokio::time::timeout(Duration::from_millis(20), registry.lock("d1")).await;
        assert!(waited.is_err());
        assert_eq!(registry.locked_keys(), 1);

        drop(guard);
        assert_eq!(registry.locked_keys(), 0);
    }
}
