//! Download record store trait.

use super::types::{DownloadError, DownloadFilter, DownloadStatus, TorrentDownload};

/// Fields for a new record. Id, status and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewDownload {
    pub user_id: String,
    pub name: String,
    pub magnet_uri: String,
    pub media_id: Option<String>,
    pub origin: Option<String>,
    pub quality: Option<String>,
    pub language: Option<String>,
    pub save_path: String,
}

/// Persistence for [`TorrentDownload`] records.
///
/// The store does not enforce uniqueness on the magnet URI; the lifecycle
/// manager checks `find_by_magnet` under a per-URI lock.
pub trait DownloadStore: Send + Sync {
    /// Insert a `queued` record.
    fn create(&self, download: NewDownload) -> Result<TorrentDownload, DownloadError>;

    fn get(&self, id: &str) -> Result<Option<TorrentDownload>, DownloadError>;

    fn find_by_magnet(&self, magnet_uri: &str) -> Result<Option<TorrentDownload>, DownloadError>;

    /// Newest first.
    fn list(&self, filter: &DownloadFilter) -> Result<Vec<TorrentDownload>, DownloadError>;

    fn update_status(
        &self,
        id: &str,
        status: DownloadStatus,
    ) -> Result<TorrentDownload, DownloadError>;

    fn update_info_hash(&self, id: &str, info_hash: &str) -> Result<(), DownloadError>;

    /// Returns false when nothing was deleted.
    fn delete(&self, id: &str) -> Result<bool, DownloadError>;
}
