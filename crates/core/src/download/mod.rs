//! Persisted downloads and their lifecycle.

mod manager;
mod sqlite_store;
mod store;
mod types;

pub use manager::DownloadManager;
pub use sqlite_store::SqliteDownloadStore;
pub use store::{DownloadStore, NewDownload};
pub use types::*;
