use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{EngineError, SwarmFile};
use crate::swarm::LiveData;

/// Persisted lifecycle state of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Queued,
    Downloading,
    Paused,
    Completed,
}

impl DownloadStatus {
    pub const ALL: [DownloadStatus; 4] = [
        DownloadStatus::Queued,
        DownloadStatus::Downloading,
        DownloadStatus::Paused,
        DownloadStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Queued => "queued",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DownloadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queued" => Ok(DownloadStatus::Queued),
            "downloading" => Ok(DownloadStatus::Downloading),
            "paused" => Ok(DownloadStatus::Paused),
            "completed" => Ok(DownloadStatus::Completed),
            other => Err(format!("Unknown download status: {}", other)),
        }
    }
}

/// The persisted acquisition record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentDownload {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub magnet_uri: String,
    /// Catalog media this download belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Empty until the engine resolves metadata.
    pub info_hash: String,
    pub save_path: String,
    pub status: DownloadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`DownloadManager::start`](super::DownloadManager::start).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartDownloadRequest {
    pub magnet_uri: String,
    pub name: String,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Filter for listing downloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadFilter {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<DownloadStatus>,
}

/// A persisted record enriched with telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadView {
    #[serde(flatten)]
    pub download: TorrentDownload,
    /// Fresh telemetry when connected, the pause snapshot otherwise.
    pub live: Option<LiveData>,
}

/// Metadata resolved by inspecting a torrent without downloading it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectResult {
    pub name: Option<String>,
    pub info_hash: String,
    pub files: Vec<SwarmFile>,
    pub total_size: u64,
    /// Largest video file, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_file: Option<SwarmFile>,
}

const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "m4v", "mpg", "mpeg", "ts", "webm", "flv",
];

/// The largest file with a video extension.
pub fn largest_video_file(files: &[SwarmFile]) -> Option<&SwarmFile> {
    files
        .iter()
        .filter(|f| {
            Path::new(&f.name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .max_by_key(|f| f.length)
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download not found: {0}")]
    NotFound(String),

    /// Another record already holds this magnet URI.
    #[error("Download already exists for {0}")]
    AlreadyExists(String),

    #[error("Cannot {operation} download {id} with status: {status}")]
    InvalidState {
        id: String,
        status: DownloadStatus,
        operation: &'static str,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Validation(String),
}
