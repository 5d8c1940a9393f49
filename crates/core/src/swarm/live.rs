//! Uniform telemetry view over live swarms and frozen snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::SwarmHandle;

/// Telemetry for one download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveData {
    pub info_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Directory the data is stored under.
    pub path: String,
    /// Metadata resolved and swarm running.
    pub ready: bool,
    pub paused: bool,
    pub done: bool,
    /// Fraction complete, 0.0 to 1.0.
    pub progress: f64,
    pub downloaded: u64,
    pub uploaded: u64,
    /// Total selected size in bytes.
    pub length: u64,
    /// Bytes per second.
    pub download_speed: u64,
    pub upload_speed: u64,
    pub ratio: f64,
    pub num_peers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining_secs: Option<u64>,
    pub files: Vec<LiveFile>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveFile {
    pub name: String,
    pub path: String,
    pub length: u64,
    pub downloaded: u64,
    pub progress: f64,
}

impl LiveData {
    /// The view kept while a download has no live handle: counters are kept,
    /// rates and peers drop to zero.
    pub fn frozen(mut self) -> Self {
        self.paused = true;
        self.download_speed = 0;
        self.upload_speed = 0;
        self.num_peers = 0;
        self.time_remaining_secs = None;
        self
    }
}

/// Project a live handle into [`LiveData`].
pub fn extract_live_data(handle: &dyn SwarmHandle) -> LiveData {
    let stats = handle.stats();
    let files = handle.files();

    let live_files = files
        .into_iter()
        .enumerate()
        .map(|(index, file)| {
            let downloaded = stats
                .file_progress
                .get(index)
                .copied()
                .unwrap_or(0)
                .min(file.length);
            LiveFile {
                progress: fraction(downloaded, file.length),
                downloaded,
                name: file.name,
                path: file.path,
                length: file.length,
            }
        })
        .collect();

    let remaining = stats.total_bytes.saturating_sub(stats.downloaded_bytes);
    let time_remaining_secs = if stats.finished {
        Some(0)
    } else if stats.download_speed > 0 {
        Some(remaining / stats.download_speed)
    } else {
        None
    };

    LiveData {
        info_hash: handle.info_hash().unwrap_or_default(),
        name: handle.name(),
        path: handle.save_path().display().to_string(),
        ready: stats.ready,
        paused: false,
        done: stats.finished,
        progress: if stats.finished {
            1.0
        } else {
            fraction(stats.downloaded_bytes, stats.total_bytes)
        },
        downloaded: stats.downloaded_bytes,
        uploaded: stats.uploaded_bytes,
        length: stats.total_bytes,
        download_speed: stats.download_speed,
        upload_speed: stats.upload_speed,
        ratio: if stats.downloaded_bytes > 0 {
            stats.uploaded_bytes as f64 / stats.downloaded_bytes as f64
        } else {
            0.0
        },
        num_peers: stats.peers,
        time_remaining_secs,
        files: live_files,
        captured_at: Utc::now(),
    }
}

fn fraction(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64).min(1.0)
    }
}
