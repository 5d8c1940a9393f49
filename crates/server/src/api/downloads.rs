//! Download lifecycle API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use seedarr_core::{
    DownloadFilter, DownloadManager, DownloadStatus, DownloadView, StartDownloadRequest,
    TorrentDownload,
};

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListDownloadsParams {
    #[serde(default)]
    pub status: Option<DownloadStatus>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDownloadParams {
    #[serde(default)]
    pub delete_files: bool,
}

#[derive(Debug, Serialize)]
pub struct DownloadListResponse {
    pub downloads: Vec<DownloadView>,
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/downloads
///
/// Start acquiring a torrent. A magnet that is already tracked returns the
/// existing record.
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<StartDownloadRequest>,
) -> Result<(StatusCode, Json<TorrentDownload>), ApiError> {
    let download = manager(&state)?.start(&user_id, body).await?;
    info!(download_id = %download.id, user_id = %user_id, "Download requested");
    Ok((StatusCode::CREATED, Json(download)))
}

/// GET /api/v1/downloads
pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<ListDownloadsParams>,
) -> Result<Json<DownloadListResponse>, ApiError> {
    let filter = DownloadFilter {
        user_id: Some(user_id),
        status: params.status,
    };
    let downloads = manager(&state)?.list(&filter).await?;
    Ok(Json(DownloadListResponse {
        count: downloads.len(),
        downloads,
    }))
}

/// GET /api/v1/downloads/{id}
pub async fn get_download(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DownloadView>, ApiError> {
    let view = owned(manager(&state)?, &id, &user_id).await?;
    Ok(Json(view))
}

/// POST /api/v1/downloads/{id}/pause
pub async fn pause_download(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TorrentDownload>, ApiError> {
    let manager = manager(&state)?;
    owned(manager, &id, &user_id).await?;
    Ok(Json(manager.pause(&id).await?))
}

/// POST /api/v1/downloads/{id}/resume
pub async fn resume_download(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TorrentDownload>, ApiError> {
    let manager = manager(&state)?;
    owned(manager, &id, &user_id).await?;
    Ok(Json(manager.resume(&id).await?))
}

/// DELETE /api/v1/downloads/{id}?delete_files=true
pub async fn delete_download(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Query(params): Query<DeleteDownloadParams>,
) -> Result<Json<TorrentDownload>, ApiError> {
    let manager = manager(&state)?;
    owned(manager, &id, &user_id).await?;
    Ok(Json(manager.delete(&id, params.delete_files).await?))
}

pub(super) fn manager(state: &AppState) -> Result<&Arc<DownloadManager>, ApiError> {
    state
        .downloads()
        .ok_or_else(|| ApiError::unavailable("Peer engine not configured"))
}

/// The download, if it belongs to `user_id`. Someone else's download is
/// reported as missing.
async fn owned(
    manager: &DownloadManager,
    id: &str,
    user_id: &str,
) -> Result<DownloadView, ApiError> {
    let view = manager.get(id).await?;
    if view.download.user_id != user_id {
        return Err(ApiError::not_found(format!("Download not found: {}", id)));
    }
    Ok(view)
}
