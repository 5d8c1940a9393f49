//! Torrent inspection.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use seedarr_core::InspectResult;

use super::downloads::manager;
use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InspectParams {
    pub magnet: String,
}

/// GET /api/v1/torrents/inspect?magnet=...
///
/// Resolve a torrent's name and file list without downloading content.
pub async fn inspect_torrent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InspectParams>,
) -> Result<Json<InspectResult>, ApiError> {
    let result = manager(&state)?.inspect(&params.magnet).await?;
    Ok(Json(result))
}
