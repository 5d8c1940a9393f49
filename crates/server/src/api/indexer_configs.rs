//! Per-user search backend credentials.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use seedarr_core::indexer::{IndexerConfigView, UpdateIndexerConfig, UpsertIndexerConfig};
use seedarr_core::IndexerConfig;

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IndexerConfigListResponse {
    pub configs: Vec<IndexerConfigView>,
}

/// GET /api/v1/indexer-configs
pub async fn list_configs(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<IndexerConfigListResponse>, ApiError> {
    let configs = state.indexer_configs().list(&user_id)?;
    Ok(Json(IndexerConfigListResponse {
        configs: configs.iter().map(IndexerConfigView::from).collect(),
    }))
}

/// POST /api/v1/indexer-configs
///
/// Create or replace the caller's config for the given backend and select it.
pub async fn upsert_config(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpsertIndexerConfig>,
) -> Result<Json<IndexerConfigView>, ApiError> {
    validate_base_url(body.base_url.as_deref())?;

    let config = state.indexer_configs().upsert(&user_id, body)?;
    info!(user_id = %user_id, backend = %config.kind, "Indexer config saved");
    Ok(Json(IndexerConfigView::from(&config)))
}

/// PATCH /api/v1/indexer-configs/{id}
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateIndexerConfig>,
) -> Result<Json<IndexerConfigView>, ApiError> {
    validate_base_url(body.base_url.as_deref())?;
    owned(&state, &id, &user_id)?;

    let config = state.indexer_configs().update(&id, body)?;
    Ok(Json(IndexerConfigView::from(&config)))
}

/// POST /api/v1/indexer-configs/{id}/select
pub async fn select_config(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<IndexerConfigView>, ApiError> {
    owned(&state, &id, &user_id)?;

    let config = state.indexer_configs().select(&id)?;
    info!(user_id = %user_id, backend = %config.kind, "Indexer config selected");
    Ok(Json(IndexerConfigView::from(&config)))
}

/// DELETE /api/v1/indexer-configs/{id}
pub async fn delete_config(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<IndexerConfigView>, ApiError> {
    owned(&state, &id, &user_id)?;

    let config = state.indexer_configs().delete(&id)?;
    Ok(Json(IndexerConfigView::from(&config)))
}

/// The config, if it exists and belongs to `user_id`. Someone else's config
/// is reported as missing.
fn owned(state: &AppState, id: &str, user_id: &str) -> Result<IndexerConfig, ApiError> {
    state
        .indexer_configs()
        .get(id)?
        .filter(|c| c.user_id == user_id)
        .ok_or_else(|| ApiError::not_found(format!("Indexer config not found: {}", id)))
}

fn validate_base_url(base_url: Option<&str>) -> Result<(), ApiError> {
    match base_url.map(str::trim) {
        Some(url) if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") => {
            Err(ApiError::bad_request(
                "base_url must start with http:// or https://",
            ))
        }
        _ => Ok(()),
    }
}
