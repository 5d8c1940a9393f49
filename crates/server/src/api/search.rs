//! Search API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use seedarr_core::{BackendKind, MediaKind, SearchOutcome, SearchRequest, TorrentIndexer};

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// `movie` or `tv`.
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    /// Comma-separated backend indexer ids.
    #[serde(default, rename = "indexerIds", alias = "indexerId")]
    pub indexer_ids: Option<String>,
    #[serde(default)]
    pub backend: Option<String>,
}

impl SearchParams {
    fn into_request(self) -> Result<SearchRequest, ApiError> {
        let media_kind = self
            .media_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::parse::<MediaKind>)
            .transpose()
            .map_err(ApiError::bad_request)?;

        let backend = self
            .backend
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(str::parse::<BackendKind>)
            .transpose()
            .map_err(ApiError::bad_request)?;

        let indexer_ids = self
            .indexer_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        Ok(SearchRequest {
            query: self.q,
            media_kind,
            year: self.year.filter(|y| !y.trim().is_empty()),
            backend,
            indexer_ids,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct IndexersResponse {
    pub indexers: Vec<TorrentIndexer>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/indexers
///
/// Trackers exposed by the caller's selected backend. Empty when the backend
/// cannot be reached.
pub async fn list_indexers(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<IndexersResponse>, ApiError> {
    let indexers = state.search().list_indexers(&user_id).await?;
    Ok(Json(IndexersResponse { indexers }))
}

/// GET /api/v1/search
///
/// Fan a query out to the caller's backend and return ranked results.
pub async fn search(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let request = params.into_request()?;
    let outcome = state.search().search_torrents(&user_id, &request).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> SearchParams {
        let uri: axum::http::Uri = format!("/search?{}", query).parse().unwrap();
        Query::<SearchParams>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_full_params() {
        let request = params("q=dune&type=movie&year=2021&indexerIds=yts,%201337x&backend=prowlarr")
            .into_request()
            .unwrap();

        assert_eq!(request.query, "dune");
        assert_eq!(request.media_kind, Some(MediaKind::Movie));
        assert_eq!(request.year.as_deref(), Some("2021"));
        assert_eq!(request.backend, Some(BackendKind::Prowlarr));
        assert_eq!(request.indexer_ids, vec!["yts", "1337x"]);
    }

    #[test]
    fn test_minimal_params() {
        let request = params("q=dune").into_request().unwrap();
        assert!(request.media_kind.is_none());
        assert!(request.backend.is_none());
        assert!(request.indexer_ids.is_empty());
    }

    #[test]
    fn test_single_indexer_alias() {
        let request = params("q=dune&indexerId=yts").into_request().unwrap();
        assert_eq!(request.indexer_ids, vec!["yts"]);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = params("q=dune&type=music").into_request().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = params("q=dune&backend=rarbg").into_request().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
