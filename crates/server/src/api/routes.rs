use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{downloads, handlers, indexer_configs, search, torrents};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Authenticated API routes
    let api_routes = Router::new()
        .route("/config", get(handlers::get_config))
        // Indexer configs
        .route(
            "/indexer-configs",
            get(indexer_configs::list_configs).post(indexer_configs::upsert_config),
        )
        .route(
            "/indexer-configs/{id}",
            patch(indexer_configs::update_config).delete(indexer_configs::delete_config),
        )
        .route(
            "/indexer-configs/{id}/select",
            post(indexer_configs::select_config),
        )
        // Search
        .route("/indexers", get(search::list_indexers))
        .route("/search", get(search::search))
        // Downloads
        .route(
            "/downloads",
            get(downloads::list_downloads).post(downloads::start_download),
        )
        .route(
            "/downloads/{id}",
            get(downloads::get_download).delete(downloads::delete_download),
        )
        .route("/downloads/{id}/pause", post(downloads::pause_download))
        .route("/downloads/{id}/resume", post(downloads::resume_download))
        // Inspection
        .route("/torrents/inspect", get(torrents::inspect_torrent))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    // Health stays reachable without credentials
    let api_routes = api_routes.route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
