use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seedarr_core::{
    config_path_from_env, create_authenticator, load_config, validate_config, AdapterRegistry,
    Authenticator, DownloadManager, DownloadStore, IndexerConfigStore, LibrqbitEngine,
    PeerEngine, SearchAggregator, SqliteDownloadStore, SqliteIndexerConfigStore, SwarmRegistry,
};
use seedarr_server::api::create_router;
use seedarr_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = config_path_from_env();

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Stores share one database file
    let indexer_configs: Arc<dyn IndexerConfigStore> = Arc::new(
        SqliteIndexerConfigStore::new(&config.database.path)
            .context("Failed to create indexer config store")?,
    );
    let download_store: Arc<dyn DownloadStore> = Arc::new(
        SqliteDownloadStore::new(&config.database.path)
            .context("Failed to create download store")?,
    );
    info!("Stores initialized");

    let call_timeout = Duration::from_secs(config.search.timeout_secs as u64);
    let adapters =
        AdapterRegistry::with_http_adapters(call_timeout).context("Failed to create adapters")?;
    let search = Arc::new(SearchAggregator::new(
        Arc::clone(&indexer_configs),
        adapters,
        call_timeout,
    ));

    let downloads = match &config.engine {
        Some(engine_config) => {
            info!(
                "Initializing embedded librqbit engine (download path: {:?})",
                config.downloads.path
            );
            let engine: Arc<dyn PeerEngine> = Arc::new(
                LibrqbitEngine::new(engine_config, &config.downloads.path)
                    .await
                    .context("Failed to initialize peer engine")?,
            );
            let manager = Arc::new(DownloadManager::new(
                Arc::clone(&download_store),
                engine,
                Arc::new(SwarmRegistry::default()),
                config.downloads.clone(),
            ));

            if config.downloads.restore_on_startup {
                match manager.reconcile_on_startup().await {
                    Ok(count) => info!("Re-attached {} downloads", count),
                    Err(e) => warn!("Failed to restore downloads: {}", e),
                }
            }
            Some(manager)
        }
        None => {
            info!("No peer engine configured, download endpoints disabled");
            None
        }
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        indexer_configs,
        search,
        download_store,
        downloads,
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
