//! Common test utilities for E2E testing with mocks.
//!
//! Builds the full router in-process with mock search backends and a mock
//! peer engine injected, so the HTTP surface can be exercised without any
//! external service.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use seedarr_core::testing::{MockIndexerAdapter, MockPeerEngine};
use seedarr_core::{
    create_authenticator, load_config_from_str, AdapterRegistry, Authenticator, BackendKind,
    DownloadManager, DownloadStatus, DownloadsConfig, SearchAggregator, SqliteDownloadStore,
    SqliteIndexerConfigStore, SwarmRegistry,
};
use seedarr_server::api::create_router;
use seedarr_server::state::AppState;

/// Re-export fixtures for test convenience
pub use seedarr_core::testing::fixtures;

pub const ALICE_KEY: &str = "alice-key";
pub const BOB_KEY: &str = "bob-key";

/// In-process server with controllable mocks.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_start_download() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/downloads", json!({
///         "magnet_uri": fixtures::magnet(&fixtures::hex_hash("a")),
///         "name": "A"
///     })).await;
///
///     assert_eq!(response.status, StatusCode::CREATED);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub jackett: Arc<MockIndexerAdapter>,
    pub prowlarr: Arc<MockIndexerAdapter>,
    /// `None` when the fixture runs without a peer engine.
    pub engine: Option<Arc<MockPeerEngine>>,
    pub temp_dir: TempDir,
    /// Sent as `X-API-Key` on every request when set.
    api_key: Option<String>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
pub struct TestConfig {
    pub jackett: MockIndexerAdapter,
    pub prowlarr: MockIndexerAdapter,
    pub engine: Option<MockPeerEngine>,
    /// Use API key auth with `alice` and `bob` instead of anonymous access.
    pub api_keys: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jackett: MockIndexerAdapter::new(BackendKind::Jackett),
            prowlarr: MockIndexerAdapter::new(BackendKind::Prowlarr),
            engine: Some(MockPeerEngine::new()),
            api_keys: false,
        }
    }
}

impl TestConfig {
    pub fn without_engine() -> Self {
        Self {
            engine: None,
            ..Default::default()
        }
    }

    pub fn with_api_keys() -> Self {
        Self {
            api_keys: true,
            ..Default::default()
        }
    }
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = if test_config.api_keys {
            format!(
                r#"
[auth]
method = "api_key"

[[auth.keys]]
key = "{ALICE_KEY}"
user_id = "alice"

[[auth.keys]]
key = "{BOB_KEY}"
user_id = "bob"
"#
            )
        } else {
            "[auth]\nmethod = \"none\"\n".to_string()
        };
        let mut config = load_config_from_str(&auth).expect("Failed to parse test config");
        config.database.path = db_path.clone();
        config.downloads = DownloadsConfig {
            path: temp_dir.path().join("downloads"),
            inspect_path: temp_dir.path().join("inspect"),
            inspect_timeout_secs: 1,
            restore_on_startup: true,
        };

        let authenticator: Arc<dyn Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );

        let indexer_configs = Arc::new(
            SqliteIndexerConfigStore::new(&db_path).expect("Failed to create config store"),
        );
        let download_store =
            Arc::new(SqliteDownloadStore::new(&db_path).expect("Failed to create download store"));

        let jackett = Arc::new(test_config.jackett);
        let prowlarr = Arc::new(test_config.prowlarr);
        let mut adapters = AdapterRegistry::new();
        adapters.register(jackett.clone());
        adapters.register(prowlarr.clone());

        let search = Arc::new(SearchAggregator::new(
            indexer_configs.clone(),
            adapters,
            Duration::from_secs(2),
        ));

        let engine = test_config.engine.map(Arc::new);
        let manager = engine.as_ref().map(|engine| {
            Arc::new(
                DownloadManager::new(
                    download_store.clone(),
                    engine.clone(),
                    Arc::new(SwarmRegistry::default()),
                    config.downloads.clone(),
                )
                .with_inspect_timeout(Duration::from_millis(200)),
            )
        });

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            indexer_configs,
            search,
            download_store,
            manager,
        ));

        Self {
            router: create_router(state),
            jackett,
            prowlarr,
            engine,
            temp_dir,
            api_key: None,
        }
    }

    /// Send subsequent requests as the owner of `key`.
    pub fn as_key(&mut self, key: &str) -> &mut Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn engine(&self) -> &MockPeerEngine {
        self.engine.as_deref().expect("fixture has no engine")
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Configure a backend for the current caller.
    pub async fn configure_indexer(&self, kind: &str) -> TestResponse {
        self.post(
            "/api/v1/indexer-configs",
            serde_json::json!({
                "kind": kind,
                "api_key": "backend-key",
                "base_url": "http://backend.invalid"
            }),
        )
        .await
    }

    /// Start a download and return its id.
    pub async fn start_download(&self, seed: &str) -> String {
        let response = self
            .post(
                "/api/v1/downloads",
                serde_json::json!({
                    "magnet_uri": fixtures::magnet(&fixtures::hex_hash(seed)),
                    "name": seed,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Poll the download until it reports `status`.
    pub async fn wait_for_status(&self, id: &str, status: DownloadStatus) -> Value {
        let path = format!("/api/v1/downloads/{}", id);
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let response = self.get(&path).await;
                if response.body["status"] == status.as_str() {
                    return response.body;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("download {} never reached {}", id, status))
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-Key", key);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}
