//! Testing utilities and mock implementations.
//!
//! Mocks for the external collaborators (search backends and the peer
//! engine) so the aggregator, the lifecycle manager and the HTTP layer can be
//! exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedarr_core::testing::{fixtures, MockIndexerAdapter, MockPeerEngine};
//!
//! let adapter = MockIndexerAdapter::new(BackendKind::Prowlarr)
//!     .with_results("1", vec![fixtures::torrent("Dune.2021.2160p", 120)]);
//! let engine = MockPeerEngine::new().never_ready();
//!
//! // Wire into a SearchAggregator / DownloadManager...
//! ```

mod mock_indexer_adapter;
mod mock_peer_engine;

pub use mock_indexer_adapter::MockIndexerAdapter;
pub use mock_peer_engine::{MockPeerEngine, MockSwarmHandle};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::download::StartDownloadRequest;
    use crate::indexer::{infer_language, infer_quality, BackendKind, Torrent, TorrentIndexer};

    /// A search result with reasonable defaults.
    pub fn torrent(title: &str, seeders: u32) -> Torrent {
        Torrent {
            title: title.to_string(),
            tracker: "mock-tracker".to_string(),
            size: 1024 * 1024 * 1024 * 2, // 2 GB
            publish_date: None,
            seeders,
            peers: seeders + 5,
            link: magnet(&hex_hash(title)),
            guid: format!("mock-{}", title),
            quality: infer_quality(title),
            language: infer_language(title),
            details_url: None,
            backend: BackendKind::Jackett,
        }
    }

    /// A tracker as listed by a backend.
    pub fn indexer(id: &str, name: &str) -> TorrentIndexer {
        TorrentIndexer {
            id: id.to_string(),
            name: name.to_string(),
            privacy: Some("public".to_string()),
        }
    }

    /// A magnet link for `info_hash`.
    pub fn magnet(info_hash: &str) -> String {
        format!("magnet:?xt=urn:btih:{}", info_hash)
    }

    /// A start request for `magnet_uri`.
    pub fn start_request(magnet_uri: &str, name: &str) -> StartDownloadRequest {
        StartDownloadRequest {
            magnet_uri: magnet_uri.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// A stable 40-character hex string derived from `seed`.
    pub fn hex_hash(seed: &str) -> String {
        let mut state: u64 = 0xcbf29ce484222325;
        let mut out = String::with_capacity(40);
        while out.len() < 40 {
            for byte in seed.bytes().chain(out.len().to_le_bytes()) {
                state ^= byte as u64;
                state = state.wrapping_mul(0x100000001b3);
            }
            out.push_str(&format!("{:016x}", state));
        }
        out.truncate(40);
        out
    }
}
