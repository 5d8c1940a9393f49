//! Prometheus metrics for core components.
//!
//! Collectors are process-wide statics. The server registers them through
//! [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Search
// =============================================================================

/// Aggregated searches by backend and result.
pub static SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedarr_searches_total", "Total aggregated searches"),
        &["backend", "result"], // result: "ok", "failed"
    )
    .unwrap()
});

/// End-to-end duration of an aggregated search.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "seedarr_search_duration_seconds",
            "Duration of aggregated searches",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["backend"],
    )
    .unwrap()
});

/// Individual indexer calls that failed or timed out.
pub static INDEXER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedarr_indexer_failures_total",
            "Indexer calls that failed or timed out",
        ),
        &["backend"],
    )
    .unwrap()
});

// =============================================================================
// Downloads
// =============================================================================

/// New download records created.
pub static DOWNLOADS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("seedarr_downloads_started_total", "Total downloads started").unwrap()
});

/// Persisted status transitions.
pub static DOWNLOAD_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedarr_download_transitions_total",
            "Download status transitions",
        ),
        &["from", "to"],
    )
    .unwrap()
});

/// Live swarm handles currently registered.
pub static ACTIVE_SWARMS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("seedarr_active_swarms", "Registered live swarm handles").unwrap()
});

/// Torrent inspections by result.
pub static INSPECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedarr_inspections_total", "Total torrent inspections"),
        &["result"], // "ok", "timeout", "error"
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SEARCHES.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(INDEXER_FAILURES.clone()),
        Box::new(DOWNLOADS_STARTED.clone()),
        Box::new(DOWNLOAD_TRANSITIONS.clone()),
        Box::new(ACTIVE_SWARMS.clone()),
        Box::new(INSPECTIONS.clone()),
    ]
}
