//! Search backends: adapters, per-user credentials and title inference.

mod adapter;
mod inference;
mod jackett;
mod prowlarr;
mod sqlite_store;
mod store;
mod types;

pub use adapter::{AdapterRegistry, IndexerAdapter};
pub use inference::{infer_language, infer_quality};
pub use jackett::JackettAdapter;
pub use prowlarr::ProwlarrAdapter;
pub use sqlite_store::SqliteIndexerConfigStore;
pub use store::IndexerConfigStore;
pub use types::*;
