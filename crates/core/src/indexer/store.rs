//! Indexer config store trait.

use super::types::{
    BackendKind, IndexerConfig, IndexerConfigError, UpdateIndexerConfig, UpsertIndexerConfig,
};

/// Per-user backend credentials with "selected backend" semantics.
///
/// At most one config exists per (user, kind). Every operation that makes a
/// config current (`upsert`, `update`, `select`) also deselects the user's
/// other configs within the same transaction, so a user never has more than
/// one selected backend.
pub trait IndexerConfigStore: Send + Sync {
    /// All configs belonging to a user, ordered by kind.
    fn list(&self, user_id: &str) -> Result<Vec<IndexerConfig>, IndexerConfigError>;

    fn get(&self, id: &str) -> Result<Option<IndexerConfig>, IndexerConfigError>;

    /// The user's active backend, if any.
    fn get_selected(&self, user_id: &str) -> Result<Option<IndexerConfig>, IndexerConfigError>;

    fn get_by_kind(
        &self,
        user_id: &str,
        kind: BackendKind,
    ) -> Result<Option<IndexerConfig>, IndexerConfigError>;

    /// Create or replace the user's config for `request.kind`, then select it.
    fn upsert(
        &self,
        user_id: &str,
        request: UpsertIndexerConfig,
    ) -> Result<IndexerConfig, IndexerConfigError>;

    /// Patch credentials of an existing config, then select it.
    fn update(
        &self,
        id: &str,
        request: UpdateIndexerConfig,
    ) -> Result<IndexerConfig, IndexerConfigError>;

    /// Make this config the owner's only selected one.
    fn select(&self, id: &str) -> Result<IndexerConfig, IndexerConfigError>;

    /// Remove a config. Returns the deleted record.
    fn delete(&self, id: &str) -> Result<IndexerConfig, IndexerConfigError>;
}
