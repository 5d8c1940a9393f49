//! SQLite-backed indexer config store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::store::IndexerConfigStore;
use super::types::{
    BackendKind, IndexerConfig, IndexerConfigError, UpdateIndexerConfig, UpsertIndexerConfig,
};

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, kind, api_key, base_url, selected, created_at, updated_at FROM indexer_configs";

pub struct SqliteIndexerConfigStore {
    conn: Mutex<Connection>,
}

impl SqliteIndexerConfigStore {
    /// Open (or create) the database file and ensure the table exists.
    pub fn new(path: &Path) -> Result<Self, IndexerConfigError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, IndexerConfigError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), IndexerConfigError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS indexer_configs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                api_key TEXT,
                base_url TEXT,
                selected INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, kind)
            );

            CREATE INDEX IF NOT EXISTS idx_indexer_configs_user ON indexer_configs(user_id);
            "#,
        )
        .map_err(db_err)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, IndexerConfigError> {
        self.conn
            .lock()
            .map_err(|_| IndexerConfigError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_config(row: &rusqlite::Row) -> rusqlite::Result<IndexerConfig> {
        let kind_str: String = row.get(2)?;
        let kind = kind_str.parse::<BackendKind>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
        })?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;

        Ok(IndexerConfig {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind,
            api_key: row.get(3)?,
            base_url: row.get(4)?,
            selected: row.get(5)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<IndexerConfig>, IndexerConfigError> {
        conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_config,
        )
        .optional()
        .map_err(db_err)
    }

    /// Deselect every config of `user_id`, then select `id`.
    fn select_within(conn: &Connection, user_id: &str, id: &str) -> Result<(), IndexerConfigError> {
        conn.execute(
            "UPDATE indexer_configs SET selected = 0 WHERE user_id = ?",
            params![user_id],
        )
        .map_err(db_err)?;
        conn.execute(
            "UPDATE indexer_configs SET selected = 1 WHERE id = ?",
            params![id],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

impl IndexerConfigStore for SqliteIndexerConfigStore {
    fn list(&self, user_id: &str) -> Result<Vec<IndexerConfig>, IndexerConfigError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{} WHERE user_id = ? ORDER BY kind", SELECT_COLUMNS))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id], Self::row_to_config)
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn get(&self, id: &str) -> Result<Option<IndexerConfig>, IndexerConfigError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }

    fn get_selected(&self, user_id: &str) -> Result<Option<IndexerConfig>, IndexerConfigError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{} WHERE user_id = ? AND selected = 1 LIMIT 1", SELECT_COLUMNS),
            params![user_id],
            Self::row_to_config,
        )
        .optional()
        .map_err(db_err)
    }

    fn get_by_kind(
        &self,
        user_id: &str,
        kind: BackendKind,
    ) -> Result<Option<IndexerConfig>, IndexerConfigError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{} WHERE user_id = ? AND kind = ?", SELECT_COLUMNS),
            params![user_id, kind.as_str()],
            Self::row_to_config,
        )
        .optional()
        .map_err(db_err)
    }

    fn upsert(
        &self,
        user_id: &str,
        request: UpsertIndexerConfig,
    ) -> Result<IndexerConfig, IndexerConfigError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            r#"
            INSERT INTO indexer_configs (id, user_id, kind, api_key, base_url, selected, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            ON CONFLICT (user_id, kind) DO UPDATE SET
                api_key = excluded.api_key,
                base_url = excluded.base_url,
                updated_at = excluded.updated_at
            "#,
            params![
                uuid::Uuid::new_v4().to_string(),
                user_id,
                request.kind.as_str(),
                request.api_key,
                request.base_url,
                now,
                now,
            ],
        )
        .map_err(db_err)?;

        let id: String = tx
            .query_row(
                "SELECT id FROM indexer_configs WHERE user_id = ? AND kind = ?",
                params![user_id, request.kind.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        Self::select_within(&tx, user_id, &id)?;
        let config = Self::fetch(&tx, &id)?.ok_or_else(|| IndexerConfigError::NotFound(id))?;
        tx.commit().map_err(db_err)?;
        Ok(config)
    }

    fn update(
        &self,
        id: &str,
        request: UpdateIndexerConfig,
    ) -> Result<IndexerConfig, IndexerConfigError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        let existing =
            Self::fetch(&tx, id)?.ok_or_else(|| IndexerConfigError::NotFound(id.to_string()))?;

        tx.execute(
            "UPDATE indexer_configs SET api_key = ?, base_url = ?, updated_at = ? WHERE id = ?",
            params![
                request.api_key.or(existing.api_key),
                request.base_url.or(existing.base_url),
                Utc::now().to_rfc3339(),
                id,
            ],
        )
        .map_err(db_err)?;

        Self::select_within(&tx, &existing.user_id, id)?;
        let config =
            Self::fetch(&tx, id)?.ok_or_else(|| IndexerConfigError::NotFound(id.to_string()))?;
        tx.commit().map_err(db_err)?;
        Ok(config)
    }

    fn select(&self, id: &str) -> Result<IndexerConfig, IndexerConfigError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        let existing =
            Self::fetch(&tx, id)?.ok_or_else(|| IndexerConfigError::NotFound(id.to_string()))?;
        Self::select_within(&tx, &existing.user_id, id)?;
        let config =
            Self::fetch(&tx, id)?.ok_or_else(|| IndexerConfigError::NotFound(id.to_string()))?;
        tx.commit().map_err(db_err)?;
        Ok(config)
    }

    fn delete(&self, id: &str) -> Result<IndexerConfig, IndexerConfigError> {
        let conn = self.conn()?;
        let existing =
            Self::fetch(&conn, id)?.ok_or_else(|| IndexerConfigError::NotFound(id.to_string()))?;
        conn.execute("DELETE FROM indexer_configs WHERE id = ?", params![id])
            .map_err(db_err)?;
        Ok(existing)
    }
}

fn db_err(e: rusqlite::Error) -> IndexerConfigError {
    IndexerConfigError::Database(e.to_string())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
