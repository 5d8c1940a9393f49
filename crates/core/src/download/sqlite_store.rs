//! SQLite-backed download store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::store::{DownloadStore, NewDownload};
use super::types::{DownloadError, DownloadFilter, DownloadStatus, TorrentDownload};

const SELECT_COLUMNS: &str = "SELECT id, user_id, name, magnet_uri, media_id, origin, quality, \
     language, info_hash, save_path, status, created_at, updated_at FROM torrent_downloads";

pub struct SqliteDownloadStore {
    conn: Mutex<Connection>,
}

impl SqliteDownloadStore {
    /// Open (or create) the database file and ensure the table exists.
    pub fn new(path: &Path) -> Result<Self, DownloadError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, DownloadError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DownloadError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS torrent_downloads (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                magnet_uri TEXT NOT NULL,
                media_id TEXT,
                origin TEXT,
                quality TEXT,
                language TEXT,
                info_hash TEXT NOT NULL DEFAULT '',
                save_path TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_torrent_downloads_magnet_unique ON torrent_downloads(magnet_uri);
            CREATE INDEX IF NOT EXISTS idx_torrent_downloads_user ON torrent_downloads(user_id);
            CREATE INDEX IF NOT EXISTS idx_torrent_downloads_status ON torrent_downloads(status);
            "#,
        )
        .map_err(db_err)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DownloadError> {
        self.conn
            .lock()
            .map_err(|_| DownloadError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_download(row: &rusqlite::Row) -> rusqlite::Result<TorrentDownload> {
        let status_str: String = row.get(10)?;
        let status = status_str.parse::<DownloadStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, e.into())
        })?;
        let created_at: String = row.get(11)?;
        let updated_at: String = row.get(12)?;

        Ok(TorrentDownload {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            magnet_uri: row.get(3)?,
            media_id: row.get(4)?,
            origin: row.get(5)?,
            quality: row.get(6)?,
            language: row.get(7)?,
            info_hash: row.get(8)?,
            save_path: row.get(9)?,
            status,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<TorrentDownload>, DownloadError> {
        conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_download,
        )
        .optional()
        .map_err(db_err)
    }
}

impl DownloadStore for SqliteDownloadStore {
    fn create(&self, download: NewDownload) -> Result<TorrentDownload, DownloadError> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO torrent_downloads
                (id, user_id, name, magnet_uri, media_id, origin, quality, language,
                 info_hash, save_path, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, '', ?, ?, ?, ?)
            "#,
            params![
                id,
                download.user_id,
                download.name,
                download.magnet_uri,
                download.media_id,
                download.origin,
                download.quality,
                download.language,
                download.save_path,
                DownloadStatus::Queued.as_str(),
                now,
                now,
            ],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                DownloadError::AlreadyExists(download.magnet_uri.clone())
            }
            _ => db_err(e),
        })?;

        Self::fetch(&conn, &id)?.ok_or(DownloadError::NotFound(id))
    }

    fn get(&self, id: &str) -> Result<Option<TorrentDownload>, DownloadError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }

    fn find_by_magnet(&self, magnet_uri: &str) -> Result<Option<TorrentDownload>, DownloadError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "{} WHERE magnet_uri = ? ORDER BY created_at ASC LIMIT 1",
                SELECT_COLUMNS
            ),
            params![magnet_uri],
            Self::row_to_download,
        )
        .optional()
        .map_err(db_err)
    }

    fn list(&self, filter: &DownloadFilter) -> Result<Vec<TorrentDownload>, DownloadError> {
        let conn = self.conn()?;

        let mut sql = format!("{} WHERE 1=1", SELECT_COLUMNS);
        let mut values: Vec<String> = Vec::new();
        if let Some(ref user_id) = filter.user_id {
            sql.push_str(" AND user_id = ?");
            values.push(user_id.clone());
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(status.as_str().to_string());
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(values.iter()),
                Self::row_to_download,
            )
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn update_status(
        &self,
        id: &str,
        status: DownloadStatus,
    ) -> Result<TorrentDownload, DownloadError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE torrent_downloads SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), Utc::now().to_rfc3339(), id],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(DownloadError::NotFound(id.to_string()));
        }
        Self::fetch(&conn, id)?.ok_or_else(|| DownloadError::NotFound(id.to_string()))
    }

    fn update_info_hash(&self, id: &str, info_hash: &str) -> Result<(), DownloadError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE torrent_downloads SET info_hash = ?, updated_at = ? WHERE id = ?",
                params![info_hash, Utc::now().to_rfc3339(), id],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(DownloadError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, DownloadError> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM torrent_downloads WHERE id = ?", params![id])
            .map_err(db_err)?;
        Ok(changed > 0)
    }
}

fn db_err(e: rusqlite::Error) -> DownloadError {
    DownloadError::Database(e.to_string())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
