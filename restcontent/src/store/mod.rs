//! SQLite-backed entity store.
//!
//! One table per record type. Each table holds the natural key columns,
//! enforced unique, plus the full record as JSON in `data`.

mod accessor;
mod record;

pub use accessor::{EntityAccessor, FieldMap, TableAccessor};
pub use record::{Entity, Record};

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::error::Result;
use crate::model::{Category, GroupMember, Media, Page, Post, Site, User, UserGroup};

const TABLES: [(&str, &[&str]); 8] = [
    (User::TABLE, User::KEY_COLUMNS),
    (UserGroup::TABLE, UserGroup::KEY_COLUMNS),
    (GroupMember::TABLE, GroupMember::KEY_COLUMNS),
    (Site::TABLE, Site::KEY_COLUMNS),
    (Category::TABLE, Category::KEY_COLUMNS),
    (Page::TABLE, Page::KEY_COLUMNS),
    (Post::TABLE, Post::KEY_COLUMNS),
    (Media::TABLE, Media::KEY_COLUMNS),
];

/// Shared handle to the entity database.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;",
        )?;
        Self::init(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA temp_store=MEMORY;")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        for (table, keys) in TABLES {
            let columns: Vec<String> = keys
                .iter()
                .map(|k| format!("\"{k}\" TEXT NOT NULL"))
                .collect();
            let unique: Vec<String> = keys.iter().map(|k| format!("\"{k}\"")).collect();
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS \"{table}\" (
                        seq  INTEGER PRIMARY KEY AUTOINCREMENT,
                        {},
                        data TEXT NOT NULL,
                        UNIQUE ({})
                    )",
                    columns.join(",\n"),
                    unique.join(", ")
                ),
                [],
            )?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Lock the connection for autocommit statements.
    pub async fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Start a transaction that owns the connection until it ends.
    pub async fn begin(&self) -> Result<StoreTx> {
        let guard = self.conn.clone().lock_owned().await;
        guard.execute_batch("BEGIN IMMEDIATE")?;
        Ok(StoreTx {
            guard,
            finished: false,
        })
    }

    /// Insert unless the natural key exists. Returns `false` when skipped.
    pub async fn insert<E: Entity>(&self, entity: &E) -> Result<bool> {
        let conn = self.conn.lock().await;
        accessor::insert_row(&conn, entity)
    }

    /// All rows of one record type in insertion order.
    pub async fn list<E: Entity>(&self) -> Result<Vec<E>> {
        let conn = self.conn.lock().await;
        accessor::list_rows(&conn)
    }

    pub async fn count(&self, table: &str) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }

    /// Look up a media record by folder path and file name.
    ///
    /// `path` matches with or without a trailing slash.
    pub async fn find_media(&self, path: &str, name: &str) -> Result<Option<Media>> {
        let trimmed = path.trim_end_matches('/');
        let slashed = format!("{trimmed}/");
        let bare = if trimmed.is_empty() { "/" } else { trimmed };

        let conn = self.conn.lock().await;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM \"media\" WHERE \"path\" IN (?1, ?2) AND \"name\" = ?3 \
                 ORDER BY seq LIMIT 1",
                [slashed.as_str(), bare, name],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }
}

/// An open transaction holding exclusive use of the connection.
///
/// Dropping it without [`StoreTx::commit`] rolls back.
pub struct StoreTx {
    guard: OwnedMutexGuard<Connection>,
    finished: bool,
}

impl StoreTx {
    /// Connection bound to this transaction.
    pub fn conn(&self) -> &Connection {
        &self.guard
    }

    pub fn commit(mut self) -> Result<()> {
        self.guard.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.guard.execute_batch("ROLLBACK")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for StoreTx {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.guard.execute_batch("ROLLBACK") {
                tracing::warn!("Failed to roll back abandoned transaction: {}", e);
            }
        }
    }
}
