use idea_inbox_schemas::ItemKind;
use rusqlite::{params_from_iter, Connection, Transaction};
use std::path::Path;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::timezone::ReportingZone;

/// Columns every item partition carries, in the order `row_to_item` reads them.
pub(crate) const ITEM_COLUMNS: &str =
    "id, owner_id, content, category, tags, created_at, updated_at, is_processed, is_done";

/// Single-connection SQLite store for ideas, tasks and user settings.
///
/// One writer at a time: callers that share a `Database` across requests wrap
/// it in a mutex. Opening the same file from several processes is not
/// coordinated beyond SQLite's own file locking.
pub struct Database {
    conn: Connection,
    zone: ReportingZone,
}

impl Database {
    /// Open (or create) the database file and bring the schema up to date
    pub fn new<P: AsRef<Path>>(path: P, zone: ReportingZone) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Self { conn, zone };
        db.init_schema()?;

        info!("Database initialized at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory(zone: ReportingZone) -> StoreResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            zone,
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn zone(&self) -> &ReportingZone {
        &self.zone
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin an explicit transaction on the shared connection. Dropping it
    /// without `commit` rolls back.
    pub(crate) fn transaction(&self) -> StoreResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Check if a column exists in a table
    fn has_column(&self, table: &str, column: &str) -> StoreResult<bool> {
        let query = format!("PRAGMA table_info({})", table);
        let mut stmt = self.conn.prepare(&query)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns.iter().any(|name| name == column))
    }

    /// Create all tables and indexes
    fn init_schema(&self) -> StoreResult<()> {
        for kind in ItemKind::ALL {
            let table = kind.table();

            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        owner_id INTEGER NOT NULL,
                        content TEXT NOT NULL CHECK (length(trim(content, ' ' || char(9, 10, 13))) > 0),
                        category TEXT,
                        tags TEXT NOT NULL DEFAULT '[]',
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL,
                        is_processed INTEGER NOT NULL DEFAULT 0,
                        is_done INTEGER NOT NULL DEFAULT 0
                    )"
                ),
                [],
            )?;

            // Older databases predate the done flag and edit timestamps
            if !self.has_column(table, "is_done")? {
                self.conn.execute(
                    &format!("ALTER TABLE {table} ADD COLUMN is_done INTEGER NOT NULL DEFAULT 0"),
                    [],
                )?;
            }
            if !self.has_column(table, "is_processed")? {
                self.conn.execute(
                    &format!(
                        "ALTER TABLE {table} ADD COLUMN is_processed INTEGER NOT NULL DEFAULT 0"
                    ),
                    [],
                )?;
            }
            if !self.has_column(table, "updated_at")? {
                self.conn.execute(
                    &format!("ALTER TABLE {table} ADD COLUMN updated_at TEXT"),
                    [],
                )?;
                self.conn.execute(
                    &format!("UPDATE {table} SET updated_at = created_at WHERE updated_at IS NULL"),
                    [],
                )?;
            }

            self.conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_owner_created
                     ON {table}(owner_id, created_at DESC, id DESC)"
                ),
                [],
            )?;
        }

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS user_settings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL UNIQUE,
                digest_time TEXT NOT NULL DEFAULT '08:00',
                timezone TEXT NOT NULL DEFAULT 'Europe/Moscow',
                streak_count INTEGER NOT NULL DEFAULT 0 CHECK (streak_count >= 0),
                last_activity TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Count rows in one partition across all owners
    pub fn count_items(&self, kind: ItemKind) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Count settings records
    pub fn count_settings(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM user_settings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Count items whose content exactly matches one of `contents`
    pub fn count_items_with_content(&self, kind: ItemKind, contents: &[&str]) -> StoreResult<u64> {
        if contents.is_empty() {
            return Ok(0);
        }
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE content IN ({})",
                kind.table(),
                placeholders(contents.len())
            ),
            params_from_iter(contents.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Administrative removal of items whose content exactly matches one of
    /// `contents`, in one transaction. Returns the number of deleted rows.
    pub fn delete_items_with_content(&self, kind: ItemKind, contents: &[&str]) -> StoreResult<usize> {
        if contents.is_empty() {
            return Ok(0);
        }

        let tx = self.transaction()?;
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE content IN ({})",
                kind.table(),
                placeholders(contents.len())
            ),
            params_from_iter(contents.iter()),
        )?;
        tx.commit()?;

        info!("Deleted {} {} rows by content", deleted, kind.table());
        Ok(deleted)
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
