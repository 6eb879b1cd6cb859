//! Embedded, file-backed store on top of SQLite.
//!
//! All records live in a single `kv` table keyed by a BLOB. SQLite compares BLOBs
//! with `memcmp`, so `ORDER BY key` is the byte order the balance keys rely on.

use super::{ReadTransaction, ScanDirection, ScanFlow, Store, StoreError, StoreResult, WriteTransaction};

use std::path::Path;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OptionalExtension};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key BLOB PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
) WITHOUT ROWID;
"#;

const SELECT_VALUE: &str = "SELECT value FROM kv WHERE key = ?1";

const UPSERT_VALUE: &str =
    "INSERT INTO kv (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value";

const CLEAR_ALL: &str = "DELETE FROM kv";

const SCAN_FORWARD: &str = "SELECT key, value FROM kv ORDER BY key ASC";
const SCAN_REVERSE: &str = "SELECT key, value FROM kv ORDER BY key DESC";

/// A SQLite-backed store sharing one connection between transactions.
///
/// The connection sits behind a mutex, so transactions of the same store run one at
/// a time and a read transaction always sees fully committed batches.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the store file at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        log::debug!("Opening SQLite store at {path:?}");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Store for SqliteStore {
    type Writer<'a> = SqliteWriteTransaction<'a>
    where
        Self: 'a;

    type Reader<'a> = SqliteReadTransaction<'a>
    where
        Self: 'a;

    fn begin_write(&self) -> StoreResult<SqliteWriteTransaction<'_>> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN IMMEDIATE")?;

        Ok(SqliteWriteTransaction { conn, open: true })
    }

    fn begin_read(&self) -> StoreResult<SqliteReadTransaction<'_>> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN DEFERRED")?;

        Ok(SqliteReadTransaction { conn, open: true })
    }

    fn clear(&self) -> StoreResult<()> {
        let deleted = self.conn.lock().execute(CLEAR_ALL, [])?;
        log::debug!("Cleared {deleted} records from SQLite store");
        Ok(())
    }
}

pub struct SqliteWriteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl WriteTransaction for SqliteWriteTransaction<'_> {
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .prepare_cached(SELECT_VALUE)?
            .query_row(params![key], |row| row.get::<_, Vec<u8>>(0))
            .optional()?;

        Ok(value)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.conn
            .prepare_cached(UPSERT_VALUE)?
            .execute(params![key, value])?;

        Ok(())
    }

    fn clear(&mut self) -> StoreResult<()> {
        let deleted = self.conn.execute(CLEAR_ALL, [])?;
        log::debug!("Cleared {deleted} records in write transaction");
        Ok(())
    }

    fn commit(mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }

    fn rollback(mut self) -> StoreResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        self.open = false;
        Ok(())
    }
}

impl Drop for SqliteWriteTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            log::debug!("Write transaction dropped without commit, rolling back");
            rollback_quietly(&self.conn);
        }
    }
}

pub struct SqliteReadTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl ReadTransaction for SqliteReadTransaction<'_> {
    fn scan<F, E>(&mut self, direction: ScanDirection, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<ScanFlow, E>,
        E: From<StoreError>,
    {
        let sql = match direction {
            ScanDirection::Forward => SCAN_FORWARD,
            ScanDirection::Reverse => SCAN_REVERSE,
        };

        let mut stmt = self.conn.prepare(sql).map_err(StoreError::from)?;
        let mut rows = stmt.query([]).map_err(StoreError::from)?;

        while let Some(row) = rows.next().map_err(StoreError::from)? {
            let key = blob_column(row, 0)?;
            let value = blob_column(row, 1)?;

            if visit(key, value)? == ScanFlow::Stop {
                break;
            }
        }

        Ok(())
    }

    fn finish(mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }
}

impl Drop for SqliteReadTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            rollback_quietly(&self.conn);
        }
    }
}

fn blob_column<'r>(row: &'r rusqlite::Row<'_>, idx: usize) -> StoreResult<&'r [u8]> {
    row.get_ref(idx)?
        .as_blob()
        .map_err(|e| StoreError::Corrupted(format!("column {idx} is not a BLOB: {e}")))
}

fn rollback_quietly(conn: &Connection) {
    if let Err(e) = conn.execute_batch("ROLLBACK") {
        log::warn!("Failed to roll back SQLite transaction: {e}");
    }
}
