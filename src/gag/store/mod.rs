//! Transactional, ordered key-value store capability.
//!
//! The aggregation engine never talks to a storage engine directly. It is handed a
//! [`Store`] and only relies on:
//!
//! - exclusive read-write transactions with `get`, `set`, `clear`, `commit` and
//!   `rollback`,
//! - read-only transactions that visit every record in byte order of the key,
//!   forwards or backwards, isolated from concurrent writers.
//!
//! A write transaction dropped without `commit` is rolled back.

mod memory;
mod sqlite;

pub use memory::{MemoryReadTransaction, MemoryStore, MemoryWriteTransaction};
pub use sqlite::{SqliteReadTransaction, SqliteStore, SqliteWriteTransaction};

use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store corrupted: {0}")]
    Corrupted(String),

    #[error("Store backend failure: {0}")]
    Backend(String),
}

/// Order in which a read transaction visits keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanDirection {
    #[default]
    Forward,
    Reverse,
}

/// Returned by scan visitors to keep going or stop early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFlow {
    Continue,
    Stop,
}

pub trait Store {
    type Writer<'a>: WriteTransaction
    where
        Self: 'a;

    type Reader<'a>: ReadTransaction
    where
        Self: 'a;

    /// Starts the single read-write transaction of this store, waiting for any other to end.
    fn begin_write(&self) -> StoreResult<Self::Writer<'_>>;

    fn begin_read(&self) -> StoreResult<Self::Reader<'_>>;

    /// Drops every record.
    fn clear(&self) -> StoreResult<()>;
}

pub trait WriteTransaction {
    /// Reads a value, including writes staged in this transaction. `None` when absent.
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Drops every record as part of this transaction; a rollback restores them.
    fn clear(&mut self) -> StoreResult<()>;

    fn commit(self) -> StoreResult<()>;

    fn rollback(self) -> StoreResult<()>;
}

pub trait ReadTransaction {
    /// Visits records in key order until the visitor stops or fails.
    fn scan<F, E>(&mut self, direction: ScanDirection, visit: F) -> std::result::Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> std::result::Result<ScanFlow, E>,
        E: From<StoreError>;

    fn finish(self) -> StoreResult<()>;
}
