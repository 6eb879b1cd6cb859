//! In-memory ordered store for tests and ephemeral runs.

use super::{ReadTransaction, ScanDirection, ScanFlow, Store, StoreError, StoreResult, WriteTransaction};

use std::collections::BTreeMap;

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

type Records = BTreeMap<Vec<u8>, Vec<u8>>;

/// An in-memory store backed by a `BTreeMap`.
///
/// Writes are staged in the transaction and applied under the map's write lock on
/// commit, so readers never observe a half-applied batch. A read transaction holds
/// the read lock for its whole lifetime, which also keeps commits out until it ends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
    writer: Mutex<()>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    type Writer<'a> = MemoryWriteTransaction<'a>
    where
        Self: 'a;

    type Reader<'a> = MemoryReadTransaction<'a>
    where
        Self: 'a;

    fn begin_write(&self) -> StoreResult<MemoryWriteTransaction<'_>> {
        Ok(MemoryWriteTransaction {
            store: self,
            _writer: self.writer.lock(),
            staged: Records::new(),
            cleared: false,
        })
    }

    fn begin_read(&self) -> StoreResult<MemoryReadTransaction<'_>> {
        Ok(MemoryReadTransaction {
            records: self.records.read(),
        })
    }

    fn clear(&self) -> StoreResult<()> {
        let _writer = self.writer.lock();
        self.records.write().clear();
        Ok(())
    }
}

pub struct MemoryWriteTransaction<'a> {
    store: &'a MemoryStore,
    _writer: MutexGuard<'a, ()>,
    staged: Records,
    /// Committed records are hidden from `get` and dropped on commit
    cleared: bool,
}

impl WriteTransaction for MemoryWriteTransaction<'_> {
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if let Some(value) = self.staged.get(key) {
            return Ok(Some(value.clone()));
        }

        if self.cleared {
            return Ok(None);
        }

        Ok(self.store.records.read().get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.staged.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.staged.clear();
        self.cleared = true;
        Ok(())
    }

    fn commit(self) -> StoreResult<()> {
        log::debug!(
            "Committing {} staged records (cleared: {})",
            self.staged.len(),
            self.cleared
        );

        let mut records = self.store.records.write();

        if self.cleared {
            records.clear();
        }

        records.extend(self.staged);
        Ok(())
    }

    fn rollback(self) -> StoreResult<()> {
        log::debug!("Discarding {} staged records", self.staged.len());
        Ok(())
    }
}

pub struct MemoryReadTransaction<'a> {
    records: RwLockReadGuard<'a, Records>,
}

impl ReadTransaction for MemoryReadTransaction<'_> {
    fn scan<F, E>(&mut self, direction: ScanDirection, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<ScanFlow, E>,
        E: From<StoreError>,
    {
        let records: Box<dyn Iterator<Item = (&Vec<u8>, &Vec<u8>)>> = match direction {
            ScanDirection::Forward => Box::new(self.records.iter()),
            ScanDirection::Reverse => Box::new(self.records.iter().rev()),
        };

        for (key, value) in records {
            if visit(key, value)? == ScanFlow::Stop {
                break;
            }
        }

        Ok(())
    }

    fn finish(self) -> StoreResult<()> {
        Ok(())
    }
}
