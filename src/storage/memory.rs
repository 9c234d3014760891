//! In-process store.
//!
//! Holds tables in memory behind a shared lock. Transactions read a snapshot
//! of the tables and stage their writes, which are applied in one step on
//! success, mirroring the git-backed connection.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::blob::Row;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::query::{Query, RowIter};
use crate::storage::store::{StagedWrites, Store, TransactionalStore};
use crate::storage::types::{RowKey, TableName};

type Tables = BTreeMap<TableName, BTreeMap<RowKey, Row>>;

/// a store kept entirely in memory
///
/// clones share the same tables
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of rows currently stored in `table`
    pub fn row_count(&self, table: &TableName) -> usize {
        self.tables.lock().get(table).map_or(0, BTreeMap::len)
    }

    fn apply(&self, writes: &StagedWrites) {
        let mut tables = self.tables.lock();
        for (table, key, write) in writes.iter() {
            let rows = tables.entry(table.clone()).or_default();
            match write {
                Some(row) => {
                    let row = match rows.get(key) {
                        Some(existing) => row.clone().replacing(existing),
                        None => row.clone(),
                    };
                    rows.insert(key.clone(), row);
                }
                None => {
                    rows.remove(key);
                }
            }
        }
    }
}

impl Store for MemoryStore {
    fn get(&mut self, table: &TableName, key: &RowKey) -> StorageResult<Option<Row>> {
        Ok(self.tables.lock().get(table).and_then(|rows| rows.get(key)).cloned())
    }

    fn run(&mut self, query: &Query) -> StorageResult<RowIter> {
        let rows: Vec<Row> = self
            .tables
            .lock()
            .get(&query.table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        Ok(query.execute(rows))
    }

    fn save(&mut self, table: &TableName, row: Row) -> StorageResult<()> {
        let mut writes = StagedWrites::new();
        writes.put(table, row);
        self.apply(&writes);
        Ok(())
    }

    fn delete(&mut self, table: &TableName, key: &RowKey) -> StorageResult<bool> {
        Ok(self
            .tables
            .lock()
            .get_mut(table)
            .and_then(|rows| rows.remove(key))
            .is_some())
    }
}

impl TransactionalStore for MemoryStore {
    fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Store) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut tx = MemoryTransaction {
            snapshot: self.tables.lock().clone(),
            staged: StagedWrites::new(),
        };

        let result = f(&mut tx)?;
        self.apply(&tx.staged);
        Ok(result)
    }
}

/// an open transaction over a [`MemoryStore`] snapshot
struct MemoryTransaction {
    snapshot: Tables,
    staged: StagedWrites,
}

impl Store for MemoryTransaction {
    fn get(&mut self, table: &TableName, key: &RowKey) -> StorageResult<Option<Row>> {
        if let Some(staged) = self.staged.lookup(table, key) {
            return Ok(staged.cloned());
        }
        Ok(self.snapshot.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    fn run(&mut self, query: &Query) -> StorageResult<RowIter> {
        let base: Vec<Row> = self
            .snapshot
            .get(&query.table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        Ok(query.execute(self.staged.overlay(&query.table, base)))
    }

    fn save(&mut self, table: &TableName, row: Row) -> StorageResult<()> {
        self.staged.put(table, row);
        Ok(())
    }

    fn delete(&mut self, table: &TableName, key: &RowKey) -> StorageResult<bool> {
        let existed = self.get(table, key)?.is_some();
        self.staged.remove(table, key);
        Ok(existed)
    }
}
