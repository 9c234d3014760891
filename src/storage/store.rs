//! The persistence contract the registry is written against.
//!
//! [`Store`] is the row-level surface (get, query, upsert, delete) and is
//! object safe so transaction bodies can take `&mut dyn Store`.
//! [`TransactionalStore`] adds scoped transactions on top of it.

use std::collections::BTreeMap;

use crate::storage::blob::Row;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::query::{Query, RowIter};
use crate::storage::types::{RowKey, TableName};

/// row operations shared by connections, transactions and the memory store
pub trait Store {
    /// read one row by key
    fn get(&mut self, table: &TableName, key: &RowKey) -> StorageResult<Option<Row>>;

    /// run a query; the returned iterator tracks the scan position
    fn run(&mut self, query: &Query) -> StorageResult<RowIter>;

    /// insert the row, or replace the row stored under the same key
    fn save(&mut self, table: &TableName, row: Row) -> StorageResult<()>;

    /// delete one row, returning whether it existed
    fn delete(&mut self, table: &TableName, key: &RowKey) -> StorageResult<bool>;

    /// delete every row the query selects, returning how many were removed
    fn delete_all_matching(&mut self, query: &Query) -> StorageResult<usize> {
        let keys: Vec<RowKey> = self.run(query)?.map(|row| row.key).collect();
        let mut deleted = 0;
        for key in keys {
            if self.delete(&query.table, &key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// a store that can group row operations into one atomic unit
pub trait TransactionalStore: Store {
    /// run `f` inside a transaction
    ///
    /// writes made through the handed-out store become visible together when
    /// `f` returns `Ok`, and are discarded when it returns `Err`
    fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Store) -> Result<T, E>,
        E: From<StorageError>;
}

/// writes buffered by a transaction, keyed by table and row
///
/// `None` marks a deletion
#[derive(Debug, Clone, Default)]
pub struct StagedWrites {
    writes: BTreeMap<(TableName, RowKey), Option<Row>>,
}

impl StagedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, table: &TableName, row: Row) {
        self.writes.insert((table.clone(), row.key.clone()), Some(row));
    }

    pub fn remove(&mut self, table: &TableName, key: &RowKey) {
        self.writes.insert((table.clone(), key.clone()), None);
    }

    /// the staged state of a row: `None` if untouched, `Some(None)` if deleted
    pub fn lookup(&self, table: &TableName, key: &RowKey) -> Option<Option<&Row>> {
        self.writes
            .get(&(table.clone(), key.clone()))
            .map(|write| write.as_ref())
    }

    /// merge staged writes of `table` over rows read from the base snapshot
    ///
    /// the result stays in key order
    pub fn overlay(&self, table: &TableName, base: Vec<Row>) -> Vec<Row> {
        let mut merged: BTreeMap<RowKey, Row> = base.into_iter().map(|row| (row.key.clone(), row)).collect();

        for ((staged_table, key), write) in &self.writes {
            if staged_table != table {
                continue;
            }
            match write {
                Some(row) => {
                    merged.insert(key.clone(), row.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged.into_values().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableName, &RowKey, Option<&Row>)> {
        self.writes
            .iter()
            .map(|((table, key), write)| (table, key, write.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str) -> Row {
        Row::new(RowKey::new(key).unwrap(), BTreeMap::new())
    }

    #[test]
    fn test_overlay_applies_puts_and_deletes() {
        let specs = TableName::new("specs").unwrap();
        let blobs = TableName::new("blobs").unwrap();

        let mut staged = StagedWrites::new();
        staged.put(&specs, row("b"));
        staged.remove(&specs, &RowKey::new("c").unwrap());
        staged.put(&blobs, row("z"));

        let merged = staged.overlay(&specs, vec![row("a"), row("c"), row("d")]);
        let keys: Vec<&str> = merged.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "d"]);
        assert_eq!(staged.len(), 3);
    }

    #[test]
    fn test_lookup_distinguishes_deleted_from_untouched() {
        let specs = TableName::new("specs").unwrap();
        let mut staged = StagedWrites::new();
        staged.remove(&specs, &RowKey::new("gone").unwrap());

        assert_eq!(staged.lookup(&specs, &RowKey::new("gone").unwrap()), Some(None));
        assert_eq!(staged.lookup(&specs, &RowKey::new("other").unwrap()), None);
    }
}
