//! Transaction context using typestate pattern.
//!
//! The typestate pattern ensures at compile time that transactions
//! are used correctly:
//! - Only active transactions can read and stage writes
//! - Committed/aborted transactions cannot be reused
//!
//! An active transaction reads from the commit `main` pointed at when it
//! began and keeps its writes in memory, so it always sees its own writes
//! and never sees a half-applied concurrent transaction.

use std::marker::PhantomData;
use std::time::{Duration, Instant};

use crate::storage::{
    CommitId, GitRepository, Query, Row, RowIter, RowKey, StagedWrites, StorageResult, Store, TableName,
};
use crate::transaction::error::TransactionResult;

/// Marker type for active transactions.
#[derive(Debug)]
pub struct TxActive;

/// Marker type for committed transactions.
#[derive(Debug)]
pub struct TxCommitted;

/// Marker type for aborted transactions.
#[derive(Debug)]
pub struct TxAborted;

/// Transaction metadata stored in the manager.
#[derive(Debug, Clone)]
pub struct TransactionMetadata {
    pub tx_id: String,
    /// snapshot the transaction reads from
    pub base_commit: CommitId,
    /// tip of `main` once committed; equals the base until then
    pub current_commit: CommitId,
    /// first line of the commit message
    pub label: String,
    pub started_at: Instant,
}

/// A registry transaction with typestate for lifecycle safety.
pub struct Transaction<State> {
    pub(crate) metadata: TransactionMetadata,
    pub(crate) repo: GitRepository,
    staged: StagedWrites,
    _state: PhantomData<State>,
}

impl<State> Transaction<State> {
    pub fn id(&self) -> &str {
        &self.metadata.tx_id
    }

    /// Get the transaction's base commit (where it started).
    pub fn base_commit(&self) -> CommitId {
        self.metadata.base_commit
    }

    pub fn elapsed(&self) -> Duration {
        self.metadata.started_at.elapsed()
    }

    fn into_state<Next>(self) -> Transaction<Next> {
        Transaction {
            metadata: self.metadata,
            repo: self.repo,
            staged: self.staged,
            _state: PhantomData,
        }
    }
}

impl Transaction<TxActive> {
    pub(crate) fn new(repo: GitRepository, tx_id: String, base_commit: CommitId, label: String) -> Self {
        Self {
            metadata: TransactionMetadata {
                tx_id,
                base_commit,
                current_commit: base_commit,
                label,
                started_at: Instant::now(),
            },
            repo,
            staged: StagedWrites::new(),
            _state: PhantomData,
        }
    }

    /// number of rows written or deleted so far
    pub fn pending_writes(&self) -> usize {
        self.staged.len()
    }

    fn commit_message(&self) -> String {
        format!(
            "[registry] {}\n\ntransaction: {}\nrows: {}",
            self.metadata.label,
            self.metadata.tx_id,
            self.staged.len()
        )
    }

    /// Commit the transaction.
    ///
    /// Staged writes are applied onto the current tip of `main`, not the base
    /// snapshot, so a concurrent committer never causes a conflict; the later
    /// commit wins.
    pub(crate) fn commit(mut self) -> TransactionResult<Transaction<TxCommitted>> {
        let message = self.commit_message();
        let new_head = self.repo.apply(&self.staged, &message)?;
        self.metadata.current_commit = new_head;
        Ok(self.into_state())
    }

    /// Rollback the transaction, discarding all staged writes.
    pub(crate) fn rollback(self) -> Transaction<TxAborted> {
        self.into_state()
    }
}

impl Store for Transaction<TxActive> {
    fn get(&mut self, table: &TableName, key: &RowKey) -> StorageResult<Option<Row>> {
        if let Some(staged) = self.staged.lookup(table, key) {
            return Ok(staged.cloned());
        }
        self.repo.read_row(table, key, self.metadata.base_commit)
    }

    fn run(&mut self, query: &Query) -> StorageResult<RowIter> {
        let base = self.repo.scan_table(&query.table, self.metadata.base_commit)?;
        Ok(query.execute(self.staged.overlay(&query.table, base)))
    }

    fn save(&mut self, table: &TableName, row: Row) -> StorageResult<()> {
        self.staged.put(table, row);
        Ok(())
    }

    fn delete(&mut self, table: &TableName, key: &RowKey) -> StorageResult<bool> {
        let existed = self.get(table, key)?.is_some();
        if existed {
            self.staged.remove(table, key);
        }
        Ok(existed)
    }
}

impl Transaction<TxCommitted> {
    /// tip of `main` after the commit
    pub fn final_commit(&self) -> CommitId {
        self.metadata.current_commit
    }
}

impl Transaction<TxAborted> {
    /// number of writes that were discarded
    pub fn discarded_writes(&self) -> usize {
        self.staged.len()
    }
}
