//! Transaction manager - coordinates all transaction operations.
//!
//! The TransactionManager is the main entry point for transactions.
//! It handles:
//! - Transaction creation and lifecycle
//! - Tracking active transactions
//! - Serializing commits to main and enforcing the timeout

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use ulid::Ulid;

use crate::storage::{CommitId, GitRepository};
use crate::transaction::context::{Transaction, TransactionMetadata, TxActive};
use crate::transaction::error::{TransactionError, TransactionResult};

/// Transaction manager - coordinates all transaction operations.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
#[derive(Clone)]
pub struct TransactionManager {
    inner: Arc<TransactionManagerInner>,
}

struct TransactionManagerInner {
    repo: GitRepository,
    /// Active transactions tracked by ID.
    active: RwLock<HashMap<String, TransactionMetadata>>,
    /// Mutex for serializing commits to main branch.
    commit_lock: Mutex<()>,
    /// transactions older than this are rolled back at commit time
    timeout: Duration,
}

impl TransactionManager {
    pub fn new(repo: GitRepository, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(TransactionManagerInner {
                repo,
                active: RwLock::new(HashMap::new()),
                commit_lock: Mutex::new(()),
                timeout,
            }),
        }
    }

    pub fn repo(&self) -> &GitRepository {
        &self.inner.repo
    }

    /// Begin a new transaction reading from the current tip of `main`.
    ///
    /// `label` becomes the summary line of the resulting commit.
    pub fn begin(&self, label: impl Into<String>) -> TransactionResult<Transaction<TxActive>> {
        let tx_id = Ulid::new().to_string().to_lowercase();
        let base_commit = self.inner.repo.head()?;

        let tx = Transaction::new(self.inner.repo.clone(), tx_id.clone(), base_commit, label.into());
        self.inner.active.write().insert(tx_id, tx.metadata.clone());

        tracing::trace!(tx_id = tx.id(), base = %base_commit.short(), "transaction started");
        Ok(tx)
    }

    pub fn active_count(&self) -> usize {
        self.inner.active.read().len()
    }

    pub fn is_active(&self, tx_id: &str) -> bool {
        self.inner.active.read().contains_key(tx_id)
    }

    fn mark_completed(&self, tx_id: &str) {
        self.inner.active.write().remove(tx_id);
    }

    /// Commit a transaction with serialization.
    ///
    /// A transaction that exceeded the timeout is rolled back instead.
    pub fn commit_transaction(&self, tx: Transaction<TxActive>) -> TransactionResult<CommitId> {
        let _guard = self.inner.commit_lock.lock();
        let tx_id = tx.id().to_string();

        let elapsed = tx.elapsed();
        if elapsed > self.inner.timeout {
            let aborted = tx.rollback();
            self.mark_completed(&tx_id);
            tracing::warn!(
                tx_id = %tx_id,
                discarded = aborted.discarded_writes(),
                elapsed_ms = elapsed.as_millis() as u64,
                "transaction timed out, rolled back"
            );
            return Err(TransactionError::Timeout {
                tx_id,
                elapsed_ms: elapsed.as_millis(),
            });
        }

        let result = tx.commit();
        self.mark_completed(&tx_id);

        let committed = result?;
        tracing::debug!(tx_id = %tx_id, head = %committed.final_commit().short(), "transaction committed");
        Ok(committed.final_commit())
    }

    /// Rollback a transaction.
    pub fn rollback_transaction(&self, tx: Transaction<TxActive>) {
        let tx_id = tx.id().to_string();
        let aborted = tx.rollback();
        self.mark_completed(&tx_id);
        tracing::debug!(tx_id = %tx_id, discarded = aborted.discarded_writes(), "transaction rolled back");
    }

    /// Execute a function within a transaction, automatically committing or rolling back.
    ///
    /// If the function returns Ok, the transaction is committed.
    /// If the function returns Err, the transaction is rolled back.
    pub fn with_transaction<F, T, E>(&self, label: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<TxActive>) -> Result<T, E>,
        E: From<TransactionError>,
    {
        let mut tx = self.begin(label)?;

        match f(&mut tx) {
            Ok(result) => {
                self.commit_transaction(tx)?;
                Ok(result)
            }
            Err(e) => {
                self.rollback_transaction(tx);
                Err(e)
            }
        }
    }

    /// Get current head of main branch.
    pub fn head(&self) -> TransactionResult<CommitId> {
        self.inner.repo.head().map_err(TransactionError::from)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("active_count", &self.active_count())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    use crate::storage::{GitSignature, Row, RowKey, Store, TableName};

    fn setup(timeout: Duration) -> (TempDir, TransactionManager) {
        let dir = TempDir::new().unwrap();
        let repo = GitRepository::init(dir.path(), GitSignature::registry()).unwrap();
        (dir, TransactionManager::new(repo, timeout))
    }

    fn row(key: &str, value: i64) -> Row {
        let mut data = BTreeMap::new();
        data.insert("value".to_string(), Value::from(value));
        Row::new(RowKey::new(key).unwrap(), data)
    }

    #[test]
    fn test_begin_and_commit() {
        let (_dir, manager) = setup(Duration::from_secs(30));
        let table = TableName::new("projects").unwrap();

        let mut tx = manager.begin("create_project").unwrap();
        assert!(manager.is_active(tx.id()));
        tx.save(&table, row("projects~p1", 1)).unwrap();

        let head = manager.commit_transaction(tx).unwrap();
        assert_eq!(manager.active_count(), 0);

        let info = manager.repo().get_commit(head).unwrap();
        assert_eq!(info.summary(), "[registry] create_project");
    }

    #[test]
    fn test_with_transaction_rollback_on_error() {
        let (_dir, manager) = setup(Duration::from_secs(30));
        let table = TableName::new("projects").unwrap();
        let before = manager.head().unwrap();

        let result: TransactionResult<()> = manager.with_transaction("failing", |tx| {
            tx.save(&table, row("projects~p1", 1))?;
            Err(TransactionError::Internal("test error".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(manager.head().unwrap(), before);
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn test_concurrent_commits_last_writer_wins() {
        let (_dir, manager) = setup(Duration::from_secs(30));
        let table = TableName::new("counter").unwrap();
        let key = RowKey::new("shared").unwrap();

        let mut tx1 = manager.begin("first").unwrap();
        let mut tx2 = manager.begin("second").unwrap();
        tx1.save(&table, row("shared", 1)).unwrap();
        tx1.save(&table, row("only_first", 1)).unwrap();
        tx2.save(&table, row("shared", 2)).unwrap();

        manager.commit_transaction(tx1).unwrap();
        let head = manager.commit_transaction(tx2).unwrap();

        let repo = manager.repo();
        let shared = repo.read_row(&table, &key, head).unwrap().unwrap();
        assert_eq!(shared.get("value"), Some(&Value::from(2)));
        assert_eq!(shared.version, 2);
        assert!(repo
            .read_row(&table, &RowKey::new("only_first").unwrap(), head)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_timeout_rolls_back() {
        let (_dir, manager) = setup(Duration::ZERO);
        let table = TableName::new("projects").unwrap();
        let before = manager.head().unwrap();

        let mut tx = manager.begin("slow").unwrap();
        tx.save(&table, row("projects~p1", 1)).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let result = manager.commit_transaction(tx);
        assert!(matches!(result, Err(TransactionError::Timeout { .. })));
        assert_eq!(manager.head().unwrap(), before);
        assert_eq!(manager.active_count(), 0);
    }
}
