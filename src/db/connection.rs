//! Connection pooling for store access.
//!
//! Every registry operation takes a [`Connection`] from the pool and gives it
//! back when the connection is dropped, on every exit path.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::config::DatabaseConfig;
use crate::storage::{
    GitRepository, Query, Row, RowIter, RowKey, StagedWrites, StorageError, StorageResult, Store, TableName,
    TransactionalStore,
};
use crate::transaction::TransactionManager;

/// A store connection from the pool.
///
/// Single-row writes outside [`TransactionalStore::transaction`] commit
/// immediately.
pub struct Connection {
    id: usize,
    manager: TransactionManager,
    pool: Option<Arc<ConnectionPoolInner>>,
}

impl Connection {
    /// Create a standalone connection (not from a pool).
    pub fn new(manager: TransactionManager) -> Self {
        Self {
            id: 0,
            manager,
            pool: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    fn autocommit(&self, writes: &StagedWrites, label: &str) -> StorageResult<()> {
        self.manager
            .repo()
            .apply(writes, &format!("[registry] {}", label))?;
        Ok(())
    }
}

impl Store for Connection {
    fn get(&mut self, table: &TableName, key: &RowKey) -> StorageResult<Option<Row>> {
        let repo = self.manager.repo();
        repo.read_row(table, key, repo.head()?)
    }

    fn run(&mut self, query: &Query) -> StorageResult<RowIter> {
        let repo = self.manager.repo();
        let rows = repo.scan_table(&query.table, repo.head()?)?;
        Ok(query.execute(rows))
    }

    fn save(&mut self, table: &TableName, row: Row) -> StorageResult<()> {
        let label = format!("save {}/{}", table, row.key);
        let mut writes = StagedWrites::new();
        writes.put(table, row);
        self.autocommit(&writes, &label)
    }

    fn delete(&mut self, table: &TableName, key: &RowKey) -> StorageResult<bool> {
        if self.get(table, key)?.is_none() {
            return Ok(false);
        }
        let mut writes = StagedWrites::new();
        writes.remove(table, key);
        self.autocommit(&writes, &format!("delete {}/{}", table, key))?;
        Ok(true)
    }

    fn delete_all_matching(&mut self, query: &Query) -> StorageResult<usize> {
        let mut writes = StagedWrites::new();
        for row in self.run(query)? {
            writes.remove(&query.table, &row.key);
        }
        let deleted = writes.len();
        self.autocommit(&writes, &format!("delete matching {}", query.table))?;
        Ok(deleted)
    }
}

impl TransactionalStore for Connection {
    fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Store) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut tx = self
            .manager
            .begin(format!("transaction on connection {}", self.id))
            .map_err(StorageError::from)?;

        match f(&mut tx) {
            Ok(result) => {
                self.manager.commit_transaction(tx).map_err(StorageError::from)?;
                Ok(result)
            }
            Err(e) => {
                self.manager.rollback_transaction(tx);
                Err(e)
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Return connection to pool if pooled.
        if let Some(ref pool) = self.pool {
            pool.available.lock().push_back(self.id);
        }
    }
}

struct ConnectionPoolInner {
    manager: TransactionManager,
    available: Mutex<VecDeque<usize>>,
    max_connections: usize,
    created: Mutex<usize>,
}

/// Connection pool for store access.
///
/// Clones share the same pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<ConnectionPoolInner>,
}

impl ConnectionPool {
    /// Open (or initialize) the repository and create a pool over it.
    pub fn open(config: &DatabaseConfig) -> StorageResult<Self> {
        let repo = GitRepository::open_or_init(&config.path, config.create_if_missing, config.signature.clone())?;
        let manager = TransactionManager::new(repo, config.transaction_timeout);
        Ok(Self::new(manager, config.max_connections))
    }

    /// Create a new connection pool over an existing transaction manager.
    pub fn new(manager: TransactionManager, max_connections: usize) -> Self {
        Self {
            inner: Arc::new(ConnectionPoolInner {
                manager,
                available: Mutex::new(VecDeque::new()),
                max_connections,
                created: Mutex::new(0),
            }),
        }
    }

    /// Get a connection from the pool.
    ///
    /// Fails with [`StorageError::Unavailable`] when every connection is in use.
    pub fn get(&self) -> StorageResult<Connection> {
        if let Some(id) = self.inner.available.lock().pop_front() {
            return Ok(self.connection(id));
        }

        {
            let mut created = self.inner.created.lock();
            if *created < self.inner.max_connections {
                *created += 1;
                return Ok(self.connection(*created));
            }
        }

        tracing::warn!(max = self.inner.max_connections, "connection pool exhausted");
        Err(StorageError::Unavailable(format!(
            "connection pool exhausted ({} in use)",
            self.inner.max_connections
        )))
    }

    fn connection(&self, id: usize) -> Connection {
        Connection {
            id,
            manager: self.inner.manager.clone(),
            pool: Some(self.inner.clone()),
        }
    }

    pub fn manager(&self) -> &TransactionManager {
        &self.inner.manager
    }

    /// Get the number of idle connections.
    pub fn available(&self) -> usize {
        self.inner.available.lock().len()
    }

    /// Get the total number of connections created.
    pub fn created(&self) -> usize {
        *self.inner.created.lock()
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("created", &self.created())
            .field("available", &self.available())
            .field("max_connections", &self.inner.max_connections)
            .finish()
    }
}
