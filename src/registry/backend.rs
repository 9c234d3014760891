use crate::db::{Connection, ConnectionPool};
use crate::storage::{MemoryStore, StorageResult, TransactionalStore};

/// Where a registry gets its store connections from.
///
/// Each operation takes one connection and drops it when it returns.
pub trait Backend {
    type Conn: TransactionalStore;

    fn connect(&self) -> StorageResult<Self::Conn>;
}

impl Backend for ConnectionPool {
    type Conn = Connection;

    fn connect(&self) -> StorageResult<Connection> {
        self.get()
    }
}

impl Backend for MemoryStore {
    type Conn = MemoryStore;

    fn connect(&self) -> StorageResult<MemoryStore> {
        Ok(self.clone())
    }
}
