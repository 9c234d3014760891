//! Transactions over the git store.
//!
//! A transaction reads from the commit `main` pointed at when it began and
//! stages its writes in memory. Committing applies the staged writes onto the
//! current tip of `main` as a single commit; rolling back drops them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TransactionManager                        │
//! │   (begins transactions, serializes commits, timeouts)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                 ┌─────────────────────────┐
//!                 │  Transaction<TxActive>  │
//!                 │  snapshot + StagedWrites│
//!                 └─────────────────────────┘
//!                      │               │
//!               commit ▼               ▼ rollback
//!      Transaction<TxCommitted>   Transaction<TxAborted>
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use apiregistry::storage::Store;
//! use apiregistry::transaction::TransactionManager;
//!
//! let manager = TransactionManager::new(repo, Duration::from_secs(30));
//!
//! manager.with_transaction("create_project", |tx| {
//!     tx.save(&projects, row)?;
//!     Ok::<_, TransactionError>(())
//! })?;
//! ```

mod context;
mod error;
mod manager;

pub use context::{Transaction, TransactionMetadata, TxAborted, TxActive, TxCommitted};
pub use error::{TransactionError, TransactionResult};
pub use manager::TransactionManager;
