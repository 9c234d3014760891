//! storage layer for the registry
//!
//! this module provides the row store the registry persists into. The upper
//! layers (transactions, revision store, registry) use this API and never
//! touch git2 directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Store / TransactionalStore traits              │
//! │        (get, run, save, delete, delete_all_matching)        │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                              │
//!                 ▼                              ▼
//!  ┌─────────────────────────────┐   ┌────────────────────────┐
//!  │        GitRepository        │   │      MemoryStore       │
//!  │ (snapshot reads, batched    │   │  (in-process tables)   │
//!  │  commits on `main`)         │   └────────────────────────┘
//!  └─────────────────────────────┘
//!        │           │          │
//!        ▼           ▼          ▼
//!  ┌──────────┐ ┌──────────┐ ┌──────────┐
//!  │   tree   │ │   blob   │ │   refs   │
//!  │ (tables) │ │  (rows)  │ │  (main)  │
//!  └──────────┘ └──────────┘ └──────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use apiregistry::storage::{GitRepository, GitSignature, Query, Row, RowKey, StagedWrites, TableName};
//!
//! let repo = GitRepository::open_or_init("./registry", true, GitSignature::registry())?;
//! let projects = TableName::new("projects")?;
//!
//! let mut writes = StagedWrites::new();
//! writes.put(&projects, Row::new(RowKey::from_name("projects/demo")?, data));
//! let head = repo.apply(&writes, "[registry] create_project")?;
//!
//! let rows = Query::new(projects.clone()).execute(repo.scan_table(&projects, head)?);
//! ```

mod blob;
mod commit;
mod error;
mod memory;
mod query;
mod refs;
mod repository;
mod store;
mod tree;
mod types;

pub use blob::Row;
pub use commit::CommitInfo;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use query::{Query, RowIter};
pub use repository::GitRepository;
pub use store::{StagedWrites, Store, TransactionalStore};
pub use types::{BlobId, BranchName, CommitId, GitSignature, InvalidKeyError, RowKey, TableName, TreeId};
