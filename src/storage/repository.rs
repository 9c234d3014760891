//! Core Git repository wrapper.
//!
//! This is the central component of the storage layer. It wraps
//! `git2::Repository` with thread-safe access and provides the snapshot reads
//! and batched writes the transaction layer is built on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::Repository;
use parking_lot::Mutex;

use crate::storage::blob::{self, Row};
use crate::storage::commit::{self, CommitBuilder, CommitInfo};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::refs::RefManager;
use crate::storage::store::StagedWrites;
use crate::storage::tree::TreeMutator;
use crate::storage::types::{BranchName, CommitId, GitSignature, RowKey, TableName};

/// attempts to advance `main` before giving up on an external writer
const APPLY_ATTEMPTS: usize = 3;

/// The main Git repository wrapper.
///
/// Clone this to share across threads - it uses Arc internally.
#[derive(Clone)]
pub struct GitRepository {
    inner: Arc<GitRepositoryInner>,
}

struct GitRepositoryInner {
    // git2::Repository is Send but not Sync
    repo: Mutex<Repository>,
    path: PathBuf,
    signature: GitSignature,
}

impl GitRepository {
    /// Open an existing repository.
    pub fn open(path: impl AsRef<Path>, signature: GitSignature) -> StorageResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| StorageError::NotInitialized(path.to_path_buf()))?;

        let storage = Self::wrap(repo, path, signature);
        storage.with_repo(|repo| {
            if !RefManager::branch_exists(repo, &BranchName::main()) {
                return Err(StorageError::RefNotFound(BranchName::MAIN.to_string()));
            }
            Ok(())
        })?;
        Ok(storage)
    }

    /// Initialize a new repository with an empty root commit on `main`.
    pub fn init(path: impl AsRef<Path>, signature: GitSignature) -> StorageResult<Self> {
        let path = path.as_ref();
        let repo = Repository::init(path)?;
        let storage = Self::wrap(repo, path, signature);

        storage.with_repo(|repo| {
            let commit_id = commit::create_initial_commit(repo, &storage.inner.signature)?;
            RefManager::init_main_branch(repo, commit_id)
        })?;

        tracing::info!(path = %path.display(), "initialized registry repository");
        Ok(storage)
    }

    /// Open the repository at `path`, initializing it when missing and allowed.
    pub fn open_or_init(path: impl AsRef<Path>, create_if_missing: bool, signature: GitSignature) -> StorageResult<Self> {
        let path = path.as_ref();
        if path.join(".git").exists() || path.join("HEAD").exists() {
            Self::open(path, signature)
        } else if create_if_missing {
            Self::init(path, signature)
        } else {
            Err(StorageError::NotInitialized(path.to_path_buf()))
        }
    }

    fn wrap(repo: Repository, path: &Path, signature: GitSignature) -> Self {
        Self {
            inner: Arc::new(GitRepositoryInner {
                repo: Mutex::new(repo),
                path: path.to_path_buf(),
                signature,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Execute a function with exclusive access to the repository.
    pub fn with_repo<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Repository) -> StorageResult<T>,
    {
        let repo = self.inner.repo.lock();
        f(&repo)
    }

    /// Get the current tip of the main branch.
    pub fn head(&self) -> StorageResult<CommitId> {
        self.with_repo(|repo| RefManager::resolve_branch(repo, &BranchName::main()))
    }

    pub fn get_commit(&self, id: CommitId) -> StorageResult<CommitInfo> {
        self.with_repo(|repo| commit::get_commit(repo, id))
    }

    /// Read a row from a table.
    pub fn read_row(&self, table: &TableName, key: &RowKey, at: CommitId) -> StorageResult<Option<Row>> {
        self.with_repo(|repo| {
            let tree = commit::get_tree_at_commit(repo, at)?;
            let Some(blob_id) = tree.get_row_blob_id(repo, table, key)? else {
                return Ok(None);
            };
            let bytes = blob::read_blob(repo, blob_id)?;
            Ok(Some(blob::deserialize_row(&bytes, key)?))
        })
    }

    /// Read every row of a table in key order.
    ///
    /// Rows whose blob cannot be decoded are skipped with a warning.
    pub fn scan_table(&self, table: &TableName, at: CommitId) -> StorageResult<Vec<Row>> {
        self.with_repo(|repo| {
            let tree = commit::get_tree_at_commit(repo, at)?;
            let mut rows = Vec::new();
            for (key, blob_id) in tree.list_rows(repo, table)? {
                let bytes = blob::read_blob(repo, blob_id)?;
                match blob::deserialize_row(&bytes, &key) {
                    Ok(row) => rows.push(row),
                    Err(e) => tracing::warn!(%table, %key, error = %e, "skipping undecodable row"),
                }
            }
            Ok(rows)
        })
    }

    /// Apply staged writes onto the current tip of `main` as one commit.
    ///
    /// Rows that replace an existing row keep its insertion time and bump its
    /// write counter. Returns the new tip, or the unchanged tip when nothing
    /// was staged.
    pub fn apply(&self, writes: &StagedWrites, message: &str) -> StorageResult<CommitId> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_apply(writes, message) {
                Err(e) if e.is_retriable() && attempt < APPLY_ATTEMPTS => {
                    tracing::debug!(attempt, "main moved during apply, retrying");
                }
                result => return result,
            }
        }
    }

    fn try_apply(&self, writes: &StagedWrites, message: &str) -> StorageResult<CommitId> {
        self.with_repo(|repo| {
            let main = BranchName::main();
            let head = RefManager::resolve_branch(repo, &main)?;
            if writes.is_empty() {
                return Ok(head);
            }

            let tree = commit::get_tree_at_commit(repo, head)?;
            let mut mutator = TreeMutator::from_tree(repo, &tree)?;

            for (table, key, write) in writes.iter() {
                match write {
                    Some(row) => {
                        let row = match tree.get_row_blob_id(repo, table, key)? {
                            Some(existing_id) => {
                                let existing = blob::deserialize_row(&blob::read_blob(repo, existing_id)?, key)?;
                                row.clone().replacing(&existing)
                            }
                            None => row.clone(),
                        };
                        let blob_id = blob::write_blob(repo, &row)?;
                        mutator.upsert_row(table, key, blob_id)?;
                    }
                    None => mutator.delete_row(table, key)?,
                }
            }

            let new_tree_id = mutator.write()?;
            if new_tree_id == tree.id() {
                return Ok(head);
            }

            let new_commit = CommitBuilder::new(repo)
                .tree(new_tree_id)
                .parent(head)
                .message(message)
                .signature(self.inner.signature.clone())
                .commit()?;

            RefManager::update_branch_if_unchanged(repo, &main, head, new_commit)?;
            Ok(new_commit)
        })
    }
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("path", &self.inner.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn setup() -> (TempDir, GitRepository) {
        let dir = TempDir::new().unwrap();
        let repo = GitRepository::init(dir.path(), GitSignature::registry()).unwrap();
        (dir, repo)
    }

    fn row(key: &str, value: i64) -> Row {
        let mut data = BTreeMap::new();
        data.insert("value".to_string(), Value::from(value));
        Row::new(RowKey::new(key).unwrap(), data)
    }

    #[test]
    fn test_apply_writes_one_commit() {
        let (_dir, repo) = setup();
        let table = TableName::new("projects").unwrap();
        let before = repo.head().unwrap();

        let mut writes = StagedWrites::new();
        writes.put(&table, row("projects~p1", 1));
        writes.put(&table, row("projects~p2", 2));
        let after = repo.apply(&writes, "[registry] create").unwrap();

        assert_ne!(before, after);
        assert_eq!(repo.get_commit(after).unwrap().first_parent(), Some(before));
        assert_eq!(repo.scan_table(&table, after).unwrap().len(), 2);
        assert!(repo.scan_table(&table, before).unwrap().is_empty());
    }

    #[test]
    fn test_apply_replacing_bumps_version() {
        let (_dir, repo) = setup();
        let table = TableName::new("projects").unwrap();
        let key = RowKey::new("projects~p1").unwrap();

        let mut writes = StagedWrites::new();
        writes.put(&table, row("projects~p1", 1));
        let first = repo.apply(&writes, "first").unwrap();
        let created = repo.read_row(&table, &key, first).unwrap().unwrap();

        let mut writes = StagedWrites::new();
        writes.put(&table, row("projects~p1", 2));
        let second = repo.apply(&writes, "second").unwrap();
        let replaced = repo.read_row(&table, &key, second).unwrap().unwrap();

        assert_eq!(replaced.version, 2);
        assert_eq!(replaced.created_at, created.created_at);
        assert_eq!(replaced.get("value"), Some(&Value::from(2)));
    }

    #[test]
    fn test_apply_nothing_keeps_head() {
        let (_dir, repo) = setup();
        let head = repo.head().unwrap();
        assert_eq!(repo.apply(&StagedWrites::new(), "noop").unwrap(), head);
    }

    #[test]
    fn test_apply_delete() {
        let (_dir, repo) = setup();
        let table = TableName::new("blobs").unwrap();
        let key = RowKey::new("b1").unwrap();

        let mut writes = StagedWrites::new();
        writes.put(&table, row("b1", 1));
        repo.apply(&writes, "put").unwrap();

        let mut writes = StagedWrites::new();
        writes.remove(&table, &key);
        let head = repo.apply(&writes, "delete").unwrap();

        assert_eq!(repo.read_row(&table, &key, head).unwrap(), None);
    }

    #[test]
    fn test_open_or_init() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GitRepository::open_or_init(dir.path(), false, GitSignature::registry()),
            Err(StorageError::NotInitialized(_))
        ));

        let created = GitRepository::open_or_init(dir.path(), true, GitSignature::registry()).unwrap();
        let head = created.head().unwrap();
        drop(created);

        let reopened = GitRepository::open_or_init(dir.path(), false, GitSignature::registry()).unwrap();
        assert_eq!(reopened.head().unwrap(), head);
    }
}
