//! tree operations for table management.
//!
//! in Git, a tree is a directory. In the registry store:
//! - the root tree contains one directory per table
//! - each table directory contains row blobs (`{key}.json`)
//!
//! Tables are created on first write and read as empty while absent, so a
//! fresh repository starts from an empty root tree.

use std::collections::HashMap;

use git2::{FileMode, ObjectType, Repository, Tree, TreeBuilder as Git2TreeBuilder};

use crate::storage::blob::BlobId;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{RowKey, TableName, TreeId};

/// A read only handle to a git tree at a specific commit
///
/// think of it as a snapshot - it won't change even if new commits are made.
#[derive(Debug)]
pub struct TreeHandle<'repo> {
    tree: Tree<'repo>,
}

impl<'repo> TreeHandle<'repo> {
    pub(crate) fn new(tree: Tree<'repo>) -> Self {
        Self { tree }
    }

    pub fn id(&self) -> TreeId {
        TreeId::new(self.tree.id())
    }

    pub(crate) fn inner(&self) -> &Tree<'repo> {
        &self.tree
    }

    /// list all tables (top-level directories)
    pub fn list_tables(&self) -> Vec<TableName> {
        self.tree
            .iter()
            .filter(|entry| entry.kind() == Some(ObjectType::Tree))
            .filter_map(|entry| TableName::new(entry.name()?).ok())
            .collect()
    }

    fn table_tree(&self, repo: &'repo Repository, table: &TableName) -> StorageResult<Option<Tree<'repo>>> {
        match self.tree.get_name(table.as_str()) {
            Some(entry) => {
                if entry.kind() != Some(ObjectType::Tree) {
                    return Err(StorageError::UnexpectedEntryType {
                        path: table.as_str().into(),
                        expected: "tree (directory)".to_string(),
                        found: format!("{:?}", entry.kind()),
                    });
                }
                Ok(Some(repo.find_tree(entry.id())?))
            }
            None => Ok(None),
        }
    }

    /// list every row in a table as `(key, blob)` pairs, sorted by key
    ///
    /// a table that was never written is empty
    pub fn list_rows(&self, repo: &'repo Repository, table: &TableName) -> StorageResult<Vec<(RowKey, BlobId)>> {
        let Some(table_tree) = self.table_tree(repo, table)? else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<(RowKey, BlobId)> = table_tree
            .iter()
            .filter(|entry| entry.kind() == Some(ObjectType::Blob))
            .filter_map(|entry| {
                let key = entry.name()?.strip_suffix(".json")?;
                Some((RowKey::new(key).ok()?, BlobId::new(entry.id())))
            })
            .collect();

        // git orders entries by file name, `.json` included
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }

    /// get the blob ID for a specific row
    pub fn get_row_blob_id(
        &self,
        repo: &'repo Repository,
        table: &TableName,
        key: &RowKey,
    ) -> StorageResult<Option<BlobId>> {
        let Some(table_tree) = self.table_tree(repo, table)? else {
            return Ok(None);
        };

        let filename = format!("{}.json", key);
        let result = match table_tree.get_name(&filename) {
            Some(entry) if entry.kind() == Some(ObjectType::Blob) => Ok(Some(BlobId::new(entry.id()))),
            Some(entry) => Err(StorageError::UnexpectedEntryType {
                path: format!("{}/{}", table, filename).into(),
                expected: "blob (file)".to_string(),
                found: format!("{:?}", entry.kind()),
            }),
            None => Ok(None),
        };
        result
    }
}

/// a mutable tree builder for making changes
///
/// collects row changes and produces a new root tree when written;
/// the original tree is not modified
///
/// ```ignore
/// let mut builder = TreeMutator::from_tree(repo, &tree)?;
/// builder.upsert_row(&specs, &key, blob_id)?;
/// builder.delete_row(&blobs, &key)?;
/// let new_tree_id = builder.write()?;
/// ```
pub struct TreeMutator<'repo> {
    repo: &'repo Repository,
    root_builder: Git2TreeBuilder<'repo>,
    /// builders for tables touched so far
    modified_tables: HashMap<String, Git2TreeBuilder<'repo>>,
    /// table tree IDs from the base tree
    original_tables: HashMap<String, git2::Oid>,
}

impl<'repo> TreeMutator<'repo> {
    /// create a new TreeMutator from an existing tree
    pub fn from_tree(repo: &'repo Repository, tree: &TreeHandle<'_>) -> StorageResult<Self> {
        let root_builder = repo.treebuilder(Some(tree.inner()))?;

        let original_tables = tree
            .inner()
            .iter()
            .filter(|entry| entry.kind() == Some(ObjectType::Tree))
            .filter_map(|entry| Some((entry.name()?.to_string(), entry.id())))
            .collect();

        Ok(Self {
            repo,
            root_builder,
            modified_tables: HashMap::new(),
            original_tables,
        })
    }

    /// create a new TreeMutator for an empty tree
    pub fn empty(repo: &'repo Repository) -> StorageResult<Self> {
        Ok(Self {
            repo,
            root_builder: repo.treebuilder(None)?,
            modified_tables: HashMap::new(),
            original_tables: HashMap::new(),
        })
    }

    fn table_builder(&mut self, table: &str) -> StorageResult<&mut Git2TreeBuilder<'repo>> {
        if !self.modified_tables.contains_key(table) {
            let builder = match self.original_tables.get(table) {
                Some(original_id) => {
                    let original_tree = self.repo.find_tree(*original_id)?;
                    self.repo.treebuilder(Some(&original_tree))?
                }
                None => self.repo.treebuilder(None)?,
            };
            self.modified_tables.insert(table.to_string(), builder);
        }
        self.modified_tables
            .get_mut(table)
            .ok_or_else(|| StorageError::Internal(format!("missing builder for table {}", table)))
    }

    /// insert or update a row, creating the table on first use
    pub fn upsert_row(&mut self, table: &TableName, key: &RowKey, blob_id: BlobId) -> StorageResult<()> {
        let filename = format!("{}.json", key);
        self.table_builder(table.as_str())?
            .insert(&filename, blob_id.raw(), FileMode::Blob.into())?;
        Ok(())
    }

    /// delete a row from a table
    ///
    /// removing a row that is not there is a no-op; callers check existence
    /// against their own snapshot
    pub fn delete_row(&mut self, table: &TableName, key: &RowKey) -> StorageResult<()> {
        if !self.modified_tables.contains_key(table.as_str()) && !self.original_tables.contains_key(table.as_str()) {
            return Ok(());
        }

        let filename = format!("{}.json", key);
        let builder = self.table_builder(table.as_str())?;
        if builder.get(&filename)?.is_some() {
            builder.remove(&filename)?;
        }
        Ok(())
    }

    /// write all changes and return the new root tree ID
    ///
    /// tables left without rows are removed from the root
    pub fn write(mut self) -> StorageResult<TreeId> {
        for (table_name, table_builder) in self.modified_tables {
            if table_builder.is_empty() {
                if self.root_builder.get(&table_name)?.is_some() {
                    self.root_builder.remove(&table_name)?;
                }
                continue;
            }
            let table_tree_id = table_builder.write()?;
            self.root_builder
                .insert(&table_name, table_tree_id, FileMode::Tree.into())?;
        }

        let root_id = self.root_builder.write()?;
        Ok(TreeId::new(root_id))
    }
}

/// create the empty root tree a fresh repository starts from
pub fn create_initial_tree(repo: &Repository) -> StorageResult<TreeId> {
    TreeMutator::empty(repo)?.write()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    fn handle(repo: &Repository, id: TreeId) -> TreeHandle<'_> {
        TreeHandle::new(repo.find_tree(id.raw()).unwrap())
    }

    #[test]
    fn test_initial_tree_has_no_tables() {
        let (_dir, repo) = setup_repo();
        let tree_id = create_initial_tree(&repo).unwrap();
        let tree = handle(&repo, tree_id);

        assert!(tree.list_tables().is_empty());
        let specs = TableName::new("specs").unwrap();
        assert!(tree.list_rows(&repo, &specs).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_creates_table_and_sorts_rows() {
        let (_dir, repo) = setup_repo();
        let tree_id = create_initial_tree(&repo).unwrap();
        let tree = handle(&repo, tree_id);

        let table = TableName::new("specs").unwrap();
        let blob_id = BlobId::new(repo.blob(b"{}").unwrap());

        let mut mutator = TreeMutator::from_tree(&repo, &tree).unwrap();
        for key in ["s2", "s1@bbbbbbbb", "s1"] {
            mutator.upsert_row(&table, &RowKey::new(key).unwrap(), blob_id).unwrap();
        }
        let tree = handle(&repo, mutator.write().unwrap());

        assert_eq!(tree.list_tables(), vec![table.clone()]);
        let keys: Vec<String> = tree
            .list_rows(&repo, &table)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k.as_str().to_string())
            .collect();
        assert_eq!(keys, vec!["s1", "s1@bbbbbbbb", "s2"]);
    }

    #[test]
    fn test_delete_last_row_drops_table() {
        let (_dir, repo) = setup_repo();
        let tree = handle(&repo, create_initial_tree(&repo).unwrap());

        let table = TableName::new("blobs").unwrap();
        let key = RowKey::new("row1").unwrap();
        let blob_id = BlobId::new(repo.blob(b"test").unwrap());

        let mut mutator = TreeMutator::from_tree(&repo, &tree).unwrap();
        mutator.upsert_row(&table, &key, blob_id).unwrap();
        let tree = handle(&repo, mutator.write().unwrap());
        assert_eq!(tree.get_row_blob_id(&repo, &table, &key).unwrap(), Some(blob_id));

        let mut mutator = TreeMutator::from_tree(&repo, &tree).unwrap();
        mutator.delete_row(&table, &key).unwrap();
        mutator.delete_row(&table, &key).unwrap();
        let tree = handle(&repo, mutator.write().unwrap());

        assert!(tree.list_tables().is_empty());
        assert_eq!(tree.get_row_blob_id(&repo, &table, &key).unwrap(), None);
    }
}
