//! Building blocks for cascading deletes.
//!
//! Each function commits one transaction. Deleting a project, api or version
//! chains them from the leaves up so the parent row goes last, which keeps a
//! half-finished cascade repeatable.

use std::collections::BTreeSet;

use super::{RevisionResult, Revisioned};
use crate::models::{Artifact, Blob, Model};
use crate::storage::{Query, RowKey, TransactionalStore};

fn select<M: Model>(filters: &[(&'static str, String)]) -> RevisionResult<Query> {
    let mut query = Query::new(M::table()?);
    for (field, id) in filters {
        query = query.require(*field, id.clone());
    }
    Ok(query)
}

/// delete the artifacts matching `filters` and their contents
pub fn delete_artifacts<S: TransactionalStore>(
    store: &mut S,
    filters: &[(&'static str, String)],
) -> RevisionResult<usize> {
    let query = select::<Artifact>(filters)?;
    let deleted = store.transaction(|tx| {
        let keys: Vec<RowKey> = tx.run(&query)?.map(|row| row.key).collect();
        let (artifacts, blobs) = (Artifact::table()?, Blob::table()?);
        for key in &keys {
            tx.delete(&artifacts, key)?;
            tx.delete(&blobs, key)?;
        }
        Ok::<_, super::RevisionError>(keys.len())
    })?;

    if deleted > 0 {
        tracing::debug!(count = deleted, "deleted artifacts");
    }
    Ok(deleted)
}

/// logical names of the `R` resources matching `filters`
pub fn children<R, S>(store: &mut S, filters: &[(&'static str, String)]) -> RevisionResult<Vec<R::Name>>
where
    R: Revisioned,
    S: TransactionalStore,
{
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    for row in store.run(&select::<R>(filters)?)? {
        let revision = match R::from_row(&row) {
            Ok(revision) => revision,
            Err(e) => {
                tracing::warn!(key = %row.key, error = %e, "skipping undecodable revision");
                continue;
            }
        };
        let name = revision.logical_name();
        if seen.insert(name.to_string()) {
            names.push(name);
        }
    }
    Ok(names)
}

/// delete every `M` row matching `filters`
pub fn delete_rows<M: Model, S: TransactionalStore>(
    store: &mut S,
    filters: &[(&'static str, String)],
) -> RevisionResult<usize> {
    let query = select::<M>(filters)?;
    store.transaction(|tx| Ok::<_, super::RevisionError>(tx.delete_all_matching(&query)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Spec;
    use crate::names::{ArtifactName, ResourceName, SpecName, VersionName};
    use crate::storage::{MemoryStore, Store};

    fn save_artifact(store: &mut MemoryStore, name: &str) {
        let name: ArtifactName = name.parse().unwrap();
        let artifact = Artifact::new(&name, "text/plain", b"x").unwrap();
        let blob = Blob::new(name.to_string(), "text/plain", b"x".to_vec()).unwrap();
        store.save(&Artifact::table().unwrap(), artifact.to_row().unwrap()).unwrap();
        store.save(&Blob::table().unwrap(), blob.to_row().unwrap()).unwrap();
    }

    #[test]
    fn test_delete_artifacts_below_a_version() {
        let mut store = MemoryStore::new();
        save_artifact(&mut store, "projects/p1/artifacts/keep");
        save_artifact(&mut store, "projects/p1/apis/a1/versions/v1/artifacts/gone");
        save_artifact(&mut store, "projects/p1/apis/a1/versions/v1/specs/s1/artifacts/gone");
        save_artifact(&mut store, "projects/p1/apis/a1/versions/v2/artifacts/keep");

        let version: VersionName = "projects/p1/apis/a1/versions/v1".parse().unwrap();
        let deleted = delete_artifacts(&mut store, &version.filters()).unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.row_count(&Artifact::table().unwrap()), 2);
        assert_eq!(store.row_count(&Blob::table().unwrap()), 2);
    }

    #[test]
    fn test_children_are_distinct_logical_names() {
        let mut store = MemoryStore::new();
        let table = Spec::table().unwrap();
        for (spec, rev) in [("s1", "aaaaaaaa"), ("s1", "bbbbbbbb"), ("s2", "aaaaaaaa")] {
            let name: SpecName = format!("projects/p1/apis/a1/versions/v1/specs/{}", spec).parse().unwrap();
            let mut revision = Spec::new_revision(&name, &Spec::default(), None).unwrap();
            revision.revision_id = rev.into();
            store.save(&table, revision.to_row().unwrap()).unwrap();
        }

        let version: VersionName = "projects/p1/apis/a1/versions/v1".parse().unwrap();
        let names = children::<Spec, _>(&mut store, &version.filters()).unwrap();
        let ids: Vec<_> = names.iter().map(|n| n.spec_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }
}
