//! Artifact operations.
//!
//! An artifact is a single row of metadata with its contents in the blob
//! table under the same key. Both are written in one transaction.

use crate::models::{key_of, Artifact, Blob, Deployment, Model, Spec};
use crate::names::{ArtifactName, ArtifactParent, ResourceName};
use crate::notify::ChangeKind;
use crate::revisions::revision_query;
use crate::storage::{Query, Store, TransactionalStore};

use super::containers::chosen_id;
use super::error::{RegistryError, RegistryResult};
use super::list::{list_page, select};
use super::messages::{Contents, ListRequest, ListResponse};
use super::{schemas, Backend, Registry};

fn parse_name(name: &str) -> RegistryResult<ArtifactName> {
    let name: ArtifactName = name.parse()?;
    name.validate()?;
    Ok(name)
}

fn fetch(store: &mut dyn Store, name: &ArtifactName) -> RegistryResult<Artifact> {
    match store.get(&Artifact::table()?, &key_of(name)?)? {
        Some(row) => Ok(Artifact::from_row(&row)?),
        None => Err(RegistryError::not_found(ArtifactName::KIND, name)),
    }
}

impl<B: Backend> Registry<B> {
    fn require_parent(&self, store: &mut dyn Store, parent: &ArtifactParent) -> RegistryResult<()> {
        let exists = match parent {
            ArtifactParent::Project(name) => return self.require_project(store, name),
            ArtifactParent::Api(name) => return self.require_api(store, name),
            ArtifactParent::Version(name) => return self.require_version(store, name),
            ArtifactParent::Spec(name) => store.run(&revision_query::<Spec>(name)?)?.next().is_some(),
            ArtifactParent::Deployment(name) => store.run(&revision_query::<Deployment>(name)?)?.next().is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(RegistryError::not_found(parent.level(), parent))
        }
    }

    /// attach a new artifact to `parent`
    ///
    /// an empty `artifact_id` gets a generated id
    pub fn create_artifact(
        &self,
        parent: &str,
        artifact_id: &str,
        mime_type: &str,
        contents: &[u8],
    ) -> RegistryResult<Artifact> {
        let name = parent.parse::<ArtifactParent>()?.artifact(chosen_id(artifact_id));
        let _span = crate::logging::operation_span("create_artifact", &name.to_string()).entered();
        name.validate()?;

        let mut conn = self.connect()?;
        let artifact = conn.transaction(|tx| -> RegistryResult<Artifact> {
            self.require_parent(tx, name.parent())?;
            let (artifacts, key) = (Artifact::table()?, key_of(&name)?);
            if tx.get(&artifacts, &key)?.is_some() {
                return Err(RegistryError::already_exists(ArtifactName::KIND, &name));
            }
            let artifact = Artifact::new(&name, mime_type, contents)?;
            tx.save(&artifacts, artifact.to_row()?)?;
            let blob = Blob::new(artifact.name(), mime_type, contents.to_vec())?;
            tx.save(&Blob::table()?, blob.to_row()?)?;
            Ok(artifact)
        })?;
        tracing::info!(name = %name, size = artifact.size_bytes, "created artifact");
        self.notify(ChangeKind::Created, name.to_string());
        Ok(artifact)
    }

    pub fn get_artifact(&self, name: &str) -> RegistryResult<Artifact> {
        let _span = crate::logging::operation_span("get_artifact", name).entered();
        let name = parse_name(name)?;
        let mut conn = self.connect()?;
        fetch(&mut conn, &name)
    }

    /// contents of an artifact, gunzipped when stored compressed
    pub fn get_artifact_contents(&self, name: &str) -> RegistryResult<Contents> {
        let _span = crate::logging::operation_span("get_artifact_contents", name).entered();
        let name = parse_name(name)?;
        let mut conn = self.connect()?;
        let artifact = fetch(&mut conn, &name)?;
        match conn.get(&Blob::table()?, &artifact.key()?)? {
            Some(row) => Contents::from_blob(Blob::from_row(&row)?),
            None => Err(RegistryError::Internal(format!("contents of {} are missing", name))),
        }
    }

    /// artifacts attached directly to `request.parent`; ids may be `-`
    pub fn list_artifacts(&self, request: &ListRequest) -> RegistryResult<ListResponse<Artifact>> {
        let _span = crate::logging::operation_span("list_artifacts", &request.parent).entered();
        let parent: ArtifactParent = request.parent.parse()?;
        let mut conn = self.connect()?;
        if parent.has_wildcards() {
            self.require_concrete_prefix(&mut conn, &parent.ids())?;
        } else {
            self.require_parent(&mut conn, &parent)?;
        }
        let query = select(Query::new(Artifact::table()?), parent.filters());
        list_page(&mut conn, query, &schemas::artifacts(), request, &self.config)
    }

    /// replace the contents of an existing artifact
    pub fn replace_artifact(&self, name: &str, mime_type: &str, contents: &[u8]) -> RegistryResult<Artifact> {
        let _span = crate::logging::operation_span("replace_artifact", name).entered();
        let name = parse_name(name)?;
        let mut conn = self.connect()?;
        let artifact = conn.transaction(|tx| -> RegistryResult<Artifact> {
            let mut artifact = fetch(tx, &name)?;
            artifact.replace_with(mime_type, contents)?;
            tx.save(&Artifact::table()?, artifact.to_row()?)?;

            let blobs = Blob::table()?;
            let mut blob = Blob::new(artifact.name(), mime_type, contents.to_vec())?;
            if let Some(row) = tx.get(&blobs, &artifact.key()?)? {
                blob.create_time = Blob::from_row(&row)?.create_time;
            }
            tx.save(&blobs, blob.to_row()?)?;
            Ok(artifact)
        })?;
        tracing::info!(name = %name, size = artifact.size_bytes, "replaced artifact");
        self.notify(ChangeKind::Updated, name.to_string());
        Ok(artifact)
    }

    pub fn delete_artifact(&self, name: &str) -> RegistryResult<()> {
        let _span = crate::logging::operation_span("delete_artifact", name).entered();
        let name = parse_name(name)?;
        let key = key_of(&name)?;
        let mut conn = self.connect()?;
        conn.transaction(|tx| -> RegistryResult<()> {
            if !tx.delete(&Artifact::table()?, &key)? {
                return Err(RegistryError::not_found(ArtifactName::KIND, &name));
            }
            tx.delete(&Blob::table()?, &key)?;
            Ok(())
        })?;
        tracing::info!(name = %name, "deleted artifact");
        self.notify(ChangeKind::Deleted, name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Api, Project, Spec, Version};
    use crate::registry::{Code, ListRequest, Registry, RegistryConfig};
    use crate::storage::MemoryStore;

    fn registry() -> Registry<MemoryStore> {
        let registry = Registry::in_memory(RegistryConfig::default());
        registry.create_project("p1", &Project::default()).unwrap();
        registry.create_api("projects/p1", "a1", &Api::default()).unwrap();
        registry.create_api_version("projects/p1/apis/a1", "v1", &Version::default()).unwrap();
        registry
    }

    #[test]
    fn test_artifacts_at_each_level() {
        let registry = registry();
        registry
            .create_api_spec("projects/p1/apis/a1/versions/v1", "s1", &Spec::default(), None)
            .unwrap();

        for parent in [
            "projects/p1",
            "projects/p1/apis/a1",
            "projects/p1/apis/a1/versions/v1",
            "projects/p1/apis/a1/versions/v1/specs/s1",
        ] {
            let artifact = registry.create_artifact(parent, "lint", "text/plain", b"ok").unwrap();
            assert_eq!(artifact.parent, parent);
            assert_eq!(artifact.size_bytes, 2);
        }

        let project_level = registry.list_artifacts(&ListRequest::new("projects/p1")).unwrap();
        assert_eq!(project_level.items.len(), 1);

        let every_api = registry.list_artifacts(&ListRequest::new("projects/p1/apis/-")).unwrap();
        assert_eq!(every_api.items.len(), 1);
        assert_eq!(every_api.items[0].parent_level, "api");
    }

    #[test]
    fn test_parent_must_exist() {
        let registry = registry();
        let err = registry
            .create_artifact("projects/p1/apis/a1/versions/v1/specs/none", "lint", "text/plain", b"")
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);

        let err = registry
            .create_artifact("projects/p2", "lint", "text/plain", b"")
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);

        let err = registry.list_artifacts(&ListRequest::new("projects/p2/apis/-")).unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
        let err = registry
            .list_artifacts(&ListRequest::new("projects/p1/apis/a1/versions/v9/specs/-"))
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[test]
    fn test_replace_and_delete() {
        let registry = registry();
        let created = registry
            .create_artifact("projects/p1", "notes", "text/plain", b"one")
            .unwrap();
        let err = registry
            .create_artifact("projects/p1", "notes", "text/plain", b"two")
            .unwrap_err();
        assert_eq!(err.code(), Code::AlreadyExists);

        let replaced = registry
            .replace_artifact("projects/p1/artifacts/notes", "text/markdown", b"# two")
            .unwrap();
        assert_eq!(replaced.create_time, created.create_time);
        assert_ne!(replaced.hash, created.hash);

        let contents = registry.get_artifact_contents("projects/p1/artifacts/notes").unwrap();
        assert_eq!(contents.mime_type, "text/markdown");
        assert_eq!(contents.data, b"# two");

        registry.delete_artifact("projects/p1/artifacts/notes").unwrap();
        assert!(registry.get_artifact("projects/p1/artifacts/notes").unwrap_err().is_not_found());
        assert!(registry
            .replace_artifact("projects/p1/artifacts/notes", "text/plain", b"")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_deleting_a_spec_removes_its_artifacts() {
        let registry = registry();
        registry
            .create_api_spec("projects/p1/apis/a1/versions/v1", "s1", &Spec::default(), None)
            .unwrap();
        registry
            .create_artifact("projects/p1/apis/a1/versions/v1/specs/s1", "score", "application/json", b"{}")
            .unwrap();

        registry.delete_api_spec("projects/p1/apis/a1/versions/v1/specs/s1").unwrap();
        let err = registry
            .get_artifact("projects/p1/apis/a1/versions/v1/specs/s1/artifacts/score")
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
