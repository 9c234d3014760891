use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{content_hash, timestamp, Model};
use crate::names::{ArtifactName, ArtifactParent};
use crate::storage::StorageResult;

/// Metadata of an artifact; the contents live in the blob table.
///
/// Ids of the enclosing resources are stored only down to the parent, so
/// `api_id` is absent on a project-level artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    pub artifact_id: String,
    pub parent_level: String,
    pub parent: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: i64,
    #[serde(default)]
    pub hash: String,
    #[serde(with = "timestamp")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub update_time: DateTime<Utc>,
}

impl Artifact {
    pub fn new(name: &ArtifactName, mime_type: &str, contents: &[u8]) -> StorageResult<Self> {
        let now = timestamp::now();
        let mut artifact = Artifact {
            artifact_id: name.artifact_id.clone(),
            parent_level: name.parent().level().to_string(),
            parent: name.parent().to_string(),
            mime_type: mime_type.to_string(),
            create_time: now,
            update_time: now,
            ..Default::default()
        };
        match name.parent() {
            ArtifactParent::Project(p) => {
                artifact.project_id = p.project_id.clone();
            }
            ArtifactParent::Api(a) => {
                artifact.project_id = a.project_id.clone();
                artifact.api_id = Some(a.api_id.clone());
            }
            ArtifactParent::Version(v) => {
                artifact.project_id = v.project_id.clone();
                artifact.api_id = Some(v.api_id.clone());
                artifact.version_id = Some(v.version_id.clone());
            }
            ArtifactParent::Spec(s) => {
                artifact.project_id = s.project_id.clone();
                artifact.api_id = Some(s.api_id.clone());
                artifact.version_id = Some(s.version_id.clone());
                artifact.spec_id = Some(s.spec_id.clone());
            }
            ArtifactParent::Deployment(d) => {
                artifact.project_id = d.project_id.clone();
                artifact.api_id = Some(d.api_id.clone());
                artifact.version_id = Some(d.version_id.clone());
                artifact.deployment_id = Some(d.deployment_id.clone());
            }
        }
        artifact.record_contents(contents)?;
        Ok(artifact)
    }

    /// take the mime type and contents of a replacement, keeping identity and creation time
    pub fn replace_with(&mut self, mime_type: &str, contents: &[u8]) -> StorageResult<()> {
        self.mime_type = mime_type.to_string();
        self.record_contents(contents)?;
        self.update_time = timestamp::now();
        Ok(())
    }

    fn record_contents(&mut self, contents: &[u8]) -> StorageResult<()> {
        self.hash = content_hash(contents)?;
        self.size_bytes = contents.len() as i64;
        Ok(())
    }
}

impl Model for Artifact {
    const TABLE: &'static str = "artifacts";

    fn name(&self) -> String {
        format!("{}/artifacts/{}", self.parent, self.artifact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_spec_artifact_carries_parent_ids() {
        let name: ArtifactName = "projects/p1/apis/a1/versions/v1/specs/s1/artifacts/lint"
            .parse()
            .unwrap();
        let artifact = Artifact::new(&name, "application/json", b"{}").unwrap();

        assert_eq!(artifact.parent_level, "spec");
        assert_eq!(artifact.spec_id.as_deref(), Some("s1"));
        assert_eq!(artifact.deployment_id, None);
        assert_eq!(artifact.size_bytes, 2);
        assert_eq!(artifact.name(), name.to_string());

        let fields = artifact.fields().unwrap();
        assert!(!fields.contains_key("deployment_id"));
        assert_eq!(fields["parent_level"], "spec");
    }

    #[test]
    fn test_replace_keeps_create_time() {
        let name: ArtifactName = "projects/p1/artifacts/readme".parse().unwrap();
        let mut artifact = Artifact::new(&name, "text/plain", b"v1").unwrap();
        let created = artifact.create_time;

        artifact.replace_with("text/markdown", b"# v2").unwrap();
        assert_eq!(artifact.create_time, created);
        assert_eq!(artifact.mime_type, "text/markdown");
        assert_eq!(artifact.hash, content_hash(b"# v2").unwrap());
        assert_eq!(artifact.api_id, None);
    }
}
