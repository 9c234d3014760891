use std::fmt;
use std::str::FromStr;

use super::error::{InvalidNameError, NameResult};
use super::{check_segment, parse_segments, ResourceName};

/// `projects/{project}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName {
    pub project_id: String,
}

impl ProjectName {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }

    pub fn api(&self, api_id: impl Into<String>) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: api_id.into(),
        }
    }
}

impl ResourceName for ProjectName {
    const KIND: &'static str = "project";

    fn ids(&self) -> Vec<(&'static str, &str)> {
        vec![("project_id", &self.project_id)]
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}", self.project_id)
    }
}

impl FromStr for ProjectName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> NameResult<Self> {
        let mut ids = parse_segments(s, Self::KIND, "projects/{project}", &["projects"])?;
        Ok(Self {
            project_id: ids.remove(0),
        })
    }
}

/// `projects/{project}/apis/{api}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiName {
    pub project_id: String,
    pub api_id: String,
}

impl ApiName {
    pub fn parent(&self) -> ProjectName {
        ProjectName::new(self.project_id.clone())
    }

    pub fn version(&self, version_id: impl Into<String>) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: version_id.into(),
        }
    }
}

impl ResourceName for ApiName {
    const KIND: &'static str = "api";

    fn ids(&self) -> Vec<(&'static str, &str)> {
        vec![("project_id", &self.project_id), ("api_id", &self.api_id)]
    }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/apis/{}", self.project_id, self.api_id)
    }
}

impl FromStr for ApiName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> NameResult<Self> {
        let ids = parse_segments(s, Self::KIND, "projects/{project}/apis/{api}", &["projects", "apis"])?;
        let [project_id, api_id]: [String; 2] = ids
            .try_into()
            .map_err(|_| InvalidNameError::malformed(Self::KIND, s, "projects/{project}/apis/{api}"))?;
        Ok(Self { project_id, api_id })
    }
}

/// `projects/{project}/apis/{api}/versions/{version}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
}

const VERSION_PATTERN: &str = "projects/{project}/apis/{api}/versions/{version}";

impl VersionName {
    pub fn parent(&self) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
        }
    }

    pub fn spec(&self, spec_id: impl Into<String>) -> SpecName {
        SpecName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
            spec_id: spec_id.into(),
        }
    }

    pub fn deployment(&self, deployment_id: impl Into<String>) -> DeploymentName {
        DeploymentName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
            deployment_id: deployment_id.into(),
        }
    }
}

impl ResourceName for VersionName {
    const KIND: &'static str = "version";

    fn ids(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("project_id", &self.project_id),
            ("api_id", &self.api_id),
            ("version_id", &self.version_id),
        ]
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/versions/{}", self.parent(), self.version_id)
    }
}

impl FromStr for VersionName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> NameResult<Self> {
        let ids = parse_segments(s, Self::KIND, VERSION_PATTERN, &["projects", "apis", "versions"])?;
        let [project_id, api_id, version_id]: [String; 3] = ids
            .try_into()
            .map_err(|_| InvalidNameError::malformed(Self::KIND, s, VERSION_PATTERN))?;
        Ok(Self {
            project_id,
            api_id,
            version_id,
        })
    }
}

/// `projects/{project}/apis/{api}/versions/{version}/specs/{spec}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
}

const SPEC_PATTERN: &str = "projects/{project}/apis/{api}/versions/{version}/specs/{spec}";

impl SpecName {
    pub fn parent(&self) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
        }
    }
}

impl ResourceName for SpecName {
    const KIND: &'static str = "spec";

    fn ids(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("project_id", &self.project_id),
            ("api_id", &self.api_id),
            ("version_id", &self.version_id),
            ("spec_id", &self.spec_id),
        ]
    }
}

impl fmt::Display for SpecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/specs/{}", self.parent(), self.spec_id)
    }
}

impl FromStr for SpecName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> NameResult<Self> {
        let ids = parse_segments(s, Self::KIND, SPEC_PATTERN, &["projects", "apis", "versions", "specs"])?;
        let [project_id, api_id, version_id, spec_id]: [String; 4] = ids
            .try_into()
            .map_err(|_| InvalidNameError::malformed(Self::KIND, s, SPEC_PATTERN))?;
        Ok(Self {
            project_id,
            api_id,
            version_id,
            spec_id,
        })
    }
}

/// `projects/{project}/apis/{api}/versions/{version}/deployments/{deployment}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub deployment_id: String,
}

const DEPLOYMENT_PATTERN: &str = "projects/{project}/apis/{api}/versions/{version}/deployments/{deployment}";

impl DeploymentName {
    pub fn parent(&self) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
        }
    }
}

impl ResourceName for DeploymentName {
    const KIND: &'static str = "deployment";

    fn ids(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("project_id", &self.project_id),
            ("api_id", &self.api_id),
            ("version_id", &self.version_id),
            ("deployment_id", &self.deployment_id),
        ]
    }
}

impl fmt::Display for DeploymentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/deployments/{}", self.parent(), self.deployment_id)
    }
}

impl FromStr for DeploymentName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> NameResult<Self> {
        let ids = parse_segments(
            s,
            Self::KIND,
            DEPLOYMENT_PATTERN,
            &["projects", "apis", "versions", "deployments"],
        )?;
        let [project_id, api_id, version_id, deployment_id]: [String; 4] = ids
            .try_into()
            .map_err(|_| InvalidNameError::malformed(Self::KIND, s, DEPLOYMENT_PATTERN))?;
        Ok(Self {
            project_id,
            api_id,
            version_id,
            deployment_id,
        })
    }
}

/// `{name}@{revision}` for a revisioned resource
///
/// `revision` is a revision id, a tag, or `-` for the whole revision
/// collection of `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionName<N> {
    pub name: N,
    pub revision_id: String,
}

pub type SpecRevisionName = RevisionName<SpecName>;
pub type DeploymentRevisionName = RevisionName<DeploymentName>;

impl<N: ResourceName> RevisionName<N> {
    pub fn new(name: N, revision_id: impl Into<String>) -> Self {
        Self {
            name,
            revision_id: revision_id.into(),
        }
    }

    /// the logical resource this revision belongs to
    pub fn logical(&self) -> &N {
        &self.name
    }

    /// whether this name addresses every revision (`@-`)
    pub fn is_collection(&self) -> bool {
        self.revision_id == super::WILDCARD
    }
}

impl<N: ResourceName> ResourceName for RevisionName<N> {
    const KIND: &'static str = "revision";

    fn ids(&self) -> Vec<(&'static str, &str)> {
        let mut ids = self.name.ids();
        ids.push(("revision_id", &self.revision_id));
        ids
    }
}

impl<N: fmt::Display> fmt::Display for RevisionName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.revision_id)
    }
}

impl<N: ResourceName> FromStr for RevisionName<N> {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> NameResult<Self> {
        let (name, revision_id) = s
            .split_once('@')
            .ok_or_else(|| InvalidNameError::malformed(Self::KIND, s, "{name}@{revision}"))?;
        check_segment(revision_id)?;
        Ok(Self {
            name: name.parse()?,
            revision_id: revision_id.to_string(),
        })
    }
}

/// the resource an artifact is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactParent {
    Project(ProjectName),
    Api(ApiName),
    Version(VersionName),
    Spec(SpecName),
    Deployment(DeploymentName),
}

const ARTIFACT_PARENT_PATTERN: &str = "a project, api, version, spec or deployment name";

impl ArtifactParent {
    pub fn artifact(&self, artifact_id: impl Into<String>) -> ArtifactName {
        ArtifactName {
            parent: self.clone(),
            artifact_id: artifact_id.into(),
        }
    }

    /// stored level of the parent
    pub fn level(&self) -> &'static str {
        match self {
            ArtifactParent::Project(_) => "project",
            ArtifactParent::Api(_) => "api",
            ArtifactParent::Version(_) => "version",
            ArtifactParent::Spec(_) => "spec",
            ArtifactParent::Deployment(_) => "deployment",
        }
    }

    fn inner_ids(&self) -> Vec<(&'static str, &str)> {
        match self {
            ArtifactParent::Project(n) => n.ids(),
            ArtifactParent::Api(n) => n.ids(),
            ArtifactParent::Version(n) => n.ids(),
            ArtifactParent::Spec(n) => n.ids(),
            ArtifactParent::Deployment(n) => n.ids(),
        }
    }
}

impl ResourceName for ArtifactParent {
    const KIND: &'static str = "artifact parent";

    fn ids(&self) -> Vec<(&'static str, &str)> {
        self.inner_ids()
    }

    /// also pins the parent level, so a project-level listing does not pick
    /// up artifacts attached further down
    fn filters(&self) -> Vec<(&'static str, String)> {
        let mut filters: Vec<(&'static str, String)> = self
            .inner_ids()
            .into_iter()
            .filter(|(_, id)| *id != super::WILDCARD)
            .map(|(field, id)| (field, id.to_string()))
            .collect();
        filters.push(("parent_level", self.level().to_string()));
        filters
    }
}

impl fmt::Display for ArtifactParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactParent::Project(n) => write!(f, "{}", n),
            ArtifactParent::Api(n) => write!(f, "{}", n),
            ArtifactParent::Version(n) => write!(f, "{}", n),
            ArtifactParent::Spec(n) => write!(f, "{}", n),
            ArtifactParent::Deployment(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for ArtifactParent {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> NameResult<Self> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [_, _] => Ok(ArtifactParent::Project(s.parse()?)),
            [_, _, _, _] => Ok(ArtifactParent::Api(s.parse()?)),
            [_, _, _, _, _, _] => Ok(ArtifactParent::Version(s.parse()?)),
            [_, _, _, _, _, _, "specs", _] => Ok(ArtifactParent::Spec(s.parse()?)),
            [_, _, _, _, _, _, "deployments", _] => Ok(ArtifactParent::Deployment(s.parse()?)),
            _ => Err(InvalidNameError::malformed(Self::KIND, s, ARTIFACT_PARENT_PATTERN)),
        }
    }
}

/// `{parent}/artifacts/{artifact}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName {
    pub parent: ArtifactParent,
    pub artifact_id: String,
}

impl ArtifactName {
    pub fn parent(&self) -> &ArtifactParent {
        &self.parent
    }
}

impl ResourceName for ArtifactName {
    const KIND: &'static str = "artifact";

    fn ids(&self) -> Vec<(&'static str, &str)> {
        let mut ids = self.parent.ids();
        ids.push(("artifact_id", &self.artifact_id));
        ids
    }

    fn filters(&self) -> Vec<(&'static str, String)> {
        let mut filters = self.parent.filters();
        if self.artifact_id != super::WILDCARD {
            filters.push(("artifact_id", self.artifact_id.clone()));
        }
        filters
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/artifacts/{}", self.parent, self.artifact_id)
    }
}

impl FromStr for ArtifactName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> NameResult<Self> {
        let (parent, artifact_id) = s
            .rsplit_once("/artifacts/")
            .ok_or_else(|| InvalidNameError::malformed(Self::KIND, s, "{parent}/artifacts/{artifact}"))?;
        check_segment(artifact_id)?;
        Ok(Self {
            parent: parent.parse()?,
            artifact_id: artifact_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_name_round_trip_and_parent() {
        let name: SpecName = "projects/p1/apis/a1/versions/v1/specs/s1".parse().unwrap();
        assert_eq!(name.spec_id, "s1");
        assert_eq!(name.parent().to_string(), "projects/p1/apis/a1/versions/v1");
        assert_eq!(name.parent().parent().parent(), ProjectName::new("p1"));
        assert_eq!(name.to_string(), "projects/p1/apis/a1/versions/v1/specs/s1");
    }

    #[test]
    fn test_wildcards_parse_but_do_not_validate() {
        let name: SpecName = "projects/p1/apis/-/versions/-/specs/-".parse().unwrap();
        assert!(name.has_wildcards());
        assert!(name.validate().is_err());
        assert_eq!(name.filters(), vec![("project_id", "p1".to_string())]);
    }

    #[test]
    fn test_wrong_collection_is_rejected() {
        assert!("projects/p1/apis/a1/versions/v1/deployments/d1"
            .parse::<SpecName>()
            .is_err());
        assert!("projects/p1/apis/a1/versions/v1/specs/s1/extra".parse::<SpecName>().is_err());
        assert!("projects/p1/apis/a1/versions/v1/specs/S1".parse::<SpecName>().is_err());
    }

    #[test]
    fn test_revision_name() {
        let name: SpecRevisionName = "projects/p1/apis/a1/versions/v1/specs/s1@1a2b3c4d".parse().unwrap();
        assert_eq!(name.revision_id, "1a2b3c4d");
        assert_eq!(name.logical().spec_id, "s1");
        assert!(!name.is_collection());
        assert_eq!(name.to_string(), "projects/p1/apis/a1/versions/v1/specs/s1@1a2b3c4d");

        let all: DeploymentRevisionName = "projects/p1/apis/a1/versions/v1/deployments/d1@-".parse().unwrap();
        assert!(all.is_collection());
        assert!(all.validate().is_err());

        assert!("projects/p1/apis/a1/versions/v1/specs/s1".parse::<SpecRevisionName>().is_err());
        assert!("projects/p1/apis/a1/versions/v1/specs/s1@Bad".parse::<SpecRevisionName>().is_err());
    }

    #[test]
    fn test_artifact_names_at_every_level() {
        let cases = [
            ("projects/p1/artifacts/x", "project"),
            ("projects/p1/apis/a1/artifacts/x", "api"),
            ("projects/p1/apis/a1/versions/v1/artifacts/x", "version"),
            ("projects/p1/apis/a1/versions/v1/specs/s1/artifacts/x", "spec"),
            ("projects/p1/apis/a1/versions/v1/deployments/d1/artifacts/x", "deployment"),
        ];
        for (raw, level) in cases {
            let name: ArtifactName = raw.parse().unwrap();
            assert_eq!(name.parent().level(), level);
            assert_eq!(name.artifact_id, "x");
            assert_eq!(name.to_string(), raw);
            assert!(name.validate().is_ok());
        }

        assert!("projects/p1/things/t/artifacts/x".parse::<ArtifactName>().is_err());
        assert!("projects/p1/artifacts".parse::<ArtifactName>().is_err());
    }

    #[test]
    fn test_artifact_parent_filters_pin_level() {
        let parent: ArtifactParent = "projects/p1".parse().unwrap();
        assert_eq!(
            parent.filters(),
            vec![
                ("project_id", "p1".to_string()),
                ("parent_level", "project".to_string())
            ]
        );
    }
}
