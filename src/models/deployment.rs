use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mask::{apply_field, FieldMask, MaskError};
use super::{timestamp, Currency, Labels, Model};
use crate::names::{DeploymentName, DeploymentRevisionName, VersionName};
use crate::revisions::Revisioned;
use crate::storage::StorageResult;

/// one revision of an API deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub deployment_id: String,
    pub revision_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub api_spec_revision: String,
    #[serde(default)]
    pub endpoint_uri: String,
    #[serde(default)]
    pub external_channel_uri: String,
    #[serde(default)]
    pub intended_audience: String,
    #[serde(default)]
    pub access_guidance: String,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    #[serde(with = "timestamp")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub revision_create_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub revision_update_time: DateTime<Utc>,
}

impl Deployment {
    pub const MUTABLE_FIELDS: &'static [&'static str] = &[
        "display_name",
        "description",
        "api_spec_revision",
        "endpoint_uri",
        "external_channel_uri",
        "intended_audience",
        "access_guidance",
        "labels",
        "annotations",
    ];

    pub fn revision_name(&self) -> DeploymentRevisionName {
        DeploymentRevisionName::new(self.logical_name(), self.revision_id.clone())
    }
}

impl Model for Deployment {
    const TABLE: &'static str = "deployments";

    fn name(&self) -> String {
        self.revision_name().to_string()
    }

    /// filters see the logical name, without the revision
    fn filter_name(&self) -> String {
        self.logical_name().to_string()
    }
}

impl Revisioned for Deployment {
    type Name = DeploymentName;
    const TAG_TABLE: &'static str = "deployment_revision_tags";
    const HAS_CONTENTS: bool = false;

    fn logical_name(&self) -> DeploymentName {
        DeploymentName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
            deployment_id: self.deployment_id.clone(),
        }
    }

    fn parent_of(name: &DeploymentName) -> VersionName {
        name.parent()
    }

    fn new_revision(name: &DeploymentName, body: &Deployment, _contents: Option<&[u8]>) -> StorageResult<Self> {
        let now = timestamp::now();
        Ok(Deployment {
            project_id: name.project_id.clone(),
            api_id: name.api_id.clone(),
            version_id: name.version_id.clone(),
            deployment_id: name.deployment_id.clone(),
            revision_id: String::new(),
            currency: Currency::Current,
            create_time: now,
            revision_create_time: now,
            revision_update_time: now,
            ..body.clone()
        })
    }

    fn fingerprint(&self) -> Vec<&str> {
        vec![&self.api_spec_revision, &self.endpoint_uri]
    }

    fn revision_id(&self) -> &str {
        &self.revision_id
    }

    fn set_revision_id(&mut self, id: String) {
        self.revision_id = id;
    }

    fn currency(&self) -> Currency {
        self.currency
    }

    fn set_currency(&mut self, currency: Currency) {
        self.currency = currency;
    }

    fn revision_create_time(&self) -> DateTime<Utc> {
        self.revision_create_time
    }

    fn stamp(&mut self, new_revision: bool) {
        let now = timestamp::now();
        if new_revision {
            self.revision_create_time = now;
        }
        self.revision_update_time = now;
    }

    fn mutable_fields() -> &'static [&'static str] {
        Self::MUTABLE_FIELDS
    }

    fn apply_update(&mut self, body: &Deployment, _contents: Option<&[u8]>, mask: &FieldMask) -> Result<bool, MaskError> {
        mask.validate(Self::MUTABLE_FIELDS)?;
        apply_field(mask, "display_name", &mut self.display_name, &body.display_name);
        apply_field(mask, "description", &mut self.description, &body.description);
        apply_field(mask, "api_spec_revision", &mut self.api_spec_revision, &body.api_spec_revision);
        apply_field(mask, "endpoint_uri", &mut self.endpoint_uri, &body.endpoint_uri);
        apply_field(
            mask,
            "external_channel_uri",
            &mut self.external_channel_uri,
            &body.external_channel_uri,
        );
        apply_field(mask, "intended_audience", &mut self.intended_audience, &body.intended_audience);
        apply_field(mask, "access_guidance", &mut self.access_guidance, &body.access_guidance);
        apply_field(mask, "labels", &mut self.labels, &body.labels);
        apply_field(mask, "annotations", &mut self.annotations, &body.annotations);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::revision_id;

    fn deployment() -> Deployment {
        let name: DeploymentName = "projects/p1/apis/a1/versions/v1/deployments/prod".parse().unwrap();
        let body = Deployment {
            endpoint_uri: "https://pets.example.com".into(),
            display_name: "Production".into(),
            ..Default::default()
        };
        Deployment::new_revision(&name, &body, None).unwrap()
    }

    #[test]
    fn test_fingerprint_ignores_descriptive_fields() {
        let mut d = deployment();
        let before = revision_id(&d.fingerprint()).unwrap();

        d.apply_update(
            &Deployment {
                description: "the live one".into(),
                ..Default::default()
            },
            None,
            &FieldMask::default(),
        )
        .unwrap();
        assert_eq!(revision_id(&d.fingerprint()).unwrap(), before);

        d.apply_update(
            &Deployment {
                endpoint_uri: "https://pets-v2.example.com".into(),
                ..Default::default()
            },
            None,
            &FieldMask::default(),
        )
        .unwrap();
        assert_ne!(revision_id(&d.fingerprint()).unwrap(), before);
    }

    #[test]
    fn test_identity_comes_from_name() {
        let d = deployment();
        assert_eq!(d.deployment_id, "prod");
        assert_eq!(d.display_name, "Production");
        assert_eq!(
            d.logical_name().to_string(),
            "projects/p1/apis/a1/versions/v1/deployments/prod"
        );
    }
}
