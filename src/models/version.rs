use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mask::{apply_field, FieldMask, MaskError};
use super::{timestamp, Labels, Model};
use crate::names::VersionName;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    #[serde(with = "timestamp")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub update_time: DateTime<Utc>,
}

impl Version {
    pub const MUTABLE_FIELDS: &'static [&'static str] =
        &["display_name", "description", "state", "labels", "annotations"];

    pub fn new(name: &VersionName, body: &Version) -> Self {
        let now = timestamp::now();
        Self {
            project_id: name.project_id.clone(),
            api_id: name.api_id.clone(),
            version_id: name.version_id.clone(),
            create_time: now,
            update_time: now,
            ..body.clone()
        }
    }

    pub fn resource_name(&self) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
        }
    }

    pub fn update(&mut self, body: &Version, mask: &FieldMask) -> Result<(), MaskError> {
        mask.validate(Self::MUTABLE_FIELDS)?;
        apply_field(mask, "display_name", &mut self.display_name, &body.display_name);
        apply_field(mask, "description", &mut self.description, &body.description);
        apply_field(mask, "state", &mut self.state, &body.state);
        apply_field(mask, "labels", &mut self.labels, &body.labels);
        apply_field(mask, "annotations", &mut self.annotations, &body.annotations);
        self.update_time = timestamp::now();
        Ok(())
    }
}

impl Model for Version {
    const TABLE: &'static str = "versions";

    fn name(&self) -> String {
        self.resource_name().to_string()
    }
}
