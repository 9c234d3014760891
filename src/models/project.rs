use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mask::{apply_field, FieldMask, MaskError};
use super::{timestamp, Model};
use crate::names::ProjectName;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "timestamp")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub update_time: DateTime<Utc>,
}

impl Project {
    pub const MUTABLE_FIELDS: &'static [&'static str] = &["display_name", "description"];

    pub fn new(name: &ProjectName, body: &Project) -> Self {
        let now = timestamp::now();
        Self {
            project_id: name.project_id.clone(),
            display_name: body.display_name.clone(),
            description: body.description.clone(),
            create_time: now,
            update_time: now,
        }
    }

    pub fn resource_name(&self) -> ProjectName {
        ProjectName::new(self.project_id.clone())
    }

    pub fn update(&mut self, body: &Project, mask: &FieldMask) -> Result<(), MaskError> {
        mask.validate(Self::MUTABLE_FIELDS)?;
        apply_field(mask, "display_name", &mut self.display_name, &body.display_name);
        apply_field(mask, "description", &mut self.description, &body.description);
        self.update_time = timestamp::now();
        Ok(())
    }
}

impl Model for Project {
    const TABLE: &'static str = "projects";

    fn name(&self) -> String {
        self.resource_name().to_string()
    }
}
