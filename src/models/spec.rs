use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mask::{apply_field, FieldMask, MaskError, Selection};
use super::{content_hash, timestamp, Currency, Labels, Model};
use crate::names::{SpecName, SpecRevisionName, VersionName};
use crate::revisions::Revisioned;
use crate::storage::StorageResult;

/// one revision of an API spec
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
    pub revision_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: i64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub source_uri: String,
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

impl Spec {
    pub const MUTABLE_FIELDS: &'static [&'static str] = &[
        "description",
        "filename",
        "mime_type",
        "source_uri",
        "contents",
        "labels",
        "annotations",
    ];

    pub fn revision_name(&self) -> SpecRevisionName {
        SpecRevisionName::new(self.logical_name(), self.revision_id.clone())
    }

}

impl Model for Spec {
    const TABLE: &'static str = "specs";

    fn name(&self) -> String {
        self.revision_name().to_string()
    }

    /// filters see the logical name, without the revision
    fn filter_name(&self) -> String {
        self.logical_name().to_string()
    }
}

impl Revisioned for Spec {
    type Name = SpecName;
    const TAG_TABLE: &'static str = "spec_revision_tags";
    const HAS_CONTENTS: bool = true;

    fn logical_name(&self) -> SpecName {
        SpecName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
            spec_id: self.spec_id.clone(),
        }
    }

    fn parent_of(name: &SpecName) -> VersionName {
        name.parent()
    }

    fn new_revision(name: &SpecName, body: &Spec, contents: Option<&[u8]>) -> StorageResult<Self> {
        let now = timestamp::now();
        let mut spec = Spec {
            project_id: name.project_id.clone(),
            api_id: name.api_id.clone(),
            version_id: name.version_id.clone(),
            spec_id: name.spec_id.clone(),
            revision_id: String::new(),
            description: body.description.clone(),
            filename: body.filename.clone(),
            mime_type: body.mime_type.clone(),
            size_bytes: 0,
            hash: String::new(),
            source_uri: body.source_uri.clone(),
            currency: Currency::Current,
            labels: body.labels.clone(),
            annotations: body.annotations.clone(),
            create_time: now,
            revision_create_time: now,
            revision_update_time: now,
        };
        spec.record_contents(contents.unwrap_or_default())?;
        Ok(spec)
    }

    fn fingerprint(&self) -> Vec<&str> {
        vec![&self.hash, &self.mime_type, &self.filename, &self.source_uri]
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

    fn apply_update(&mut self, body: &Spec, contents: Option<&[u8]>, mask: &FieldMask) -> Result<bool, MaskError> {
        mask.validate(Self::MUTABLE_FIELDS)?;
        apply_field(mask, "description", &mut self.description, &body.description);
        apply_field(mask, "filename", &mut self.filename, &body.filename);
        apply_field(mask, "mime_type", &mut self.mime_type, &body.mime_type);
        apply_field(mask, "source_uri", &mut self.source_uri, &body.source_uri);
        apply_field(mask, "labels", &mut self.labels, &body.labels);
        apply_field(mask, "annotations", &mut self.annotations, &body.annotations);

        Ok(match mask.selection("contents") {
            Selection::Skip => false,
            Selection::IfSet => contents.is_some_and(|c| !c.is_empty()),
            Selection::Always => true,
        })
    }

    fn record_contents(&mut self, contents: &[u8]) -> StorageResult<()> {
        self.hash = content_hash(contents)?;
        self.size_bytes = contents.len() as i64;
        Ok(())
    }

    fn content_type(&self) -> &str {
        &self.mime_type
    }
}
