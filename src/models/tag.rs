use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Model};

/// A named pointer at one revision of a spec or deployment.
///
/// Stored in the tag table of the owning kind under `{owner}@{tag}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevisionTag {
    /// logical name of the spec or deployment
    pub owner: String,
    pub tag: String,
    pub revision_id: String,
    #[serde(with = "timestamp")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub update_time: DateTime<Utc>,
}

impl RevisionTag {
    pub fn new(owner: impl Into<String>, tag: impl Into<String>, revision_id: impl Into<String>) -> Self {
        let now = timestamp::now();
        Self {
            owner: owner.into(),
            tag: tag.into(),
            revision_id: revision_id.into(),
            create_time: now,
            update_time: now,
        }
    }

    /// row key of `tag` on `owner`
    pub fn key_name(owner: &str, tag: &str) -> String {
        format!("{}@{}", owner, tag)
    }
}

impl Model for RevisionTag {
    // stored in a per-kind table; see `Revisioned::TAG_TABLE`
    const TABLE: &'static str = "spec_revision_tags";

    fn name(&self) -> String {
        Self::key_name(&self.owner, &self.tag)
    }
}
