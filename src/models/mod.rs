//! Stored resource models.
//!
//! Each model is one row in its table, keyed by its resource name. Models
//! carry the ids of every enclosing resource as plain fields so collections
//! can be selected with field equality, including across wildcards.

mod api;
mod artifact;
mod blob;
mod deployment;
pub mod mask;
mod project;
mod spec;
mod tag;
pub mod timestamp;
mod version;

use std::collections::BTreeMap;

use git2::{ObjectType, Oid};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{Row, RowKey, StorageError, StorageResult, TableName};

pub use api::Api;
pub use artifact::Artifact;
pub use blob::Blob;
pub use deployment::Deployment;
pub use mask::{FieldMask, MaskError};
pub use project::Project;
pub use spec::Spec;
pub use tag::RevisionTag;
pub use version::Version;

pub type Labels = BTreeMap<String, String>;

/// a model stored as one row
pub trait Model: Serialize + DeserializeOwned {
    const TABLE: &'static str;

    /// full resource name; also the row key
    fn name(&self) -> String;

    fn table() -> StorageResult<TableName> {
        Ok(TableName::new(Self::TABLE)?)
    }

    fn key(&self) -> StorageResult<RowKey> {
        Ok(RowKey::from_name(&self.name())?)
    }

    fn to_row(&self) -> StorageResult<Row> {
        Row::from_model(self.key()?, self)
    }

    fn from_row(row: &Row) -> StorageResult<Self> {
        row.to_model()
    }

    /// the value of `name` in filter expressions
    fn filter_name(&self) -> String {
        self.name()
    }

    /// field values a filter expression is evaluated against
    fn fields(&self) -> StorageResult<BTreeMap<String, Value>> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(map) => map.into_iter().collect::<BTreeMap<_, _>>(),
            _ => return Err(StorageError::SchemaViolation(format!("{} is not an object", Self::TABLE))),
        };
        fields.insert("name".to_string(), Value::String(self.filter_name()));
        Ok(fields)
    }
}

/// row key for a resource name given as text
pub fn key_of(name: &impl ToString) -> StorageResult<RowKey> {
    Ok(RowKey::from_name(&name.to_string())?)
}

/// Which revision of a resource reads default to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    #[default]
    Current,
    NonCurrent,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Current => "current",
            Currency::NonCurrent => "non_current",
        }
    }
}

/// git blob hash of `contents`, hex encoded
pub fn content_hash(contents: &[u8]) -> StorageResult<String> {
    Ok(Oid::hash_object(ObjectType::Blob, contents)?.to_string())
}

/// revision id derived from the content-defining fields of a revision
///
/// identical inputs always produce the same id
pub fn revision_id(fingerprint: &[&str]) -> StorageResult<String> {
    let joined = fingerprint.join("\u{0}");
    let oid = Oid::hash_object(ObjectType::Blob, joined.as_bytes())?;
    Ok(oid.to_string()[..8].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_id_is_stable_and_sensitive() {
        let a = revision_id(&["hash", "application/yaml", "openapi.yaml", ""]).unwrap();
        let b = revision_id(&["hash", "application/yaml", "openapi.yaml", ""]).unwrap();
        let c = revision_id(&["hash", "application/json", "openapi.yaml", ""]).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 8);
        assert!(crate::names::validate_id(&a).is_ok());
    }

    #[test]
    fn test_content_hash_matches_git() {
        // `printf hello | git hash-object --stdin`
        assert_eq!(
            content_hash(b"hello").unwrap(),
            "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0"
        );
    }

    #[test]
    fn test_currency_serialization() {
        assert_eq!(serde_json::to_value(Currency::NonCurrent).unwrap(), Value::String("non_current".into()));
        assert_eq!(Currency::Current.as_str(), "current");
    }
}
