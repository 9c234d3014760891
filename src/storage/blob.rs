//! Blob operations for row storage.
//!
//! Every row is stored as a separate JSON blob with a consistent envelope
//! that records the row key, a write counter and insertion/update times.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::error::{StorageError, StorageResult};
pub(crate) use crate::storage::types::{BlobId, RowKey};

/// a stored row with metadata and model fields
///
/// The internal format stored in Git:
/// ```text
/// {
///   "_pk": "projects~p1~apis~a1",
///   "_version": 1,
///   "_created_at": "xxxx-xx-xxT00:00:00Z",
///   "_updated_at": "xxxx-xx-xxT00:00:00Z",
///   "api_id": "a1",
///   "project_id": "p1"
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// primary key (must match filename without .json extension)
    pub key: RowKey,
    /// number of times this key has been written
    pub version: u64,
    /// insertion timestamp
    pub created_at: String,
    /// last write timestamp
    pub updated_at: String,
    /// model fields
    pub data: BTreeMap<String, Value>,
}

impl Row {
    /// creates a new row with key & data
    ///
    /// sets v1 and current time
    pub fn new(key: RowKey, data: BTreeMap<String, Value>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            key,
            version: 1,
            created_at: now.clone(),
            updated_at: now,
            data,
        }
    }

    /// create a row from any serializable model
    pub fn from_model<T: Serialize>(key: RowKey, model: &T) -> StorageResult<Self> {
        match serde_json::to_value(model)? {
            Value::Object(map) => Ok(Self::new(key, map.into_iter().collect())),
            _ => Err(StorageError::SchemaViolation(
                "row data must be a JSON object".to_string(),
            )),
        }
    }

    /// map the row fields back onto a model
    pub fn to_model<T: DeserializeOwned>(&self) -> StorageResult<T> {
        let map: serde_json::Map<String, Value> = self
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::from_value(Value::Object(map))
            .map_err(|e| StorageError::SchemaViolation(format!("{}: {}", self.key, e)))
    }

    /// the version of this row that replaces `previous` under the same key
    ///
    /// increments the write counter and keeps the original insertion time
    pub fn replacing(self, previous: &Row) -> Self {
        Self {
            key: self.key,
            version: previous.version + 1,
            created_at: previous.created_at.clone(),
            updated_at: chrono::Utc::now().to_rfc3339(),
            data: self.data,
        }
    }

    /// get a field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// check whether every `(field, value)` pair matches this row
    pub fn matches_all(&self, requirements: &[(String, Value)]) -> bool {
        requirements
            .iter()
            .all(|(field, value)| self.data.get(field) == Some(value))
    }
}

/// internal format for JSON serialization
///
/// uses `_` prefix for metadata fields to avoid conflicts with model fields
#[derive(Serialize, Deserialize)]
struct RowJson {
    #[serde(rename = "_pk")]
    pk: String,
    #[serde(rename = "_version")]
    version: u64,
    #[serde(rename = "_created_at")]
    created_at: String,
    #[serde(rename = "_updated_at")]
    updated_at: String,
    #[serde(flatten)]
    data: BTreeMap<String, Value>,
}

/// serialize a row to JSON bytes
///
/// uses BTreeMap for consistent key ordering (identical rows share one git blob)
pub fn serialize_row(row: &Row) -> StorageResult<Vec<u8>> {
    let json = RowJson {
        pk: row.key.as_str().to_string(),
        version: row.version,
        created_at: row.created_at.clone(),
        updated_at: row.updated_at.clone(),
        data: row.data.clone(),
    };

    let bytes = serde_json::to_vec_pretty(&json)?;
    Ok(bytes)
}

/// deserialize a row from JSON bytes
///
/// validates that the primary key in the JSON matches the expected key
pub fn deserialize_row(bytes: &[u8], expected_key: &RowKey) -> StorageResult<Row> {
    let json: RowJson = serde_json::from_slice(bytes)?;

    if json.pk != expected_key.as_str() {
        return Err(StorageError::CorruptedData {
            path: format!("{}.json", expected_key).into(),
            reason: format!(
                "primary key mismatch: file name suggests '{}' but content has '{}'",
                expected_key, json.pk
            ),
        });
    }

    Ok(Row {
        key: expected_key.clone(),
        version: json.version,
        created_at: json.created_at,
        updated_at: json.updated_at,
        data: json.data,
    })
}

/// write a row as a blob to the repository
///
/// returns the blob ID (SHA-1 hash of the content)
pub fn write_blob(repo: &git2::Repository, row: &Row) -> StorageResult<BlobId> {
    let bytes = serialize_row(row)?;
    let oid = repo.blob(&bytes)?;
    Ok(BlobId::new(oid))
}

/// read a blob's content from the repository
pub fn read_blob(repo: &git2::Repository, blob_id: BlobId) -> StorageResult<Vec<u8>> {
    let blob = repo.find_blob(blob_id.raw())?;
    Ok(blob.content().to_vec())
}
