use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{content_hash, timestamp, Model};
use crate::storage::StorageResult;

/// Stored contents of a spec revision or an artifact.
///
/// `owner` is the full name of the revision or artifact the contents belong
/// to and doubles as the row key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub owner: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: i64,
    #[serde(default)]
    pub hash: String,
    #[serde(default, with = "base64_bytes")]
    pub contents: Vec<u8>,
    #[serde(with = "timestamp")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub update_time: DateTime<Utc>,
}

impl Blob {
    pub fn new(owner: impl Into<String>, mime_type: &str, contents: Vec<u8>) -> StorageResult<Self> {
        let now = timestamp::now();
        Ok(Self {
            owner: owner.into(),
            mime_type: mime_type.to_string(),
            size_bytes: contents.len() as i64,
            hash: content_hash(&contents)?,
            contents,
            create_time: now,
            update_time: now,
        })
    }

    /// the same contents stored under another owner
    pub fn copied_to(&self, owner: impl Into<String>) -> Self {
        let now = timestamp::now();
        Self {
            owner: owner.into(),
            create_time: now,
            update_time: now,
            ..self.clone()
        }
    }
}

impl Model for Blob {
    const TABLE: &'static str = "blobs";

    fn name(&self) -> String {
        self.owner.clone()
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_survive_a_row() {
        let blob = Blob::new(
            "projects/p1/apis/a1/versions/v1/specs/s1@1a2b3c4d",
            "application/x.protobuf+gzip",
            vec![0x1f, 0x8b, 0x00, 0xff],
        )
        .unwrap();
        let row = blob.to_row().unwrap();
        assert!(row.get("contents").and_then(|v| v.as_str()).is_some());

        let back = Blob::from_row(&row).unwrap();
        assert_eq!(back.contents, vec![0x1f, 0x8b, 0x00, 0xff]);
        assert_eq!(back.size_bytes, 4);
    }

    #[test]
    fn test_copied_to_keeps_contents() {
        let blob = Blob::new("projects/p1/artifacts/a", "text/plain", b"hi".to_vec()).unwrap();
        let copy = blob.copied_to("projects/p1/artifacts/b");
        assert_eq!(copy.owner, "projects/p1/artifacts/b");
        assert_eq!(copy.hash, blob.hash);
        assert_eq!(copy.contents, blob.contents);
    }
}
