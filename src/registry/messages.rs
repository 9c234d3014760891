//! Request and response types of the registry operations.

use std::io::Read;

use flate2::read::GzDecoder;

use super::error::{RegistryError, RegistryResult};
use crate::models::{Blob, FieldMask, Spec};

const GZIP_SUFFIX: &str = "+gzip";

/// largest size gzipped contents may expand to
pub const MAX_EXPANDED_CONTENTS: u64 = 64 * 1024 * 1024;

/// How much of a spec a read returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    /// metadata only
    #[default]
    Basic,
    /// metadata and contents
    Full,
}

/// A spec revision as returned by a read.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSpec {
    pub spec: Spec,
    /// present for [`View::Full`]
    pub contents: Option<Vec<u8>>,
}

/// Stored contents ready to hand to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contents {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Contents {
    /// contents of `blob`, gunzipped when the mime type says so
    pub fn from_blob(blob: Blob) -> RegistryResult<Self> {
        Self::from_blob_with_limit(blob, MAX_EXPANDED_CONTENTS)
    }

    /// like [`Contents::from_blob`], refusing to expand past `limit` bytes
    pub fn from_blob_with_limit(blob: Blob, limit: u64) -> RegistryResult<Self> {
        match blob.mime_type.strip_suffix(GZIP_SUFFIX) {
            Some(mime_type) => {
                let mut data = Vec::new();
                GzDecoder::new(blob.contents.as_slice())
                    .take(limit + 1)
                    .read_to_end(&mut data)
                    .map_err(|e| RegistryError::Internal(format!("cannot gunzip {}: {}", blob.owner, e)))?;
                if data.len() as u64 > limit {
                    return Err(RegistryError::Internal(format!(
                        "contents of {} expand past {} bytes",
                        blob.owner, limit
                    )));
                }
                Ok(Self {
                    mime_type: mime_type.to_string(),
                    data,
                })
            }
            None => Ok(Self {
                mime_type: blob.mime_type,
                data: blob.contents,
            }),
        }
    }
}

/// Options of an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub mask: FieldMask,
    /// create the resource if it does not exist
    pub allow_missing: bool,
}

impl UpdateOptions {
    pub fn mask(mut self, mask: FieldMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn allow_missing(mut self, value: bool) -> Self {
        self.allow_missing = value;
        self
    }
}

/// A list request over one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// collection owner; ids may be `-` to list across owners
    pub parent: String,
    /// 0 for the default page size
    pub page_size: i32,
    /// empty for the first page
    pub page_token: String,
    /// empty to match everything
    pub filter: String,
    /// whether spec listings carry contents
    pub view: View,
}

impl ListRequest {
    pub fn new(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            ..Default::default()
        }
    }

    pub fn page_size(mut self, value: i32) -> Self {
        self.page_size = value;
        self
    }

    pub fn page_token(mut self, value: impl Into<String>) -> Self {
        self.page_token = value.into();
        self
    }

    pub fn filter(mut self, value: impl Into<String>) -> Self {
        self.filter = value.into();
        self
    }

    pub fn view(mut self, value: View) -> Self {
        self.view = value;
        self
    }
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    /// empty on the last page
    pub next_page_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_gzipped_contents_are_expanded() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"syntax = \"proto3\";").unwrap();
        let zipped = encoder.finish().unwrap();

        let blob = Blob::new("projects/p1/artifacts/protos", "application/x.protobuf+gzip", zipped).unwrap();
        let contents = Contents::from_blob(blob).unwrap();
        assert_eq!(contents.mime_type, "application/x.protobuf");
        assert_eq!(contents.data, b"syntax = \"proto3\";");
    }

    #[test]
    fn test_plain_contents_pass_through() {
        let blob = Blob::new("projects/p1/artifacts/readme", "text/plain", b"hi".to_vec()).unwrap();
        let contents = Contents::from_blob(blob).unwrap();
        assert_eq!(contents.mime_type, "text/plain");
        assert_eq!(contents.data, b"hi");
    }

    #[test]
    fn test_expansion_is_capped() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&vec![b'a'; 4096]).unwrap();
        let zipped = encoder.finish().unwrap();

        let blob = Blob::new("projects/p1/artifacts/big", "text/plain+gzip", zipped).unwrap();
        assert!(matches!(
            Contents::from_blob_with_limit(blob.clone(), 1024),
            Err(RegistryError::Internal(_))
        ));
        assert_eq!(Contents::from_blob_with_limit(blob, 4096).unwrap().data.len(), 4096);
    }

    #[test]
    fn test_corrupt_gzip_is_internal() {
        let blob = Blob::new("projects/p1/artifacts/x", "text/plain+gzip", b"not gzip".to_vec()).unwrap();
        assert!(matches!(Contents::from_blob(blob), Err(RegistryError::Internal(_))));
    }
}
