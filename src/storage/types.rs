//! core type-safe wrappers around git primitives for the storage layer.

use std::fmt;
use std::fmt::Formatter;

use git2::Oid;
use serde::{Deserialize, Serialize};

/// This makes sure we don't accidentally pass a blob ID where a commit ID
/// is expected. The inner Oid is only accessible within the storage module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// raw Oid (for internal use only)
    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// short form of the commit ID
    pub fn short(&self) -> String {
        self.0.to_string()[..7].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git blob identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(pub(crate) Oid);

impl BlobId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git tree identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub(crate) Oid);

impl TreeId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated table name.
///
/// Each entity kind lives in its own table, which is a top-level directory of
/// the repository tree.
///
/// Valid names:
/// - 1-64 characters
/// - Lowercase alphanumeric and underscores only
/// - Must start with a letter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName(String);

impl TableName {
    /// create a new TableName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidKeyError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), InvalidKeyError> {
        let first_char = name.chars().next().ok_or(InvalidKeyError::Empty)?;

        if name.len() > 64 {
            return Err(InvalidKeyError::TooLong(name.len()));
        }

        if !first_char.is_ascii_lowercase() {
            return Err(InvalidKeyError::InvalidStart(first_char));
        }

        for (i, c) in name.chars().enumerate() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '_' {
                return Err(InvalidKeyError::InvalidCharacter { char: c, position: i });
            }
        }

        Ok(())
    }

    /// get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated row key.
///
/// Row keys are used as filenames inside a table directory. Resource names
/// contain `/`, which git does not allow inside a tree entry name, so the
/// separator is stored as `~`. Resource identifiers never contain `~`, which
/// keeps the encoding reversible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey(String);

impl RowKey {
    const SEPARATOR: char = '~';

    pub fn new(key: impl Into<String>) -> Result<Self, InvalidKeyError> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    /// Build the key for a resource name such as `projects/p1/apis/a1`.
    pub fn from_name(name: &str) -> Result<Self, InvalidKeyError> {
        if name.contains(Self::SEPARATOR) {
            return Err(InvalidKeyError::InvalidCharacter {
                char: Self::SEPARATOR,
                position: name.find(Self::SEPARATOR).unwrap_or_default(),
            });
        }
        Self::new(name.replace('/', "~"))
    }

    fn validate(key: &str) -> Result<(), InvalidKeyError> {
        if key.is_empty() {
            return Err(InvalidKeyError::Empty);
        }

        if key.len() > 1024 {
            return Err(InvalidKeyError::TooLong(key.len()));
        }

        for (i, c) in key.chars().enumerate() {
            let allowed = c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '~' | '@');
            if !allowed {
                return Err(InvalidKeyError::InvalidCharacter { char: c, position: i });
            }
        }

        Ok(())
    }

    /// the resource name this key was built from
    pub fn name(&self) -> String {
        self.0.replace(Self::SEPARATOR, "/")
    }

    /// get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RowKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// a branch name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// the main branch name
    pub const MAIN: &'static str = "main";

    /// create the main branch reference
    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    /// get the full ref path (e.g., "refs/heads/main")
    pub fn as_ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// get the short name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// git signature (author/committer info)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSignature {
    pub name: String,
    pub email: String,
}

impl GitSignature {
    /// create a new signature
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// default signature for registry commits
    pub fn registry() -> Self {
        Self::new("apiregistry", "registry@localhost")
    }

    /// convert to git2::Signature
    pub(crate) fn to_git2_signature(&self) -> Result<git2::Signature<'static>, git2::Error> {
        git2::Signature::now(&self.name, &self.email)
    }
}

impl Default for GitSignature {
    fn default() -> Self {
        Self::registry()
    }
}

/// error type for invalid table names and row keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidKeyError {
    Empty,
    TooLong(usize),
    InvalidStart(char),
    InvalidCharacter { char: char, position: usize },
}

impl fmt::Display for InvalidKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "key cannot be empty"),
            Self::TooLong(len) => write!(f, "key too long: {} characters", len),
            Self::InvalidStart(c) => write!(f, "key cannot start with '{}'", c),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character '{}' at position {}", char, position)
            }
        }
    }
}

impl std::error::Error for InvalidKeyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_valid() {
        assert!(TableName::new("specs").is_ok());
        assert!(TableName::new("spec_revision_tags").is_ok());
    }

    #[test]
    fn test_table_name_invalid() {
        assert!(TableName::new("").is_err());
        assert!(TableName::new("1specs").is_err());
        assert!(TableName::new("specs/x").is_err());
        assert!(TableName::new("Specs").is_err());
        assert!(TableName::new("a".repeat(65)).is_err());
    }

    #[test]
    fn test_row_key_from_name() {
        let key = RowKey::from_name("projects/p1/apis/a1/versions/v1/specs/s1@1a2b3c4d").unwrap();
        assert_eq!(key.as_str(), "projects~p1~apis~a1~versions~v1~specs~s1@1a2b3c4d");
        assert_eq!(key.name(), "projects/p1/apis/a1/versions/v1/specs/s1@1a2b3c4d");
    }

    #[test]
    fn test_row_key_rejects_separator_in_name() {
        assert!(RowKey::from_name("projects/p~1").is_err());
        assert!(RowKey::new("has space").is_err());
        assert!(RowKey::new("").is_err());
    }

    #[test]
    fn test_branch_name_main() {
        let branch = BranchName::main();
        assert_eq!(branch.as_ref_path(), "refs/heads/main");
    }
}
