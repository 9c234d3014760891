//! Resource name errors.

use thiserror::Error;

/// Result type for name parsing and validation.
pub type NameResult<T> = Result<T, InvalidNameError>;

/// A resource name or identifier that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidNameError {
    #[error("invalid {kind} name {name:?}: expected {pattern}")]
    Malformed {
        kind: &'static str,
        name: String,
        pattern: &'static str,
    },

    #[error("invalid identifier {id:?}: must be 1-63 characters of [a-z0-9-.], starting and ending with a letter or digit")]
    InvalidIdentifier { id: String },

    #[error("wildcard '-' is not allowed in {0:?}")]
    WildcardNotAllowed(String),
}

impl InvalidNameError {
    pub(crate) fn malformed(kind: &'static str, name: &str, pattern: &'static str) -> Self {
        Self::Malformed {
            kind,
            name: name.to_string(),
            pattern,
        }
    }
}
