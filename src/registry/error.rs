//! Registry errors.
//!
//! Every operation fails with exactly one of five kinds. Errors from the
//! lower layers are classified here, once.

use std::fmt;

use thiserror::Error;

use crate::filter::FilterError;
use crate::models::MaskError;
use crate::names::InvalidNameError;
use crate::paging::PageTokenError;
use crate::revisions::RevisionError;
use crate::storage::StorageError;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Error kind reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Unavailable,
    Internal,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::Unavailable => "UNAVAILABLE",
            Code::Internal => "INTERNAL",
        })
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    pub fn code(&self) -> Code {
        match self {
            RegistryError::InvalidArgument(_) => Code::InvalidArgument,
            RegistryError::NotFound(_) => Code::NotFound,
            RegistryError::AlreadyExists(_) => Code::AlreadyExists,
            RegistryError::Unavailable(_) => Code::Unavailable,
            RegistryError::Internal(_) => Code::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Code::NotFound
    }

    pub(crate) fn not_found(kind: &str, name: impl fmt::Display) -> Self {
        RegistryError::NotFound(format!("{} {:?}", kind, name.to_string()))
    }

    pub(crate) fn already_exists(kind: &str, name: impl fmt::Display) -> Self {
        RegistryError::AlreadyExists(format!("{} {:?}", kind, name.to_string()))
    }
}

impl From<StorageError> for RegistryError {
    fn from(e: StorageError) -> Self {
        if e.is_not_found() {
            RegistryError::NotFound(e.to_string())
        } else if e.is_unavailable() {
            RegistryError::Unavailable(e.to_string())
        } else {
            RegistryError::Internal(e.to_string())
        }
    }
}

impl From<InvalidNameError> for RegistryError {
    fn from(e: InvalidNameError) -> Self {
        RegistryError::InvalidArgument(e.to_string())
    }
}

impl From<MaskError> for RegistryError {
    fn from(e: MaskError) -> Self {
        RegistryError::InvalidArgument(e.to_string())
    }
}

impl From<FilterError> for RegistryError {
    fn from(e: FilterError) -> Self {
        RegistryError::InvalidArgument(format!("filter: {}", e))
    }
}

impl From<PageTokenError> for RegistryError {
    fn from(e: PageTokenError) -> Self {
        RegistryError::InvalidArgument(e.to_string())
    }
}

impl From<RevisionError> for RegistryError {
    fn from(e: RevisionError) -> Self {
        match e {
            RevisionError::NotFound { .. } => RegistryError::NotFound(e.to_string()),
            RevisionError::AlreadyExists { .. } => RegistryError::AlreadyExists(e.to_string()),
            RevisionError::InvalidArgument(message) => RegistryError::InvalidArgument(message),
            RevisionError::Name(e) => e.into(),
            RevisionError::Mask(e) => e.into(),
            RevisionError::Storage(e) => e.into(),
            RevisionError::Cascade { .. } => RegistryError::Internal(e.to_string()),
        }
    }
}
