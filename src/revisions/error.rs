use thiserror::Error;

use crate::models::MaskError;
use crate::names::InvalidNameError;
use crate::storage::StorageError;

pub type RevisionResult<T> = Result<T, RevisionError>;

#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cascade delete of {name:?} stopped at {step}: {source}")]
    Cascade {
        name: String,
        step: &'static str,
        #[source]
        source: Box<RevisionError>,
    },

    #[error(transparent)]
    Name(#[from] InvalidNameError),

    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RevisionError {
    pub fn not_found(kind: &'static str, name: impl ToString) -> Self {
        RevisionError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub fn already_exists(kind: &'static str, name: impl ToString) -> Self {
        RevisionError::AlreadyExists {
            kind,
            name: name.to_string(),
        }
    }
}
