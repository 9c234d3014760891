//! Transaction error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Transaction ran past the configured timeout and was rolled back.
    #[error("transaction {tx_id} timed out after {elapsed_ms}ms")]
    Timeout { tx_id: String, elapsed_ms: u128 },

    /// Internal error.
    #[error("internal transaction error: {0}")]
    Internal(String),
}

impl TransactionError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransactionError::Storage(e) => e.is_retriable(),
            TransactionError::Timeout { .. } => true,
            TransactionError::Internal(_) => false,
        }
    }
}

impl From<TransactionError> for StorageError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Storage(inner) => inner,
            other => StorageError::Transaction(other.to_string()),
        }
    }
}
