//! Document store errors
//!
//! Store errors abort the enclosing operation. Nothing here is retried by
//! the core; callers decide using `is_transient`.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A key read or written by the transaction changed before commit
    #[error("transaction conflict on '{key}'")]
    TransactionConflict { key: String },

    /// The backend cannot serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Cursor is malformed or belongs to a different query
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

impl StoreError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::TransactionConflict { .. } => "AERO_STORE_TRANSACTION_CONFLICT",
            StoreError::Unavailable(_) => "AERO_STORE_UNAVAILABLE",
            StoreError::InvalidCursor(_) => "AERO_STORE_INVALID_CURSOR",
        }
    }

    /// True if repeating the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::TransactionConflict { .. } | StoreError::Unavailable(_)
        )
    }
}
