//! Query construction errors
//!
//! Error codes:
//! - AERO_QUERY_UNKNOWN_FIELD
//! - AERO_QUERY_UNSUPPORTED_OPERAND

use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

/// A query that cannot be expressed against the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("kind '{kind}' has no field '{field}'")]
    UnknownField { kind: String, field: String },

    #[error("unsupported operand for '{field}': {reason}")]
    UnsupportedOperand { field: String, reason: String },
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnknownField { .. } => "AERO_QUERY_UNKNOWN_FIELD",
            QueryError::UnsupportedOperand { .. } => "AERO_QUERY_UNSUPPORTED_OPERAND",
        }
    }
}
