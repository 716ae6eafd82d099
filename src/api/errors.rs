//! Repository errors
//!
//! Store and query errors pass through unchanged; their codes are
//! preserved. Invalid records are not errors: `save` reports them as
//! `SaveOutcome::Rejected` and the field errors stay on the record.

use thiserror::Error;

use crate::collection::QueryError;
use crate::store::StoreError;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("unknown kind '{0}'")]
    UnknownKind(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl RepositoryError {
    pub fn code(&self) -> &'static str {
        match self {
            RepositoryError::UnknownKind(_) => "AERO_UNKNOWN_KIND",
            RepositoryError::Store(e) => e.code(),
            RepositoryError::Query(e) => e.code(),
        }
    }

    /// True for a commit-time conflict the caller may retry.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RepositoryError::Store(StoreError::TransactionConflict { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through() {
        let err: RepositoryError = StoreError::TransactionConflict {
            key: "Person/1".into(),
        }
        .into();
        assert_eq!(err.code(), "AERO_STORE_TRANSACTION_CONFLICT");
        assert!(err.is_conflict());

        let err: RepositoryError = QueryError::UnknownField {
            kind: "Person".into(),
            field: "x".into(),
        }
        .into();
        assert_eq!(err.code(), "AERO_QUERY_UNKNOWN_FIELD");
        assert!(!err.is_conflict());

        assert_eq!(
            RepositoryError::UnknownKind("Ghost".into()).code(),
            "AERO_UNKNOWN_KIND"
        );
    }
}
