//! Mirror refresh signalling errors
//!
//! These never fail a write: a dropped signal is logged and counted, and
//! the stale mirror waits for the next write through its field.

use thiserror::Error;

pub type RelationResult<T> = Result<T, RelationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationError {
    #[error("mirror refresh queue is full")]
    QueueFull,

    #[error("mirror refresh queue is closed")]
    QueueClosed,
}

impl RelationError {
    pub fn code(&self) -> &'static str {
        match self {
            RelationError::QueueFull => "AERO_RELATION_REFRESH_QUEUE_FULL",
            RelationError::QueueClosed => "AERO_RELATION_REFRESH_QUEUE_CLOSED",
        }
    }
}
