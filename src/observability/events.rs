//! Observable events
//!
//! Events are explicit and typed; the string form is the `event` key of
//! the log line.

use std::fmt;

/// Observable events of the record core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration loaded from disk
    ConfigLoaded,
    /// Schema registry finalized
    SchemasRegistered,
    /// A raw input was validated into a record
    RecordValidated,
    /// A stored value could not be decoded and was read as empty
    StorageDecodeAnomaly,
    /// A relation field references a key that does not exist
    RelationTargetMissing,
    /// A mirror refresh was handed to the task collaborator
    MirrorRefreshEnqueued,
    /// The task collaborator was gone; the refresh was dropped
    MirrorRefreshDropped,
    /// A record document was written inside a transaction
    RecordWritten,
    /// A transaction failed its commit-time version check
    TransactionConflict,
    /// A query page was materialized
    QueryPage,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasRegistered => "SCHEMAS_REGISTERED",
            Event::RecordValidated => "RECORD_VALIDATED",
            Event::StorageDecodeAnomaly => "STORAGE_DECODE_ANOMALY",
            Event::RelationTargetMissing => "RELATION_TARGET_MISSING",
            Event::MirrorRefreshEnqueued => "MIRROR_REFRESH_ENQUEUED",
            Event::MirrorRefreshDropped => "MIRROR_REFRESH_DROPPED",
            Event::RecordWritten => "RECORD_WRITTEN",
            Event::TransactionConflict => "TRANSACTION_CONFLICT",
            Event::QueryPage => "QUERY_PAGE",
        }
    }

    /// Returns true if the event signals degraded behavior
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::StorageDecodeAnomaly | Event::MirrorRefreshDropped | Event::TransactionConflict
        )
    }

    /// Returns true for high-volume events logged at TRACE
    pub fn is_chatty(&self) -> bool {
        matches!(self, Event::RecordValidated | Event::QueryPage)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
