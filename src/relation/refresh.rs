//! Mirror refresh signals
//!
//! When a record that other kinds point at is rewritten, the mirrors
//! copied from it go stale. The resolver does not repair them; it hands a
//! `MirrorRefresh` to a sink and moves on. Whoever drains the sink (a task
//! runner outside this crate) rewrites the referring records.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::errors::{RelationError, RelationResult};
use crate::schema::Referrer;
use crate::value::Key;

/// "Refresh mirrors referencing `target`"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRefresh {
    /// The rewritten record
    pub target: Key,
    /// Relation fields that may hold a mirror of it
    pub referrers: Vec<Referrer>,
}

/// Receiver side of refresh signals.
///
/// `enqueue` must not block.
pub trait MirrorRefreshSink: Send + Sync {
    fn enqueue(&self, refresh: MirrorRefresh) -> RelationResult<()>;
}

/// Discards every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MirrorRefreshSink for NullSink {
    fn enqueue(&self, _refresh: MirrorRefresh) -> RelationResult<()> {
        Ok(())
    }
}

/// Bounded tokio channel; a full queue rejects the signal.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<MirrorRefresh>,
}

impl ChannelSink {
    /// Creates the sink and the receiver a worker drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<MirrorRefresh>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl MirrorRefreshSink for ChannelSink {
    fn enqueue(&self, refresh: MirrorRefresh) -> RelationResult<()> {
        self.tx.try_send(refresh).map_err(|e| match e {
            TrySendError::Full(_) => RelationError::QueueFull,
            TrySendError::Closed(_) => RelationError::QueueClosed,
        })
    }
}
