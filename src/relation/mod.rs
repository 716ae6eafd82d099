//! Relation resolver
//!
//! A relation value is a reference key plus a mirror: a copy of selected
//! target fields taken at write time. The key is authoritative; the
//! mirror is a cache that may go stale until the next write through the
//! field or an external refresh pass.

mod errors;
mod refresh;
mod resolver;

pub use errors::{RelationError, RelationResult};
pub use refresh::{ChannelSink, MirrorRefresh, MirrorRefreshSink, NullSink};
pub use resolver::RelationResolver;
