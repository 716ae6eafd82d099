//! Repository layer
//!
//! The entry point for embedders: validation, relation resolution,
//! serialization and store access behind one handle.
//!
//! # Write path
//!
//! 1. `validate` raw input into a `Record`
//! 2. `save` inside a caller-owned transaction: resolve relations,
//!    serialize, put, signal mirror refreshes
//! 3. commit; a conflict surfaces unchanged
//! 4. `SaveOutcome::apply_to` gives a created record its key
//!
//! # Read path
//!
//! `load` and `query` decode stored documents without touching relation
//! targets.

mod errors;
mod repository;

pub use errors::{RepositoryError, RepositoryResult};
pub use repository::{Repository, SaveOutcome};
