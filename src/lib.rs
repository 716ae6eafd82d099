//! aerorecord - typed records over a schemaless document store
//!
//! Schemas declare entity shapes. Untyped input is validated into
//! records that carry both values and field errors, records are mapped
//! to and from the document shape the store persists, and relations
//! between kinds are resolved at write time into a reference key plus a
//! mirror of selected target fields.

pub mod api;
pub mod collection;
pub mod config;
pub mod observability;
pub mod record;
pub mod relation;
pub mod schema;
pub mod serialize;
pub mod store;
pub mod validation;
pub mod value;

pub use api::{Repository, RepositoryError, RepositoryResult, SaveOutcome};
pub use collection::{Query, RecordCollection};
pub use config::CoreConfig;
pub use record::{FieldError, Reason, Record};
pub use schema::{FieldDescriptor, FieldKind, Schema, SchemaRegistry};
pub use store::{DocumentStore, MemoryStore, Transaction};
pub use value::{FieldSlot, Key, Value};
