//! Serialization engine
//!
//! Maps records to the document shape the store persists and back.
//!
//! Storage shapes:
//! - plain field: scalar
//! - `multiple`: array
//! - `languages`: object language → value
//! - `multiple` + `languages`: object language → array
//! - relation: `{"reference_key": "kind/id", "mirror": {..}}`
//! - case-insensitive string: `{"val": .., "idx": lowercase}`
//! - datetime: RFC 3339 UTC string
//! - nested record: object
//!
//! `from_storage(schema, to_storage(r))` reproduces the typed values of
//! every record without errors.

mod decode;
mod encode;

pub use decode::from_storage;
pub use encode::to_storage;
