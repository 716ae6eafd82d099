//! Typed values held by records
//!
//! The schemaless store hands back arbitrary JSON; inside the core every
//! field value is one of a closed set of variants.

mod key;
mod types;

pub use key::Key;
pub use types::{Document, FieldSlot, RelationValue, Value, Values};
