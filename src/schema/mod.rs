//! Schema subsystem
//!
//! Entity shapes are declared once, checked at declaration time and frozen
//! into a registry that every other subsystem reads without locking.
//!
//! # Design Principles
//!
//! - Field order is significant
//! - Descriptors are immutable after declaration
//! - Schemas share descriptors by value, never by reference
//! - Declaration errors are fatal programmer errors

mod errors;
mod registry;
#[allow(clippy::module_inception)]
mod schema;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use registry::{Referrer, SchemaRegistry, SchemaRegistryBuilder};
pub use schema::Schema;
pub use types::{AutoNow, DefaultGenerator, DefaultValue, FieldCheck, FieldDescriptor, FieldKind};
