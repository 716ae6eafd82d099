//! Records: typed instances of a schema plus their per-field failures

mod errors;
#[allow(clippy::module_inception)]
mod record;

pub use errors::{FieldError, Reason};
pub use record::Record;
