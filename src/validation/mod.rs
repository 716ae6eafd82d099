//! Validation engine
//!
//! Converts untyped input into a typed `Record`, collecting every failure
//! as a field error instead of stopping at the first one.
//!
//! Per field, in declaration order:
//! 1. Look up the submitted value (`name`, or `name.lang` keys)
//! 2. Otherwise carry over the existing value, auto-stamp or default
//! 3. Coerce per language and per sequence element
//! 4. Run custom checks on coerced values
//! 5. Check `required` per declared language

mod coerce;
mod email;
mod validator;

use std::sync::{Arc, OnceLock};

use crate::config::CoreConfig;
use crate::record::Record;
use crate::schema::Schema;
use crate::value::Document;

pub use email::is_valid_email;
pub use validator::Validator;

pub(crate) use validator::check_default;

static DEFAULT_CONFIG: OnceLock<CoreConfig> = OnceLock::new();

/// Validates with the default configuration.
pub fn validate(schema: &Arc<Schema>, raw: &Document, existing: Option<&Record>) -> Record {
    let config = DEFAULT_CONFIG.get_or_init(CoreConfig::default);
    Validator::new(config).validate(schema, raw, existing)
}
