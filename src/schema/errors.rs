//! Schema error types
//!
//! Every schema error is a programmer error detected at declaration or
//! registry-build time. None of them is recoverable at runtime.
//!
//! Error codes:
//! - AERO_SCHEMA_INVALID_DECLARATION
//! - AERO_SCHEMA_INVALID_DEFAULT
//! - AERO_SCHEMA_DUPLICATE
//! - AERO_SCHEMA_UNRESOLVED_RELATION
//! - AERO_SCHEMA_MALFORMED_FILE

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema declaration failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Entity kind name is empty
    #[error("schema kind must not be empty")]
    EmptyKind,

    /// Two fields share a name
    #[error("duplicate field '{field}' in schema '{kind}'")]
    DuplicateField { kind: String, field: String },

    /// A descriptor is internally inconsistent
    #[error("field '{field}' of '{kind}': {reason}")]
    InvalidDescriptor {
        kind: String,
        field: String,
        reason: String,
    },

    /// A language code is malformed or repeated
    #[error("field '{field}' of '{kind}' declares invalid language '{language}'")]
    InvalidLanguage {
        kind: String,
        field: String,
        language: String,
    },

    /// The declared default fails the field's own validation
    #[error("default of field '{field}' in '{kind}' fails validation: {reason}")]
    InvalidDefault {
        kind: String,
        field: String,
        reason: String,
    },

    /// A required field defaults to a value that counts as empty
    #[error("required field '{field}' in '{kind}' defaults to an empty value")]
    RequiredEmptyDefault { kind: String, field: String },

    /// The same kind was registered twice
    #[error("schema '{0}' is already registered")]
    DuplicateKind(String),

    /// A relation targets a kind that is not registered
    #[error("relation '{field}' of '{kind}' targets unknown kind '{target}'")]
    UnknownTarget {
        kind: String,
        field: String,
        target: String,
    },

    /// A relation mirrors a field its target does not declare
    #[error("relation '{field}' of '{kind}' mirrors '{mirror}', which '{target}' does not declare")]
    UnknownMirrorField {
        kind: String,
        field: String,
        target: String,
        mirror: String,
    },

    /// A schema definition file could not be read or parsed
    #[error("malformed schema file '{path}': {reason}")]
    MalformedFile { path: String, reason: String },
}

impl SchemaError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::EmptyKind
            | SchemaError::DuplicateField { .. }
            | SchemaError::InvalidDescriptor { .. }
            | SchemaError::InvalidLanguage { .. } => "AERO_SCHEMA_INVALID_DECLARATION",
            SchemaError::InvalidDefault { .. } | SchemaError::RequiredEmptyDefault { .. } => {
                "AERO_SCHEMA_INVALID_DEFAULT"
            }
            SchemaError::DuplicateKind(_) => "AERO_SCHEMA_DUPLICATE",
            SchemaError::UnknownTarget { .. } | SchemaError::UnknownMirrorField { .. } => {
                "AERO_SCHEMA_UNRESOLVED_RELATION"
            }
            SchemaError::MalformedFile { .. } => "AERO_SCHEMA_MALFORMED_FILE",
        }
    }

    pub(crate) fn descriptor(kind: &str, field: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidDescriptor {
            kind: kind.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
