//! Field-scoped validation failures
//!
//! These are not Rust errors: they are accumulated in `Record.errors` and
//! the record is still returned. A handler re-renders the submitted form
//! from the record's values and these failures.

use std::fmt;

/// Why a field value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// No value for a required field (or language)
    Required,
    /// Value cannot be coerced to the declared kind
    InvalidType { expected: &'static str },
    /// `multiple` field received something other than a sequence
    NotASequence,
    /// `languages` field received something other than a mapping
    NotAMapping,
    TooShort { min: usize },
    TooLong { max: usize },
    OutOfRange,
    NotAChoice,
    InvalidEmail,
    InvalidDate,
    /// Relation key names a different kind than the field targets
    WrongTargetKind { expected: String },
    /// Relation key does not exist in the store
    TargetMissing,
    /// Write-once field already holds a value
    ReadOnly,
    /// Rejected by a caller-supplied check
    Custom(String),
}

impl Reason {
    /// Returns the stable reason code
    pub fn code(&self) -> &str {
        match self {
            Reason::Required => "required",
            Reason::InvalidType { .. } => "invalid_type",
            Reason::NotASequence => "not_a_sequence",
            Reason::NotAMapping => "not_a_mapping",
            Reason::TooShort { .. } => "too_short",
            Reason::TooLong { .. } => "too_long",
            Reason::OutOfRange => "out_of_range",
            Reason::NotAChoice => "not_a_choice",
            Reason::InvalidEmail => "invalid_email",
            Reason::InvalidDate => "invalid_date",
            Reason::WrongTargetKind { .. } => "wrong_target_kind",
            Reason::TargetMissing => "target missing",
            Reason::ReadOnly => "readonly",
            Reason::Custom(code) => code,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::InvalidType { expected } => write!(f, "expected {}", expected),
            Reason::TooShort { min } => write!(f, "shorter than {} characters", min),
            Reason::TooLong { max } => write!(f, "longer than {} characters", max),
            Reason::WrongTargetKind { expected } => write!(f, "expected a key of kind {}", expected),
            other => write!(f, "{}", other.code()),
        }
    }
}

/// One failure on one field, optionally narrowed to a language, a
/// sequence position and a nested field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub reason: Reason,
    pub language: Option<String>,
    pub index: Option<usize>,
    /// Dotted path inside a nested record
    pub path: Option<String>,
}

impl FieldError {
    pub fn new(reason: Reason) -> Self {
        Self {
            reason,
            language: None,
            index: None,
            path: None,
        }
    }

    pub fn in_language(mut self, language: Option<&str>) -> Self {
        self.language = language.map(str::to_string);
        self
    }

    pub fn at_index(mut self, index: Option<usize>) -> Self {
        self.index = index;
        self
    }

    /// Prefixes the nested path with `segment`.
    pub fn nested_under(mut self, segment: &str) -> Self {
        self.path = Some(match self.path.take() {
            Some(rest) => format!("{}.{}", segment, rest),
            None => segment.to_string(),
        });
        self
    }

    /// Reason code scoped to the language, e.g. `required:de`.
    pub fn code(&self) -> String {
        match &self.language {
            Some(lang) => format!("{}:{}", self.reason.code(), lang),
            None => self.reason.code().to_string(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: ", path)?;
        }
        if let Some(index) = self.index {
            write!(f, "[{}] ", index)?;
        }
        write!(f, "{}", self.reason)?;
        if let Some(lang) = &self.language {
            write!(f, " ({})", lang)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_with_language() {
        let err = FieldError::new(Reason::Required).in_language(Some("de"));
        assert_eq!(err.code(), "required:de");
        assert_eq!(FieldError::new(Reason::TargetMissing).code(), "target missing");
    }

    #[test]
    fn test_custom_reason_code() {
        assert_eq!(Reason::Custom("not_upper".into()).code(), "not_upper");
    }

    #[test]
    fn test_nested_path_prefixing() {
        let err = FieldError::new(Reason::Required)
            .nested_under("city")
            .nested_under("address");
        assert_eq!(err.path.as_deref(), Some("address.city"));
        assert_eq!(err.to_string(), "address.city: required");
    }

    #[test]
    fn test_display_with_index() {
        let err = FieldError::new(Reason::TooLong { max: 3 }).at_index(Some(2));
        assert_eq!(err.to_string(), "[2] longer than 3 characters");
    }
}
