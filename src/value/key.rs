//! Record keys
//!
//! A key is the store's native identity of one document: the entity kind
//! plus an opaque id. Its string form is `kind/id`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store key of a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    kind: String,
    id: String,
}

impl Key {
    /// Creates a key from its parts.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Allocates a fresh random key for a not-yet-created record.
    pub fn allocate(kind: impl Into<String>) -> Self {
        Self::new(kind, Uuid::new_v4().simple().to_string())
    }

    /// Parses the `kind/id` string form.
    ///
    /// Returns `None` if either part is empty or the separator is missing.
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, id) = s.split_once('/')?;
        if kind.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::new(kind, id))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let key = Key::new("Person", "K");
        assert_eq!(key.to_string(), "Person/K");
        assert_eq!(Key::parse("Person/K"), Some(key));
    }

    #[test]
    fn test_parse_keeps_slashes_in_id() {
        let key = Key::parse("File/a/b").unwrap();
        assert_eq!(key.kind(), "File");
        assert_eq!(key.id(), "a/b");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Key::parse("nokind").is_none());
        assert!(Key::parse("/id").is_none());
        assert!(Key::parse("Person/").is_none());
    }

    #[test]
    fn test_allocate_is_unique() {
        let a = Key::allocate("Person");
        let b = Key::allocate("Person");
        assert_eq!(a.kind(), "Person");
        assert_ne!(a, b);
    }
}
