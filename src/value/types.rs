//! In-memory field values
//!
//! `Value` is the closed set of typed values a field can hold. `FieldSlot`
//! adds cardinality and language variance on top of it. Only the
//! validation and serialization engines construct values from untyped
//! JSON or take them apart again.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::key::Key;

/// A storable document: field name to storage-shaped JSON.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field name to slot, for one record or one nested record.
pub type Values = BTreeMap<String, FieldSlot>;

/// A single typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    Relation(RelationValue),
    /// Nested record
    Record(Values),
    /// Input that failed coercion, kept verbatim for redisplay
    Raw(serde_json::Value),
}

impl Value {
    /// Returns the variant name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::DateTime(_) => "datetime",
            Value::Relation(_) => "relation",
            Value::Record(_) => "record",
            Value::Raw(_) => "raw",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&RelationValue> {
        match self {
            Value::Relation(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Value::Raw(_))
    }
}

/// Value of a relation field: the authoritative reference key plus a
/// mirror of selected target fields captured at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationValue {
    pub key: Key,
    /// Storage-shaped subset of the target document
    pub mirror: Document,
}

impl RelationValue {
    /// A reference that has not been resolved yet.
    pub fn unresolved(key: Key) -> Self {
        Self {
            key,
            mirror: Document::new(),
        }
    }

    /// Returns one mirrored field as stored.
    pub fn mirror_field(&self, name: &str) -> Option<&serde_json::Value> {
        self.mirror.get(name)
    }
}

/// The state of one field in a record.
///
/// `Empty` is the "not submitted / no value" sentinel and is distinct
/// from a submitted empty string or an empty sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldSlot {
    #[default]
    Empty,
    Single(Value),
    Multiple(Vec<Value>),
    /// Language code to a non-language slot (`Empty`, `Single` or `Multiple`)
    Languages(BTreeMap<String, FieldSlot>),
}

impl FieldSlot {
    /// Structural emptiness: no value at all, an empty sequence, or every
    /// language empty. Kind-specific blanks such as `""` are judged by the
    /// field descriptor.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldSlot::Empty => true,
            FieldSlot::Single(_) => false,
            FieldSlot::Multiple(values) => values.is_empty(),
            FieldSlot::Languages(langs) => langs.values().all(FieldSlot::is_empty),
        }
    }

    pub fn as_single(&self) -> Option<&Value> {
        match self {
            FieldSlot::Single(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_multiple(&self) -> Option<&[Value]> {
        match self {
            FieldSlot::Multiple(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the slot of one language, or `Empty` if absent.
    pub fn language(&self, lang: &str) -> &FieldSlot {
        match self {
            FieldSlot::Languages(langs) => langs.get(lang).unwrap_or(&FieldSlot::Empty),
            _ => &FieldSlot::Empty,
        }
    }

    /// Visits every value in the slot with its language and sequence index.
    pub fn for_each_value<'a>(&'a self, mut f: impl FnMut(Option<&'a str>, Option<usize>, &'a Value)) {
        self.walk(None, &mut f);
    }

    fn walk<'a>(
        &'a self,
        lang: Option<&'a str>,
        f: &mut impl FnMut(Option<&'a str>, Option<usize>, &'a Value),
    ) {
        match self {
            FieldSlot::Empty => {}
            FieldSlot::Single(v) => f(lang, None, v),
            FieldSlot::Multiple(values) => {
                for (i, v) in values.iter().enumerate() {
                    f(lang, Some(i), v);
                }
            }
            FieldSlot::Languages(langs) => {
                for (code, slot) in langs {
                    slot.walk(Some(code.as_str()), f);
                }
            }
        }
    }

    /// Mutable counterpart of [`FieldSlot::for_each_value`].
    pub fn for_each_value_mut(&mut self, mut f: impl FnMut(Option<&str>, Option<usize>, &mut Value)) {
        self.walk_mut(None, &mut f);
    }

    fn walk_mut(
        &mut self,
        lang: Option<&str>,
        f: &mut impl FnMut(Option<&str>, Option<usize>, &mut Value),
    ) {
        match self {
            FieldSlot::Empty => {}
            FieldSlot::Single(v) => f(lang, None, v),
            FieldSlot::Multiple(values) => {
                for (i, v) in values.iter_mut().enumerate() {
                    f(lang, Some(i), v);
                }
            }
            FieldSlot::Languages(langs) => {
                for (code, slot) in langs.iter_mut() {
                    slot.walk_mut(Some(code.as_str()), f);
                }
            }
        }
    }
}
