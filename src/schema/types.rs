//! Field descriptor definitions
//!
//! Supported kinds:
//! - str: UTF-8 string with optional length bounds and case-insensitive indexing
//! - email: string in mail address syntax
//! - int / float: numbers with optional bounds
//! - bool
//! - select: string from a fixed choice list
//! - datetime: UTC timestamp, optionally stamped on create or update
//! - relation: reference to another kind plus a mirrored field subset
//! - record: nested record with its own schema

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::schema::Schema;
use crate::value::{FieldSlot, Value};

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Str {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        /// When false the store receives a lower-cased index copy
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    Email,
    Int {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Float {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Bool,
    Select { choices: Vec<String> },
    DateTime {
        #[serde(default)]
        auto_now: AutoNow,
    },
    Relation {
        /// Target entity kind
        target: String,
        /// Target fields copied into the relation value
        #[serde(default)]
        mirror: Vec<String>,
    },
    Record { schema: Box<Schema> },
}

fn default_true() -> bool {
    true
}

impl FieldKind {
    /// Plain case-sensitive string without bounds.
    pub fn string() -> Self {
        FieldKind::Str {
            min_length: None,
            max_length: None,
            case_sensitive: true,
        }
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Str { .. } => "str",
            FieldKind::Email => "email",
            FieldKind::Int { .. } => "int",
            FieldKind::Float { .. } => "float",
            FieldKind::Bool => "bool",
            FieldKind::Select { .. } => "select",
            FieldKind::DateTime { .. } => "datetime",
            FieldKind::Relation { .. } => "relation",
            FieldKind::Record { .. } => "record",
        }
    }

    /// Kind-specific blank: a value that is present but counts as "no
    /// value" for the required check.
    pub fn is_blank(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::Str { .. } | FieldKind::Email | FieldKind::Select { .. }, Value::Str(s)) => {
                s.is_empty()
            }
            (_, Value::Raw(serde_json::Value::Null)) => true,
            _ => false,
        }
    }
}

/// When a datetime field stamps the current time by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoNow {
    #[default]
    Never,
    /// Only when no existing record is given
    OnCreate,
    /// On every validation
    OnUpdate,
}

/// Closure producing a raw default value at validation time.
pub type DefaultGenerator = Arc<dyn Fn() -> serde_json::Value + Send + Sync>;

/// Default applied to a field that is neither submitted nor carried over.
///
/// Defaults are raw JSON and pass through the same coercion as input.
#[derive(Clone, Default)]
pub enum DefaultValue {
    #[default]
    None,
    Static(serde_json::Value),
    Generator(DefaultGenerator),
}

impl DefaultValue {
    pub fn is_none(&self) -> bool {
        matches!(self, DefaultValue::None)
    }

    /// Produces the raw default, if any.
    pub fn produce(&self) -> Option<serde_json::Value> {
        match self {
            DefaultValue::None => None,
            DefaultValue::Static(v) => Some(v.clone()),
            DefaultValue::Generator(g) => Some(g()),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::None => write!(f, "None"),
            DefaultValue::Static(v) => write!(f, "Static({})", v),
            DefaultValue::Generator(_) => write!(f, "Generator(..)"),
        }
    }
}

impl PartialEq for DefaultValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DefaultValue::None, DefaultValue::None) => true,
            (DefaultValue::Static(a), DefaultValue::Static(b)) => a == b,
            (DefaultValue::Generator(a), DefaultValue::Generator(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// Schema files carry static defaults only; generators exist in code.
impl Serialize for DefaultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DefaultValue::Static(v) => v.serialize(serializer),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw {
            serde_json::Value::Null => DefaultValue::None,
            other => DefaultValue::Static(other),
        })
    }
}

/// Caller-supplied predicate run after type coercion succeeded.
///
/// Returns `Some(reason)` when the value is rejected.
#[derive(Clone)]
pub struct FieldCheck {
    name: String,
    check: Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>,
}

impl FieldCheck {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, value: &Value) -> Option<String> {
        (self.check)(value)
    }
}

impl fmt::Debug for FieldCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldCheck({})", self.name)
    }
}

impl PartialEq for FieldCheck {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.check, &other.check)
    }
}

/// One named, typed attribute of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Holds an ordered sequence instead of one value
    #[serde(default)]
    pub multiple: bool,
    /// An empty sequence satisfies `required`
    #[serde(default)]
    pub allow_empty_sequence: bool,
    /// Fixed ordered language codes, one value (or sequence) per language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    /// Advisory to the store
    #[serde(default)]
    pub indexed: bool,
    /// Once stored with a value, later submissions are refused
    #[serde(default)]
    pub write_once: bool,
    #[serde(default, skip_serializing_if = "DefaultValue::is_none")]
    pub default: DefaultValue,
    #[serde(skip)]
    pub checks: Vec<FieldCheck>,
}

impl FieldDescriptor {
    /// Creates an optional single-valued field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            multiple: false,
            allow_empty_sequence: false,
            languages: None,
            indexed: false,
            write_once: false,
            default: DefaultValue::None,
            checks: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::string())
    }

    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int { min: None, max: None })
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float { min: None, max: None })
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn select<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            FieldKind::Select {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::DateTime {
                auto_now: AutoNow::Never,
            },
        )
    }

    /// Relation to `target`, mirroring the listed target fields.
    pub fn relation<I, S>(name: impl Into<String>, target: impl Into<String>, mirror: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            FieldKind::Relation {
                target: target.into(),
                mirror: mirror.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Nested record field.
    pub fn record(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(
            name,
            FieldKind::Record {
                schema: Box::new(schema),
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn allow_empty_sequence(mut self) -> Self {
        self.allow_empty_sequence = true;
        self
    }

    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn write_once(mut self) -> Self {
        self.write_once = true;
        self
    }

    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = DefaultValue::Static(value);
        self
    }

    pub fn default_with(
        mut self,
        generator: impl Fn() -> serde_json::Value + Send + Sync + 'static,
    ) -> Self {
        self.default = DefaultValue::Generator(Arc::new(generator));
        self
    }

    pub fn check(
        mut self,
        name: impl Into<String>,
        check: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.checks.push(FieldCheck::new(name, check));
        self
    }

    /// Sets the minimum length of a `str` field; other kinds are unchanged.
    pub fn min_length(mut self, n: usize) -> Self {
        if let FieldKind::Str { min_length, .. } = &mut self.kind {
            *min_length = Some(n);
        }
        self
    }

    /// Sets the maximum length of a `str` field; other kinds are unchanged.
    pub fn max_length(mut self, n: usize) -> Self {
        if let FieldKind::Str { max_length, .. } = &mut self.kind {
            *max_length = Some(n);
        }
        self
    }

    /// Makes a `str` field case-insensitive for queries.
    pub fn case_insensitive(mut self) -> Self {
        if let FieldKind::Str { case_sensitive, .. } = &mut self.kind {
            *case_sensitive = false;
        }
        self
    }

    /// Sets integer bounds; other kinds are unchanged.
    pub fn int_range(mut self, lo: Option<i64>, hi: Option<i64>) -> Self {
        if let FieldKind::Int { min, max } = &mut self.kind {
            *min = lo;
            *max = hi;
        }
        self
    }

    /// Sets float bounds; other kinds are unchanged.
    pub fn float_range(mut self, lo: Option<f64>, hi: Option<f64>) -> Self {
        if let FieldKind::Float { min, max } = &mut self.kind {
            *min = lo;
            *max = hi;
        }
        self
    }

    /// Sets the auto-stamp mode of a `datetime` field.
    pub fn auto_now(mut self, mode: AutoNow) -> Self {
        if let FieldKind::DateTime { auto_now } = &mut self.kind {
            *auto_now = mode;
        }
        self
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Relation { .. })
    }

    /// Returns the declared languages, or an empty slice.
    pub fn language_codes(&self) -> &[String] {
        self.languages.as_deref().unwrap_or(&[])
    }

    /// True if the slot satisfies `required`: every declared language (if
    /// any) holds a non-blank value or a non-empty sequence.
    pub fn is_filled(&self, slot: &FieldSlot) -> bool {
        if self.languages.is_some() {
            self.language_codes()
                .iter()
                .all(|lang| self.is_filled_plain(slot.language(lang)))
        } else {
            self.is_filled_plain(slot)
        }
    }

    /// Required check for a slot without the language layer.
    pub fn is_filled_plain(&self, slot: &FieldSlot) -> bool {
        match slot {
            FieldSlot::Empty | FieldSlot::Languages(_) => false,
            FieldSlot::Single(v) => !self.kind.is_blank(v),
            FieldSlot::Multiple(values) => {
                (self.allow_empty_sequence && values.is_empty())
                    || values.iter().any(|v| !self.kind.is_blank(v))
            }
        }
    }
}
