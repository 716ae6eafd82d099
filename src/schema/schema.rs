//! Schema declaration
//!
//! A schema is the ordered, immutable set of field descriptors of one
//! entity kind. Field order drives validation order and serialization
//! order.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::types::{FieldDescriptor, FieldKind};

/// Declared shape of one entity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SchemaDef", into = "SchemaDef")]
pub struct Schema {
    kind: String,
    description: Option<String>,
    fields: Vec<FieldDescriptor>,
    positions: HashMap<String, usize>,
}

/// Serialized form of a schema file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaDef {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    fields: Vec<FieldDescriptor>,
}

impl TryFrom<SchemaDef> for Schema {
    type Error = SchemaError;

    fn try_from(def: SchemaDef) -> SchemaResult<Self> {
        let mut schema = Schema::declare(def.kind, def.fields)?;
        schema.description = def.description;
        Ok(schema)
    }
}

impl From<Schema> for SchemaDef {
    fn from(schema: Schema) -> Self {
        SchemaDef {
            kind: schema.kind,
            description: schema.description,
            fields: schema.fields,
        }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.fields == other.fields
    }
}

fn language_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("language pattern compiles")
    })
}

impl Schema {
    /// Declares a schema from an ordered list of descriptors.
    ///
    /// # Errors
    ///
    /// Fails if the kind is empty, two fields share a name, a descriptor
    /// is inconsistent, or a default does not pass its own field's
    /// validation.
    pub fn declare(kind: impl Into<String>, fields: Vec<FieldDescriptor>) -> SchemaResult<Self> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(SchemaError::EmptyKind);
        }

        let mut positions = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if positions.insert(field.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateField {
                    kind,
                    field: field.name.clone(),
                });
            }
            check_descriptor(&kind, field)?;
        }

        // Defaults run after every structural check
        for field in &fields {
            crate::validation::check_default(&kind, field)?;
        }

        Ok(Self {
            kind,
            description: None,
            fields,
            positions,
        })
    }

    /// Attaches a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the entity kind name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Looks up a field descriptor by name.
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.positions.get(name).map(|&i| &self.fields[i])
    }

    /// Returns the descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the relation fields in declaration order.
    pub fn relation_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_relation())
    }
}

fn check_descriptor(kind: &str, field: &FieldDescriptor) -> SchemaResult<()> {
    let name = &field.name;
    if name.is_empty() || name.contains('.') {
        return Err(SchemaError::descriptor(
            kind,
            name,
            "field names must be non-empty and must not contain '.'",
        ));
    }

    if field.allow_empty_sequence && !field.multiple {
        return Err(SchemaError::descriptor(
            kind,
            name,
            "allow_empty_sequence requires multiple",
        ));
    }

    if let Some(languages) = &field.languages {
        if languages.is_empty() {
            return Err(SchemaError::descriptor(kind, name, "language list is empty"));
        }
        let mut seen = HashSet::new();
        for lang in languages {
            if !language_pattern().is_match(lang) || !seen.insert(lang.as_str()) {
                return Err(SchemaError::InvalidLanguage {
                    kind: kind.to_string(),
                    field: name.clone(),
                    language: lang.clone(),
                });
            }
        }
    }

    match &field.kind {
        FieldKind::Str {
            min_length: Some(lo),
            max_length: Some(hi),
            ..
        } if lo > hi => Err(SchemaError::descriptor(kind, name, "min_length exceeds max_length")),
        FieldKind::Int {
            min: Some(lo),
            max: Some(hi),
        } if lo > hi => Err(SchemaError::descriptor(kind, name, "min exceeds max")),
        FieldKind::Float {
            min: Some(lo),
            max: Some(hi),
        } if lo > hi => Err(SchemaError::descriptor(kind, name, "min exceeds max")),
        FieldKind::Select { choices } if choices.is_empty() => {
            Err(SchemaError::descriptor(kind, name, "select needs at least one choice"))
        }
        FieldKind::Relation { target, mirror } => {
            if target.is_empty() {
                return Err(SchemaError::descriptor(kind, name, "relation target is empty"));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = mirror.iter().find(|m| !seen.insert(m.as_str())) {
                return Err(SchemaError::descriptor(
                    kind,
                    name,
                    format!("mirror field '{}' listed twice", dup),
                ));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
