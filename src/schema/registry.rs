//! Schema registry
//!
//! Built once at startup from code declarations and/or a directory of
//! schema definition files, then frozen. The finished registry is plain
//! immutable data; share it by reference or `Arc` across threads without
//! locking.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::schema::Schema;
use super::types::FieldKind;
use crate::observability::{log_event, Event};

/// A relation field pointing at some kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referrer {
    /// Kind declaring the relation
    pub kind: String,
    /// Top-level field holding it
    pub field: String,
}

/// Immutable lookup of schemas by kind.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
    order: Vec<String>,
    referrers: HashMap<String, Vec<Referrer>>,
}

impl SchemaRegistry {
    /// Starts an empty builder.
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Builds a registry from already declared schemas.
    pub fn from_schemas(schemas: impl IntoIterator<Item = Schema>) -> SchemaResult<Self> {
        let mut builder = Self::builder();
        for schema in schemas {
            builder.register(schema)?;
        }
        builder.build()
    }

    /// Gets a schema by kind.
    pub fn get(&self, kind: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.schemas.contains_key(kind)
    }

    /// Returns kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the top-level relation fields that target `kind`.
    pub fn referrers(&self, kind: &str) -> &[Referrer] {
        self.referrers.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Collects schemas and checks cross-schema references on `build`.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    schemas: Vec<Schema>,
}

impl SchemaRegistryBuilder {
    /// Registers a declared schema.
    ///
    /// # Errors
    ///
    /// `DuplicateKind` if a schema of the same kind is already registered.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<()> {
        if self.schemas.iter().any(|s| s.kind() == schema.kind()) {
            return Err(SchemaError::DuplicateKind(schema.kind().to_string()));
        }
        self.schemas.push(schema);
        Ok(())
    }

    /// Loads every `*.json` schema definition in `dir`, in file name order.
    ///
    /// Returns the number of schemas loaded. A missing directory loads
    /// nothing.
    pub fn load_dir(&mut self, dir: &Path) -> SchemaResult<usize> {
        if !dir.exists() {
            return Ok(0);
        }

        let malformed = |path: &Path, reason: String| SchemaError::MalformedFile {
            path: path.display().to_string(),
            reason,
        };

        let entries = fs::read_dir(dir)
            .map_err(|e| malformed(dir, format!("failed to read directory: {}", e)))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| malformed(dir, format!("failed to read directory entry: {}", e)))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let content = fs::read_to_string(path)
                .map_err(|e| malformed(path, format!("failed to read file: {}", e)))?;
            let schema: Schema = serde_json::from_str(&content)
                .map_err(|e| malformed(path, format!("invalid definition: {}", e)))?;
            self.register(schema)?;
        }

        Ok(paths.len())
    }

    /// Freezes the registry.
    ///
    /// # Errors
    ///
    /// Fails if a relation (top-level or nested) targets an unregistered
    /// kind or mirrors a field its target does not declare.
    pub fn build(self) -> SchemaResult<SchemaRegistry> {
        let by_kind: HashMap<&str, &Schema> =
            self.schemas.iter().map(|s| (s.kind(), s)).collect();

        let mut referrers: HashMap<String, Vec<Referrer>> = HashMap::new();
        for schema in &self.schemas {
            check_relations(schema.kind(), schema, &by_kind)?;
            for field in schema.relation_fields() {
                if let FieldKind::Relation { target, .. } = &field.kind {
                    referrers.entry(target.clone()).or_default().push(Referrer {
                        kind: schema.kind().to_string(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        let order: Vec<String> = self.schemas.iter().map(|s| s.kind().to_string()).collect();
        let schemas = self
            .schemas
            .into_iter()
            .map(|s| (s.kind().to_string(), Arc::new(s)))
            .collect();

        let count = order.len().to_string();
        log_event(Event::SchemasRegistered, &[("count", &count)]);

        Ok(SchemaRegistry {
            schemas,
            order,
            referrers,
        })
    }
}

fn check_relations(owner: &str, schema: &Schema, by_kind: &HashMap<&str, &Schema>) -> SchemaResult<()> {
    for field in schema.fields() {
        match &field.kind {
            FieldKind::Relation { target, mirror } => {
                let target_schema =
                    by_kind
                        .get(target.as_str())
                        .ok_or_else(|| SchemaError::UnknownTarget {
                            kind: owner.to_string(),
                            field: field.name.clone(),
                            target: target.clone(),
                        })?;
                if let Some(missing) = mirror.iter().find(|m| target_schema.get(m).is_none()) {
                    return Err(SchemaError::UnknownMirrorField {
                        kind: owner.to_string(),
                        field: field.name.clone(),
                        target: target.clone(),
                        mirror: missing.clone(),
                    });
                }
            }
            FieldKind::Record { schema: nested } => check_relations(owner, nested, by_kind)?,
            _ => {}
        }
    }
    Ok(())
}
