//! In-memory record instances
//!
//! A record is owned by whoever built it (a request handler or a task) and
//! is never shared between concurrent validations. A record with errors is
//! a normal, first-class state: it carries the submitted values so a
//! failed form can be re-rendered.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::errors::FieldError;
use crate::schema::Schema;
use crate::value::{Document, FieldSlot, Key, Values};

static EMPTY_SLOT: FieldSlot = FieldSlot::Empty;

/// A validated or partially validated instance of a schema.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    key: Option<Key>,
    values: Values,
    errors: BTreeMap<String, Vec<FieldError>>,
    source: Option<Document>,
    touched: BTreeSet<String>,
}

impl Record {
    /// Creates a record with every field at the empty sentinel.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|f| (f.name.clone(), FieldSlot::Empty))
            .collect();
        Self {
            schema,
            key: None,
            values,
            errors: BTreeMap::new(),
            source: None,
            touched: BTreeSet::new(),
        }
    }

    /// Returns the schema this record instantiates
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the entity kind
    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    /// Returns the persisted key, absent for records not created yet
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn set_key(&mut self, key: Key) {
        self.key = Some(key);
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    /// Returns the slot of a field; unknown names read as empty.
    pub fn get(&self, name: &str) -> &FieldSlot {
        self.values.get(name).unwrap_or(&EMPTY_SLOT)
    }

    /// Replaces a field's slot programmatically.
    ///
    /// The field counts as touched and its previous errors are dropped.
    /// Returns false for names the schema does not declare.
    pub fn set(&mut self, name: &str, slot: FieldSlot) -> bool {
        if self.schema.get(name).is_none() {
            return false;
        }
        self.values.insert(name.to_string(), slot);
        self.errors.remove(name);
        self.touched.insert(name.to_string());
        true
    }

    /// Returns all values, one slot per declared field
    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn into_values(self) -> Values {
        self.values
    }

    /// Returns field errors keyed by field name
    pub fn errors(&self) -> &BTreeMap<String, Vec<FieldError>> {
        &self.errors
    }

    pub fn field_errors(&self, name: &str) -> &[FieldError] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the error codes of one field, e.g. `["required:de"]`.
    pub fn error_codes(&self, name: &str) -> Vec<String> {
        self.field_errors(name).iter().map(FieldError::code).collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn add_error(&mut self, name: &str, error: FieldError) {
        self.errors.entry(name.to_string()).or_default().push(error);
    }

    /// Returns the raw input this record was validated from
    pub fn source(&self) -> Option<&Document> {
        self.source.as_ref()
    }

    /// Returns true if the field was explicitly submitted or set.
    pub fn was_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    pub fn touched(&self) -> impl Iterator<Item = &str> {
        self.touched.iter().map(String::as_str)
    }

    /// Valid iff no field has errors and every required field is filled.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
            && self
                .schema
                .fields()
                .iter()
                .filter(|f| f.required)
                .all(|f| f.is_filled(self.get(&f.name)))
    }

    /// Languages of a field that currently hold a value, in declared order.
    pub fn present_languages(&self, name: &str) -> Vec<&str> {
        let Some(field) = self.schema.get(name) else {
            return Vec::new();
        };
        let slot = self.get(name);
        field
            .language_codes()
            .iter()
            .filter(|lang| !slot.language(lang).is_empty())
            .map(String::as_str)
            .collect()
    }

    /// Compares typed values only; key, errors, source and touch state are
    /// transient and ignored.
    pub fn same_values(&self, other: &Record) -> bool {
        self.kind() == other.kind() && self.values == other.values
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut FieldSlot> {
        self.values.get_mut(name)
    }

    pub(crate) fn put(&mut self, name: &str, slot: FieldSlot) {
        self.values.insert(name.to_string(), slot);
    }

    pub(crate) fn touch(&mut self, name: &str) {
        self.touched.insert(name.to_string());
    }

    pub(crate) fn set_source(&mut self, source: Document) {
        self.source = Some(source);
    }
}
