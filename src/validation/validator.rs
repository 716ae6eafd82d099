//! Validation of raw input against a schema
//!
//! Fields are processed in declaration order. Each field ends up in one of
//! four states: submitted (coerced, possibly with errors), carried over
//! from the existing record, stamped with the current time, or defaulted.
//! The required check runs last, per declared language.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;

use crate::config::CoreConfig;
use crate::observability::{log_event, metrics, Event};
use crate::record::{FieldError, Reason, Record};
use crate::schema::{AutoNow, FieldDescriptor, FieldKind, Schema, SchemaError, SchemaResult};
use crate::value::{Document, FieldSlot, Value, Values};

/// Per-call state shared by every field of one validation.
pub(super) struct Context {
    /// One timestamp for every auto-stamped field
    pub(super) now: DateTime<Utc>,
    /// No existing record was given
    pub(super) creating: bool,
}

/// Values and errors of one (possibly nested) schema.
pub(super) struct FieldsOutcome {
    pub(super) values: Values,
    pub(super) errors: BTreeMap<String, Vec<FieldError>>,
    pub(super) touched: BTreeSet<String>,
}

/// Validation engine
///
/// Stateless apart from the configuration it reads; one validator can
/// serve any number of concurrent validations.
pub struct Validator<'a> {
    pub(super) config: &'a CoreConfig,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a CoreConfig) -> Self {
        Self { config }
    }

    /// Builds a record from raw input, optionally on top of an existing one.
    ///
    /// Never fails: every problem becomes a field error on the returned
    /// record. Keys not declared by the schema are ignored.
    pub fn validate(&self, schema: &Arc<Schema>, raw: &Document, existing: Option<&Record>) -> Record {
        let ctx = Context {
            now: Utc::now(),
            creating: existing.is_none(),
        };
        let outcome = self.validate_fields(schema, raw, existing.map(Record::values), &ctx);

        let mut record = Record::new(Arc::clone(schema));
        if let Some(key) = existing.and_then(Record::key) {
            record.set_key(key.clone());
        }
        for (name, slot) in outcome.values {
            record.put(&name, slot);
        }
        for name in &outcome.touched {
            record.touch(name);
        }
        let mut error_count = 0usize;
        for (name, errors) in outcome.errors {
            for error in errors {
                error_count += 1;
                record.add_error(&name, error);
            }
        }
        record.set_source(raw.clone());

        metrics().increment_records_validated();
        if error_count > 0 {
            metrics().increment_validation_failures();
        }
        log_event(
            Event::RecordValidated,
            &[
                ("kind", schema.kind()),
                ("errors", &error_count.to_string()),
                ("mode", if ctx.creating { "create" } else { "update" }),
            ],
        );
        record
    }

    pub(super) fn validate_fields(
        &self,
        schema: &Schema,
        raw: &Document,
        existing: Option<&Values>,
        ctx: &Context,
    ) -> FieldsOutcome {
        let mut outcome = FieldsOutcome {
            values: Values::new(),
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
        };

        for field in schema.fields() {
            let mut errors = Vec::new();
            let prior = existing
                .and_then(|values| values.get(&field.name))
                .filter(|slot| !slot.is_empty());

            let slot = match lookup_raw(raw, field) {
                Some(input) => {
                    outcome.touched.insert(field.name.clone());
                    match prior {
                        Some(prior) if field.write_once => {
                            errors.push(FieldError::new(Reason::ReadOnly));
                            prior.clone()
                        }
                        _ => self.read_slot(field, &input, ctx, &mut errors),
                    }
                }
                None => match (auto_now(field), prior) {
                    (AutoNow::OnUpdate, _) => stamp(ctx),
                    (_, Some(prior)) => prior.clone(),
                    (AutoNow::OnCreate, None) if ctx.creating => stamp(ctx),
                    _ => self.default_slot(field, ctx, &mut errors),
                },
            };

            if field.required {
                check_required(field, &slot, &mut errors);
            }
            if !errors.is_empty() {
                outcome.errors.insert(field.name.clone(), errors);
            }
            outcome.values.insert(field.name.clone(), slot);
        }

        outcome
    }

    fn read_slot(
        &self,
        field: &FieldDescriptor,
        input: &Json,
        ctx: &Context,
        errors: &mut Vec<FieldError>,
    ) -> FieldSlot {
        if field.languages.is_none() {
            return self.read_plain(field, input, None, ctx, errors);
        }
        if input.is_null() {
            return FieldSlot::Empty;
        }
        let Some(obj) = input.as_object() else {
            errors.push(FieldError::new(Reason::NotAMapping));
            return FieldSlot::Single(Value::Raw(input.clone()));
        };

        // Languages missing from the input take the default; unknown ones
        // are dropped.
        let langs = field
            .language_codes()
            .iter()
            .map(|lang| {
                let slot = match obj.get(lang) {
                    Some(value) => self.read_plain(field, value, Some(lang), ctx, errors),
                    None => self.default_plain(field, Some(lang), ctx, errors),
                };
                (lang.clone(), slot)
            })
            .collect();
        FieldSlot::Languages(langs)
    }

    /// Reads a slot without the language layer.
    fn read_plain(
        &self,
        field: &FieldDescriptor,
        input: &Json,
        lang: Option<&str>,
        ctx: &Context,
        errors: &mut Vec<FieldError>,
    ) -> FieldSlot {
        if input.is_null() || is_blank_input(&field.kind, input) {
            return FieldSlot::Empty;
        }

        if !field.multiple {
            let (value, errs) = self.coerce_element(field, input, ctx);
            errors.extend(errs.into_iter().map(|e| e.in_language(lang)));
            return FieldSlot::Single(value);
        }

        let Some(items) = input.as_array() else {
            errors.push(FieldError::new(Reason::NotASequence).in_language(lang));
            return FieldSlot::Single(Value::Raw(input.clone()));
        };
        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let (value, errs) = self.coerce_element(field, item, ctx);
            errors.extend(
                errs.into_iter()
                    .map(|e| e.in_language(lang).at_index(Some(i))),
            );
            values.push(value);
        }
        FieldSlot::Multiple(values)
    }

    fn default_plain(
        &self,
        field: &FieldDescriptor,
        lang: Option<&str>,
        ctx: &Context,
        errors: &mut Vec<FieldError>,
    ) -> FieldSlot {
        match field.default.produce() {
            Some(raw) => self.read_plain(field, &raw, lang, ctx, errors),
            None => FieldSlot::Empty,
        }
    }

    fn default_slot(
        &self,
        field: &FieldDescriptor,
        ctx: &Context,
        errors: &mut Vec<FieldError>,
    ) -> FieldSlot {
        if field.languages.is_none() {
            return self.default_plain(field, None, ctx, errors);
        }
        if field.default.is_none() {
            return FieldSlot::Empty;
        }
        let langs = field
            .language_codes()
            .iter()
            .map(|lang| (lang.clone(), self.default_plain(field, Some(lang), ctx, errors)))
            .collect();
        FieldSlot::Languages(langs)
    }
}

/// Finds the submitted value of a field.
///
/// Language fields may also arrive flattened as `name.lang` keys.
fn lookup_raw<'r>(raw: &'r Document, field: &FieldDescriptor) -> Option<Cow<'r, Json>> {
    if let Some(value) = raw.get(&field.name) {
        return Some(Cow::Borrowed(value));
    }

    let dotted: Document = field
        .language_codes()
        .iter()
        .filter_map(|lang| {
            raw.get(&format!("{}.{}", field.name, lang))
                .map(|value| (lang.clone(), value.clone()))
        })
        .collect();
    (!dotted.is_empty()).then(|| Cow::Owned(Json::Object(dotted)))
}

/// Empty text for a non-text kind means "no value", as forms send it.
fn is_blank_input(kind: &FieldKind, input: &Json) -> bool {
    let blank = input.as_str().is_some_and(|s| s.trim().is_empty());
    blank
        && matches!(
            kind,
            FieldKind::Int { .. }
                | FieldKind::Float { .. }
                | FieldKind::DateTime { .. }
                | FieldKind::Relation { .. }
        )
}

/// Stamping applies to single-valued, language-free datetime fields only.
fn auto_now(field: &FieldDescriptor) -> AutoNow {
    match field.kind {
        FieldKind::DateTime { auto_now } if !field.multiple && field.languages.is_none() => {
            auto_now
        }
        _ => AutoNow::Never,
    }
}

fn stamp(ctx: &Context) -> FieldSlot {
    FieldSlot::Single(Value::DateTime(ctx.now))
}

fn check_required(field: &FieldDescriptor, slot: &FieldSlot, errors: &mut Vec<FieldError>) {
    if errors.iter().any(|e| e.language.is_none()) {
        return;
    }

    if field.languages.is_none() {
        if !field.is_filled_plain(slot) {
            errors.push(FieldError::new(Reason::Required));
        }
        return;
    }

    for lang in field.language_codes() {
        let failed = errors.iter().any(|e| e.language.as_deref() == Some(lang.as_str()));
        if !failed && !field.is_filled_plain(slot.language(lang)) {
            errors.push(FieldError::new(Reason::Required).in_language(Some(lang)));
        }
    }
}

/// Checks that a field's default passes the field's own validation.
///
/// Runs at declaration time with the default configuration.
pub(crate) fn check_default(kind: &str, field: &FieldDescriptor) -> SchemaResult<()> {
    let Some(raw) = field.default.produce() else {
        return Ok(());
    };

    let config = CoreConfig::default();
    let validator = Validator::new(&config);
    let ctx = Context {
        now: Utc::now(),
        creating: true,
    };
    let mut errors = Vec::new();
    let slot = validator.read_plain(field, &raw, None, &ctx, &mut errors);

    if let Some(error) = errors.first() {
        return Err(SchemaError::InvalidDefault {
            kind: kind.to_string(),
            field: field.name.clone(),
            reason: error.to_string(),
        });
    }
    if field.required && !field.is_filled_plain(&slot) {
        return Err(SchemaError::RequiredEmptyDefault {
            kind: kind.to_string(),
            field: field.name.clone(),
        });
    }
    Ok(())
}
