//! Relation resolution
//!
//! On write, every relation value is checked against the store inside the
//! caller's transaction and its mirror is replaced by the declared subset
//! of the target document. On read nothing is fetched: the stored mirror
//! is returned as-is.

use std::sync::Arc;

use super::refresh::{MirrorRefresh, MirrorRefreshSink};
use crate::observability::{log_event, metrics, Event};
use crate::record::{FieldError, Reason, Record};
use crate::schema::{FieldDescriptor, FieldKind, Schema, SchemaRegistry};
use crate::store::{StoreResult, Transaction};
use crate::value::{Document, FieldSlot, Key, RelationValue, Value, Values};

/// Resolves relation fields and signals mirror refreshes.
pub struct RelationResolver<'a> {
    registry: &'a SchemaRegistry,
    sink: &'a dyn MirrorRefreshSink,
}

impl<'a> RelationResolver<'a> {
    pub fn new(registry: &'a SchemaRegistry, sink: &'a dyn MirrorRefreshSink) -> Self {
        Self { registry, sink }
    }

    /// Resolves one relation field of `record` in place.
    ///
    /// Missing targets become `target missing` errors on the field. Store
    /// failures abort and are returned. Non-relation fields (other than
    /// nested records holding relations) are left alone.
    pub fn resolve<T: Transaction>(
        &self,
        txn: &mut T,
        record: &mut Record,
        field_name: &str,
    ) -> StoreResult<()> {
        let schema = Arc::clone(record.schema());
        let Some(field) = schema.get(field_name) else {
            return Ok(());
        };
        let Some(slot) = record.slot_mut(field_name) else {
            return Ok(());
        };

        let mut missing = Vec::new();
        self.resolve_slot(txn, field, slot, &mut missing)?;
        for error in missing {
            record.add_error(field_name, error);
        }
        Ok(())
    }

    /// Resolves every field that can hold a relation, in declaration order.
    pub fn resolve_all<T: Transaction>(&self, txn: &mut T, record: &mut Record) -> StoreResult<()> {
        let schema = Arc::clone(record.schema());
        for field in schema.fields().iter().filter(|f| holds_relations(f)) {
            self.resolve(txn, record, &field.name)?;
        }
        Ok(())
    }

    /// Signals that `key` was rewritten.
    ///
    /// Returns true if a refresh was enqueued. Kinds nobody points at
    /// produce no signal. A rejected signal is logged and dropped.
    pub fn signal_write(&self, key: &Key) -> bool {
        let referrers = self.registry.referrers(key.kind());
        if referrers.is_empty() {
            return false;
        }

        let target = key.to_string();
        let refresh = MirrorRefresh {
            target: key.clone(),
            referrers: referrers.to_vec(),
        };
        match self.sink.enqueue(refresh) {
            Ok(()) => {
                metrics().increment_mirror_refreshes();
                log_event(
                    Event::MirrorRefreshEnqueued,
                    &[("key", &target), ("referrers", &referrers.len().to_string())],
                );
                true
            }
            Err(e) => {
                log_event(
                    Event::MirrorRefreshDropped,
                    &[("key", &target), ("reason", e.code())],
                );
                false
            }
        }
    }

    fn resolve_slot<T: Transaction>(
        &self,
        txn: &mut T,
        field: &FieldDescriptor,
        slot: &mut FieldSlot,
        missing: &mut Vec<FieldError>,
    ) -> StoreResult<()> {
        let mut failure = None;
        slot.for_each_value_mut(|lang, index, value| {
            if failure.is_some() {
                return;
            }
            let outcome = match (&field.kind, value) {
                (FieldKind::Relation { mirror, .. }, Value::Relation(relation)) => {
                    self.fill_mirror(txn, relation, mirror).map(|found| {
                        if !found {
                            missing.push(
                                FieldError::new(Reason::TargetMissing)
                                    .in_language(lang)
                                    .at_index(index),
                            );
                        }
                    })
                }
                (FieldKind::Record { schema }, Value::Record(values)) => {
                    self.resolve_values(txn, schema, values).map(|nested| {
                        missing.extend(nested.into_iter().map(|e| locate(e, lang, index)));
                    })
                }
                _ => Ok(()),
            };
            if let Err(e) = outcome {
                failure = Some(e);
            }
        });
        failure.map_or(Ok(()), Err)
    }

    fn resolve_values<T: Transaction>(
        &self,
        txn: &mut T,
        schema: &Schema,
        values: &mut Values,
    ) -> StoreResult<Vec<FieldError>> {
        let mut errors = Vec::new();
        for field in schema.fields().iter().filter(|f| holds_relations(f)) {
            let Some(slot) = values.get_mut(&field.name) else {
                continue;
            };
            let mut missing = Vec::new();
            self.resolve_slot(txn, field, slot, &mut missing)?;
            errors.extend(missing.into_iter().map(|e| e.nested_under(&field.name)));
        }
        Ok(errors)
    }

    /// Returns false if the target does not exist.
    fn fill_mirror<T: Transaction>(
        &self,
        txn: &mut T,
        relation: &mut RelationValue,
        mirror: &[String],
    ) -> StoreResult<bool> {
        let Some(target) = txn.get(&relation.key)? else {
            metrics().increment_relation_targets_missing();
            log_event(
                Event::RelationTargetMissing,
                &[("key", &relation.key.to_string())],
            );
            return Ok(false);
        };
        relation.mirror = project(&target, mirror);
        Ok(true)
    }
}

fn holds_relations(field: &FieldDescriptor) -> bool {
    match &field.kind {
        FieldKind::Relation { .. } => true,
        FieldKind::Record { schema } => schema.fields().iter().any(holds_relations),
        _ => false,
    }
}

/// Copies the mirrored fields the target actually stores.
fn project(target: &Document, fields: &[String]) -> Document {
    fields
        .iter()
        .filter_map(|name| target.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

/// Adds the outer position to an error from a nested record without
/// overwriting a position the nested error already has.
fn locate(mut error: FieldError, lang: Option<&str>, index: Option<usize>) -> FieldError {
    if error.language.is_none() {
        error.language = lang.map(str::to_string);
    }
    if error.index.is_none() {
        error.index = index;
    }
    error
}
