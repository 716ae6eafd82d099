//! Storable document to record
//!
//! Decoding never fails. A field whose stored shape no longer matches the
//! schema is logged as an anomaly and materializes as `Empty`; the rest of
//! the record is unaffected.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;

use crate::observability::{log_event, metrics, Event};
use crate::record::Record;
use crate::schema::{FieldDescriptor, FieldKind, Schema};
use crate::value::{Document, FieldSlot, Key, RelationValue, Value, Values};

type DecodeResult<T> = Result<T, String>;

/// Rebuilds a record from a stored document.
///
/// Stored fields the schema does not declare are ignored; declared fields
/// missing from the document stay `Empty`. The result carries no errors:
/// only re-validation applies `required`.
pub fn from_storage(schema: &Arc<Schema>, doc: &Document) -> Record {
    let values = decode_fields(schema, doc, "");
    let mut record = Record::new(Arc::clone(schema));
    for (name, slot) in values {
        record.put(&name, slot);
    }
    record
}

fn decode_fields(schema: &Schema, doc: &Document, prefix: &str) -> Values {
    let mut values = Values::new();
    for field in schema.fields() {
        let slot = match doc.get(&field.name) {
            None => FieldSlot::Empty,
            Some(raw) => decode_slot(field, raw, prefix).unwrap_or_else(|reason| {
                report_anomaly(schema.kind(), &format!("{}{}", prefix, field.name), &reason);
                FieldSlot::Empty
            }),
        };
        values.insert(field.name.clone(), slot);
    }
    values
}

fn report_anomaly(kind: &str, field: &str, reason: &str) {
    metrics().increment_decode_anomalies();
    log_event(
        Event::StorageDecodeAnomaly,
        &[("kind", kind), ("field", field), ("reason", reason)],
    );
}

fn decode_slot(field: &FieldDescriptor, raw: &Json, prefix: &str) -> DecodeResult<FieldSlot> {
    if field.languages.is_none() || raw.is_null() {
        return decode_plain(field, raw, prefix);
    }

    let obj = raw
        .as_object()
        .ok_or_else(|| format!("expected language mapping, found {}", json_type(raw)))?;
    let mut langs = BTreeMap::new();
    for lang in field.language_codes() {
        let slot = match obj.get(lang) {
            Some(value) => decode_plain(field, value, prefix)?,
            None => FieldSlot::Empty,
        };
        langs.insert(lang.clone(), slot);
    }
    Ok(FieldSlot::Languages(langs))
}

fn decode_plain(field: &FieldDescriptor, raw: &Json, prefix: &str) -> DecodeResult<FieldSlot> {
    if raw.is_null() {
        return Ok(FieldSlot::Empty);
    }
    if !field.multiple {
        return decode_value(field, raw, prefix).map(FieldSlot::Single);
    }

    let items = raw
        .as_array()
        .ok_or_else(|| format!("expected sequence, found {}", json_type(raw)))?;
    items
        .iter()
        .map(|item| decode_value(field, item, prefix))
        .collect::<DecodeResult<Vec<_>>>()
        .map(FieldSlot::Multiple)
}

fn decode_value(field: &FieldDescriptor, raw: &Json, prefix: &str) -> DecodeResult<Value> {
    let mismatch = || format!("expected {}, found {}", field.kind.type_name(), json_type(raw));

    match &field.kind {
        FieldKind::Str { .. } => match raw {
            Json::String(s) => Ok(Value::Str(s.clone())),
            Json::Object(obj) => obj
                .get("val")
                .and_then(Json::as_str)
                .map(|s| Value::Str(s.to_string()))
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        FieldKind::Email | FieldKind::Select { .. } => {
            raw.as_str().map(|s| Value::Str(s.to_string())).ok_or_else(mismatch)
        }
        FieldKind::Int { .. } => raw.as_i64().map(Value::Int).ok_or_else(mismatch),
        FieldKind::Float { .. } => raw.as_f64().map(Value::Float).ok_or_else(mismatch),
        FieldKind::Bool => raw.as_bool().map(Value::Bool).ok_or_else(mismatch),
        FieldKind::DateTime { .. } => {
            let s = raw.as_str().ok_or_else(mismatch)?;
            DateTime::parse_from_rfc3339(s)
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc)))
                .map_err(|e| format!("bad timestamp '{}': {}", s, e))
        }
        FieldKind::Relation { target, .. } => decode_relation(raw, target).map(Value::Relation),
        FieldKind::Record { schema } => {
            let obj = raw.as_object().ok_or_else(mismatch)?;
            let nested_prefix = format!("{}{}.", prefix, field.name);
            Ok(Value::Record(decode_fields(schema, obj, &nested_prefix)))
        }
    }
}

fn decode_relation(raw: &Json, target: &str) -> DecodeResult<RelationValue> {
    let (reference, mirror) = match raw {
        Json::String(s) => (s.as_str(), Document::new()),
        Json::Object(obj) => {
            let reference = obj
                .get("reference_key")
                .and_then(Json::as_str)
                .ok_or("relation without reference_key")?;
            let mirror = match obj.get("mirror") {
                Some(Json::Object(m)) => m.clone(),
                None | Some(Json::Null) => Document::new(),
                Some(other) => return Err(format!("mirror is {}", json_type(other))),
            };
            (reference, mirror)
        }
        other => return Err(format!("expected relation, found {}", json_type(other))),
    };

    let key = Key::parse(reference).ok_or_else(|| format!("bad reference key '{}'", reference))?;
    if key.kind() != target {
        return Err(format!("reference to '{}', expected '{}'", key.kind(), target));
    }
    Ok(RelationValue { key, mirror })
}

fn json_type(raw: &Json) -> &'static str {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
