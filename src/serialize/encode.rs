//! Record to storable document

use chrono::SecondsFormat;
use serde_json::{json, Map, Number, Value as Json};

use crate::record::Record;
use crate::schema::{FieldDescriptor, FieldKind, Schema};
use crate::value::{Document, FieldSlot, Value, Values};

/// Converts a record into the document shape written to the store.
///
/// Every declared field is present in the output; `Empty` becomes `null`.
/// Raw (unvalidated) values are never written and also become `null`.
pub fn to_storage(record: &Record) -> Document {
    encode_fields(record.schema(), record.values())
}

fn encode_fields(schema: &Schema, values: &Values) -> Document {
    let mut doc = Map::with_capacity(schema.len());
    for field in schema.fields() {
        let slot = values.get(&field.name).unwrap_or(&FieldSlot::Empty);
        doc.insert(field.name.clone(), encode_slot(field, slot));
    }
    doc
}

fn encode_slot(field: &FieldDescriptor, slot: &FieldSlot) -> Json {
    if field.languages.is_none() {
        return encode_plain(field, slot);
    }
    match slot {
        FieldSlot::Languages(langs) => {
            let obj = field
                .language_codes()
                .iter()
                .map(|lang| {
                    let value = langs
                        .get(lang)
                        .map_or(Json::Null, |slot| encode_plain(field, slot));
                    (lang.clone(), value)
                })
                .collect();
            Json::Object(obj)
        }
        _ => Json::Null,
    }
}

fn encode_plain(field: &FieldDescriptor, slot: &FieldSlot) -> Json {
    match slot {
        FieldSlot::Single(value) => encode_value(&field.kind, value),
        FieldSlot::Multiple(values) => {
            Json::Array(values.iter().map(|v| encode_value(&field.kind, v)).collect())
        }
        FieldSlot::Empty | FieldSlot::Languages(_) => Json::Null,
    }
}

fn encode_value(kind: &FieldKind, value: &Value) -> Json {
    match value {
        Value::Str(s) => match kind {
            FieldKind::Str {
                case_sensitive: false,
                ..
            } => json!({ "val": s, "idx": s.to_lowercase() }),
            _ => Json::String(s.clone()),
        },
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Bool(b) => Json::Bool(*b),
        Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Relation(relation) => json!({
            "reference_key": relation.key.to_string(),
            "mirror": Json::Object(relation.mirror.clone()),
        }),
        Value::Record(values) => match kind {
            FieldKind::Record { schema } => Json::Object(encode_fields(schema, values)),
            _ => Json::Null,
        },
        Value::Raw(_) => Json::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Key, RelationValue};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn schema(fields: Vec<FieldDescriptor>) -> Arc<Schema> {
        Arc::new(Schema::declare("T", fields).unwrap())
    }

    #[test]
    fn test_flattening_shapes() {
        let s = schema(vec![
            FieldDescriptor::string("plain"),
            FieldDescriptor::string("many").multiple(),
            FieldDescriptor::string("lang").languages(["en", "de"]),
            FieldDescriptor::string("both").multiple().languages(["en", "de"]),
        ]);
        let mut record = Record::new(s);
        record.set("plain", FieldSlot::Single(Value::Str("a".into())));
        record.set(
            "many",
            FieldSlot::Multiple(vec![Value::Str("x".into()), Value::Str("y".into())]),
        );
        let mut langs = BTreeMap::new();
        langs.insert("en".to_string(), FieldSlot::Single(Value::Str("hi".into())));
        langs.insert("de".to_string(), FieldSlot::Empty);
        record.set("lang", FieldSlot::Languages(langs));
        let mut langs = BTreeMap::new();
        langs.insert(
            "de".to_string(),
            FieldSlot::Multiple(vec![Value::Str("z".into())]),
        );
        record.set("both", FieldSlot::Languages(langs));

        let doc = to_storage(&record);
        assert_eq!(doc["plain"], json!("a"));
        assert_eq!(doc["many"], json!(["x", "y"]));
        assert_eq!(doc["lang"], json!({"en": "hi", "de": null}));
        assert_eq!(doc["both"], json!({"en": null, "de": ["z"]}));
    }

    #[test]
    fn test_empty_and_raw_become_null() {
        let s = schema(vec![FieldDescriptor::int("a"), FieldDescriptor::int("b")]);
        let mut record = Record::new(s);
        record.set("b", FieldSlot::Single(Value::Raw(json!("junk"))));
        let doc = to_storage(&record);
        assert_eq!(doc["a"], Json::Null);
        assert_eq!(doc["b"], Json::Null);
    }

    #[test]
    fn test_case_insensitive_index_copy() {
        let s = schema(vec![FieldDescriptor::string("name").case_insensitive()]);
        let mut record = Record::new(s);
        record.set("name", FieldSlot::Single(Value::Str("Ada".into())));
        assert_eq!(to_storage(&record)["name"], json!({"val": "Ada", "idx": "ada"}));
    }

    #[test]
    fn test_relation_and_datetime_shapes() {
        let s = schema(vec![
            FieldDescriptor::relation("manager", "Person", ["name"]),
            FieldDescriptor::datetime("at"),
        ]);
        let mut mirror = Document::new();
        mirror.insert("name".into(), json!("Bob"));
        let mut record = Record::new(s);
        record.set(
            "manager",
            FieldSlot::Single(Value::Relation(RelationValue {
                key: Key::new("Person", "K"),
                mirror,
            })),
        );
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        record.set("at", FieldSlot::Single(Value::DateTime(at)));

        let doc = to_storage(&record);
        assert_eq!(
            doc["manager"],
            json!({"reference_key": "Person/K", "mirror": {"name": "Bob"}})
        );
        assert_eq!(doc["at"], json!("2024-01-02T03:04:05Z"));
    }
}
