//! Predicate matching and ordering over stored documents
//!
//! No type coercion: operands are already storage-shaped when they get
//! here. Paths are dotted (`title.en`, `name.idx`). Arrays anywhere on
//! the path fan out: `members.reference_key` reaches every element of
//! `members`, and the predicate holds if any reached value matches (`ne`:
//! if none equals the operand).

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde_json::Value as Json;

use crate::collection::{FilterOp, Predicate, SortDirection, SortKey};
use crate::value::{Document, Key};

/// Checks if a document matches all predicates
pub fn matches(document: &Document, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| matches_predicate(document, p))
}

fn matches_predicate(document: &Document, predicate: &Predicate) -> bool {
    let values = lookup(document, &predicate.field);
    match &predicate.op {
        // Missing field only satisfies "not equal"
        FilterOp::Ne(expected) => values.iter().all(|v| *v != expected),
        op => values.iter().any(|v| compare_op(v, op)),
    }
}

fn compare_op(actual: &Json, op: &FilterOp) -> bool {
    match op {
        FilterOp::Eq(expected) => actual == expected,
        FilterOp::Ne(expected) => actual != expected,
        FilterOp::Gte(bound) => ordered(actual, bound).is_some_and(Ordering::is_ge),
        FilterOp::Gt(bound) => ordered(actual, bound).is_some_and(Ordering::is_gt),
        FilterOp::Lte(bound) => ordered(actual, bound).is_some_and(Ordering::is_le),
        FilterOp::Lt(bound) => ordered(actual, bound).is_some_and(Ordering::is_lt),
    }
}

/// Range comparison for numbers and strings only; null never matches.
fn ordered(actual: &Json, bound: &Json) -> Option<Ordering> {
    match (actual, bound) {
        (Json::Number(a), Json::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return Some(ai.cmp(&bi));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Json::String(a), Json::String(b)) => match (instant(a), instant(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(a.cmp(b)),
        },
        _ => None,
    }
}

/// Stored timestamps vary in sub-second digits, so RFC 3339 strings are
/// compared as instants rather than lexically.
fn instant(s: &str) -> Option<DateTime<FixedOffset>> {
    if s.len() < 20 || s.as_bytes()[10] != b'T' {
        return None;
    }
    DateTime::parse_from_rfc3339(s).ok()
}

/// Collects the non-null values a dotted path reaches, in document order.
pub fn lookup<'d>(document: &'d Document, path: &str) -> Vec<&'d Json> {
    let mut segments = path.split('.');
    let mut reached: Vec<&Json> = segments
        .next()
        .and_then(|first| document.get(first))
        .into_iter()
        .collect();

    for segment in segments {
        reached = reached
            .into_iter()
            .flat_map(elements)
            .filter_map(|v| v.as_object()?.get(segment))
            .collect();
    }

    reached
        .into_iter()
        .flat_map(elements)
        .filter(|v| !v.is_null())
        .collect()
}

fn elements(value: &Json) -> Vec<&Json> {
    match value {
        Json::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Sorts documents by the sort keys, then by record key.
///
/// A multi-valued path sorts by its first value. Ordering rules: missing
/// or null < bool < number < string < array < object.
pub fn sort(documents: &mut [(Key, Document)], order: &[SortKey]) {
    documents.sort_by(|(ka, a), (kb, b)| {
        order
            .iter()
            .map(|key| {
                let ordering =
                    compare_values(first_value(a, &key.field), first_value(b, &key.field));
                match key.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or_else(|| ka.cmp(kb))
    });
}

fn first_value<'d>(document: &'d Document, path: &str) -> Option<&'d Json> {
    lookup(document, path).into_iter().next()
}

fn compare_values(a: Option<&Json>, b: Option<&Json>) -> Ordering {
    let type_order = |v: &Json| -> u8 {
        match v {
            Json::Null => 0,
            Json::Bool(_) => 1,
            Json::Number(_) => 2,
            Json::String(_) => 3,
            Json::Array(_) => 4,
            Json::Object(_) => 5,
        }
    };

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Json::Bool(x), Json::Bool(y)) => x.cmp(y),
            (Json::Number(_), Json::Number(_)) | (Json::String(_), Json::String(_)) => {
                ordered(a, b).unwrap_or(Ordering::Equal)
            }
            _ => type_order(a).cmp(&type_order(b)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Json) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_equality_without_coercion() {
        let d = doc(json!({"value": 123, "name": "Ada"}));
        assert!(matches(&d, &[Predicate::eq("value", json!(123))]));
        assert!(!matches(&d, &[Predicate::eq("value", json!("123"))]));
        assert!(matches(&d, &[Predicate::ne("name", json!("Bob"))]));
    }

    #[test]
    fn test_range_predicates() {
        let d = doc(json!({"age": 25, "at": "2024-01-02T00:00:00Z"}));
        assert!(matches(&d, &[Predicate::gte("age", json!(18))]));
        assert!(matches(&d, &[Predicate::lte("age", json!(25.0))]));
        assert!(!matches(&d, &[Predicate::gt("age", json!(25))]));
        assert!(matches(&d, &[Predicate::lt("at", json!("2024-02-01T00:00:00Z"))]));
        assert!(!matches(&d, &[Predicate::lt("age", json!("30"))]));
    }

    #[test]
    fn test_timestamps_compare_as_instants() {
        let d = doc(json!({"at": "2024-01-01T00:00:00.500Z"}));
        assert!(matches(&d, &[Predicate::gt("at", json!("2024-01-01T00:00:00Z"))]));
        assert!(!matches(&d, &[Predicate::lt("at", json!("2024-01-01T00:00:00Z"))]));
    }

    #[test]
    fn test_dotted_paths_and_arrays() {
        let d = doc(json!({
            "name": {"val": "Ada", "idx": "ada"},
            "tags": ["x", "y"],
            "title": {"en": "Hi", "de": null}
        }));
        assert!(matches(&d, &[Predicate::eq("name.idx", json!("ada"))]));
        assert!(matches(&d, &[Predicate::eq("tags", json!("y"))]));
        assert!(!matches(&d, &[Predicate::ne("tags", json!("y"))]));
        assert!(matches(&d, &[Predicate::eq("title.en", json!("Hi"))]));
        assert!(!matches(&d, &[Predicate::eq("title.de", json!(null))]));
    }

    #[test]
    fn test_missing_and_null_fields() {
        let d = doc(json!({"name": null}));
        assert!(!matches(&d, &[Predicate::eq("name", json!("Ada"))]));
        assert!(!matches(&d, &[Predicate::gte("age", json!(1))]));
        assert!(matches(&d, &[Predicate::ne("age", json!(1))]));
    }

    #[test]
    fn test_arrays_fan_out_mid_path() {
        let d = doc(json!({
            "members": [
                {"reference_key": "Person/A", "mirror": {"name": "Ann"}},
                {"reference_key": "Person/B", "mirror": {"name": "Ben"}}
            ],
            "tags": [{"val": "Red", "idx": "red"}, {"val": "Blue", "idx": "blue"}]
        }));
        assert!(matches(&d, &[Predicate::eq("members.reference_key", json!("Person/B"))]));
        assert!(matches(&d, &[Predicate::eq("members.mirror.name", json!("Ann"))]));
        assert!(!matches(&d, &[Predicate::eq("members.mirror.name", json!("Bob"))]));
        assert!(matches(&d, &[Predicate::eq("tags.idx", json!("blue"))]));
        assert!(!matches(&d, &[Predicate::ne("tags.idx", json!("red"))]));
        assert!(matches(&d, &[Predicate::ne("tags.idx", json!("green"))]));

        let keyed = doc(json!({"title": {"en": ["a", "b"], "de": ["c"]}}));
        assert!(matches(&keyed, &[Predicate::eq("title.de", json!("c"))]));
        assert_eq!(lookup(&keyed, "title.en"), vec![&json!("a"), &json!("b")]);
    }

    #[test]
    fn test_null_sorts_with_missing() {
        let mut docs = vec![
            (Key::new("P", "b"), doc(json!({"age": null}))),
            (Key::new("P", "c"), doc(json!({"age": 1}))),
            (Key::new("P", "a"), doc(json!({}))),
        ];
        sort(&mut docs, &[SortKey::asc("age")]);
        let ids: Vec<_> = docs.iter().map(|(k, _)| k.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_with_key_tiebreak() {
        let mut docs = vec![
            (Key::new("P", "c"), doc(json!({"age": 30}))),
            (Key::new("P", "b"), doc(json!({"age": 20}))),
            (Key::new("P", "a"), doc(json!({"age": 30}))),
            (Key::new("P", "d"), doc(json!({}))),
        ];
        sort(&mut docs, &[SortKey::desc("age")]);
        let ids: Vec<_> = docs.iter().map(|(k, _)| k.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "c", "b", "d"]);

        sort(&mut docs, &[]);
        let ids: Vec<_> = docs.iter().map(|(k, _)| k.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }
}
