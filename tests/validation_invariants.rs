//! Validation Invariant Tests
//!
//! - Valid input yields a record without errors
//! - Omitting a required field errors that field alone
//! - Language presence follows the submitted languages
//! - Unknown input keys are ignored
//! - A failed record keeps the raw input for redisplay

use std::sync::Arc;

use aerorecord::schema::{FieldDescriptor, Schema};
use aerorecord::validation::validate;
use aerorecord::value::{Document, FieldSlot, Value};
use serde_json::{json, Value as Json};

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(value: Json) -> Document {
    value.as_object().cloned().unwrap()
}

fn person() -> Arc<Schema> {
    Arc::new(
        Schema::declare(
            "Person",
            vec![
                FieldDescriptor::string("name").required(),
                FieldDescriptor::string("tags").multiple(),
                FieldDescriptor::string("email").languages(["en", "de"]).required(),
            ],
        )
        .unwrap(),
    )
}

fn strs(values: &[&str]) -> FieldSlot {
    FieldSlot::Multiple(values.iter().map(|s| Value::Str(s.to_string())).collect())
}

// =============================================================================
// Person Scenario
// =============================================================================

#[test]
fn test_missing_required_language_is_scoped() {
    let record = validate(
        &person(),
        &doc(json!({"name": "Ada", "tags": ["x", "y"], "email": {"en": "a@x.com"}})),
        None,
    );

    assert_eq!(record.errors().len(), 1);
    assert_eq!(record.error_codes("email"), vec!["required:de"]);
    assert_eq!(record.get("tags"), &strs(&["x", "y"]));
    assert_eq!(
        record.get("email").language("en"),
        &FieldSlot::Single(Value::Str("a@x.com".into()))
    );
    assert!(!record.is_valid());
}

#[test]
fn test_complete_input_is_valid() {
    let record = validate(
        &person(),
        &doc(json!({
            "name": "Ada",
            "email": {"en": "a@x.com", "de": "a@x.de"}
        })),
        None,
    );

    assert!(record.errors().is_empty());
    assert!(record.is_valid());
    assert_eq!(record.get("tags"), &FieldSlot::Empty);
}

// =============================================================================
// Required Tests
// =============================================================================

/// Each required field, omitted alone, is the only field in error.
#[test]
fn test_omitted_required_field_errors_alone() {
    let complete = json!({"name": "Ada", "email": {"en": "a@x.com", "de": "a@x.de"}});

    for omitted in ["name", "email"] {
        let mut input = doc(complete.clone());
        input.remove(omitted);
        let record = validate(&person(), &input, None);

        let fields: Vec<&String> = record.errors().keys().collect();
        assert_eq!(fields, vec![omitted], "omitting {}", omitted);
        assert!(record
            .field_errors(omitted)
            .iter()
            .all(|e| e.reason.code() == "required"));
    }

    // A language field reports each missing language
    let record = validate(&person(), &doc(json!({"name": "Ada"})), None);
    assert_eq!(record.error_codes("email"), vec!["required:en", "required:de"]);
}

#[test]
fn test_validation_is_deterministic() {
    let input = doc(json!({"name": 42, "tags": "x", "email": {"de": "d"}}));
    let first = validate(&person(), &input, None);

    for _ in 0..50 {
        let again = validate(&person(), &input, None);
        assert_eq!(again.errors(), first.errors());
        assert!(again.same_values(&first));
    }
}

// =============================================================================
// Multiple + Languages Tests
// =============================================================================

#[test]
fn test_language_presence_matches_submission() {
    let schema = Arc::new(
        Schema::declare(
            "Article",
            vec![FieldDescriptor::string("keywords")
                .multiple()
                .languages(["en", "de", "fr"])],
        )
        .unwrap(),
    );

    let submissions = [
        json!({"en": ["a"]}),
        json!({"de": ["b", "c"], "fr": ["d"]}),
        json!({"en": ["a"], "de": ["b"], "fr": ["c"]}),
    ];
    for submitted in submissions {
        let expected: Vec<&str> = ["en", "de", "fr"]
            .into_iter()
            .filter(|lang| submitted.get(lang).is_some())
            .collect();
        let record = validate(&schema, &doc(json!({"keywords": submitted})), None);

        assert!(record.errors().is_empty());
        assert_eq!(record.present_languages("keywords"), expected);
    }
}

#[test]
fn test_unsubmitted_languages_take_default() {
    let schema = Arc::new(
        Schema::declare(
            "Article",
            vec![FieldDescriptor::string("keywords")
                .multiple()
                .languages(["en", "de"])
                .default_value(json!(["misc"]))],
        )
        .unwrap(),
    );

    let record = validate(&schema, &doc(json!({"keywords": {"en": ["a", "b"]}})), None);
    let slot = record.get("keywords");
    assert_eq!(slot.language("en"), &strs(&["a", "b"]));
    assert_eq!(slot.language("de"), &strs(&["misc"]));
}

// =============================================================================
// Unknown Keys and Redisplay Tests
// =============================================================================

#[test]
fn test_unknown_keys_never_error_or_appear() {
    let record = validate(
        &person(),
        &doc(json!({
            "name": "Ada",
            "email": {"en": "a@x.com", "de": "a@x.de"},
            "nickname": "countess",
            "tags.en": "x",
            "__proto__": {}
        })),
        None,
    );

    assert!(record.errors().is_empty());
    assert!(record.values().keys().all(|name| person().get(name).is_some()));
    assert!(record.values().get("nickname").is_none());
}

#[test]
fn test_failed_input_kept_for_redisplay() {
    let schema = Arc::new(
        Schema::declare("Order", vec![FieldDescriptor::int("quantity").required()]).unwrap(),
    );
    let input = doc(json!({"quantity": "a dozen"}));
    let record = validate(&schema, &input, None);

    assert_eq!(record.error_codes("quantity"), vec!["invalid_type"]);
    assert_eq!(
        record.get("quantity"),
        &FieldSlot::Single(Value::Raw(json!("a dozen")))
    );
    assert_eq!(record.source(), Some(&input));
}
