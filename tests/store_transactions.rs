//! Store and Query Tests
//!
//! - Concurrent writers conflict at commit; nothing is retried
//! - Rolled-back transactions leave no partial state
//! - A create that failed to commit is a create again on retry
//! - Paginated queries visit every match exactly once
//! - Cursors are bound to the query that issued them

use std::collections::BTreeSet;

use aerorecord::api::{Repository, RepositoryError, SaveOutcome};
use aerorecord::collection::{Predicate, Query, SortKey};
use aerorecord::config::CoreConfig;
use aerorecord::observability::metrics;
use aerorecord::relation::ChannelSink;
use aerorecord::schema::{FieldDescriptor, Schema, SchemaRegistry};
use aerorecord::store::{DocumentStore, MemoryStore, StoreError, Transaction};
use aerorecord::value::{Document, Key, Value};
use serde_json::{json, Value as Json};

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(value: Json) -> Document {
    value.as_object().cloned().unwrap()
}

fn registry() -> SchemaRegistry {
    SchemaRegistry::from_schemas([
        Schema::declare(
            "Person",
            vec![
                FieldDescriptor::string("name").case_insensitive().required(),
                FieldDescriptor::int("age"),
                FieldDescriptor::bool("active"),
            ],
        )
        .unwrap(),
        Schema::declare(
            "Team",
            vec![
                FieldDescriptor::relation("members", "Person", ["name", "age"]).multiple(),
                FieldDescriptor::string("tags").case_insensitive().multiple(),
            ],
        )
        .unwrap(),
    ])
    .unwrap()
}

fn seed(repo: &Repository<'_, MemoryStore>, people: &[(&str, i64, bool)]) -> Vec<Key> {
    people
        .iter()
        .map(|(name, age, active)| {
            let mut record = repo
                .validate(
                    "Person",
                    &doc(json!({"name": name, "age": age, "active": active})),
                    None,
                )
                .unwrap();
            repo.transaction(|txn| repo.save(txn, &mut record))
                .unwrap()
                .key()
                .cloned()
                .unwrap()
        })
        .collect()
}

fn names(records: &[aerorecord::Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get("name").as_single().and_then(Value::as_str).unwrap().to_string())
        .collect()
}

// =============================================================================
// Transaction Tests
// =============================================================================

#[test]
fn test_concurrent_writers_conflict() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let repo = Repository::new(&registry, &store, &config);
    let key = seed(&repo, &[("Ada", 36, true)]).remove(0);
    let before = metrics().snapshot().transaction_conflicts;

    let mut first = store.begin().unwrap();
    let mut second = store.begin().unwrap();

    let mut a = repo.load_in(&mut first, &key).unwrap().unwrap();
    let mut b = repo.load_in(&mut second, &key).unwrap().unwrap();
    a = repo.validate("Person", &doc(json!({"age": 37})), Some(&a)).unwrap();
    b = repo.validate("Person", &doc(json!({"age": 40})), Some(&b)).unwrap();
    repo.save(&mut first, &mut a).unwrap();
    repo.save(&mut second, &mut b).unwrap();

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert!(matches!(err, StoreError::TransactionConflict { .. }));
    assert!(metrics().snapshot().transaction_conflicts > before);

    let stored = repo.load(&key).unwrap().unwrap();
    assert_eq!(stored.get("age").as_single().and_then(Value::as_int), Some(37));
}

#[test]
fn test_conflict_surfaces_through_repository() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let repo = Repository::new(&registry, &store, &config);
    let key = seed(&repo, &[("Ada", 36, true)]).remove(0);

    let result: Result<SaveOutcome, RepositoryError> = repo.transaction(|txn| {
        let current = repo.load_in(txn, &key)?.unwrap();

        // Another writer commits in between
        let mut other = store.begin()?;
        other.put(&key, doc(json!({"name": "Ada", "age": 99})))?;
        other.commit()?;

        let mut edited = repo.validate("Person", &doc(json!({"age": 37})), Some(&current))?;
        repo.save(txn, &mut edited)
    });

    let err = result.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.code(), "AERO_STORE_TRANSACTION_CONFLICT");
    let stored = repo.load(&key).unwrap().unwrap();
    assert_eq!(stored.get("age").as_single().and_then(Value::as_int), Some(99));
}

#[test]
fn test_failed_transaction_writes_nothing() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let repo = Repository::new(&registry, &store, &config);

    let result: Result<(), RepositoryError> = repo.transaction(|txn| {
        let mut record = repo.validate("Person", &doc(json!({"name": "Ada"})), None)?;
        repo.save(txn, &mut record)?;
        Err(RepositoryError::UnknownKind("Ghost".into()))
    });

    assert!(result.is_err());
    assert!(store.is_empty());
}

#[test]
fn test_create_retried_after_conflict_is_created_again() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let (sink, mut rx) = ChannelSink::new(4);
    let repo = Repository::new(&registry, &store, &config).with_sink(&sink);
    let bob = seed(&repo, &[("Bob", 52, true)]).remove(0);

    let mut team = repo
        .validate("Team", &doc(json!({"members": [bob.to_string()]})), None)
        .unwrap();

    let result: Result<SaveOutcome, RepositoryError> = repo.transaction(|txn| {
        let outcome = repo.save(txn, &mut team)?;
        assert!(matches!(outcome, SaveOutcome::Created(_)));

        // The relation target changes before commit
        let mut other = store.begin()?;
        other.put(&bob, doc(json!({"name": "Robert"})))?;
        other.commit()?;
        Ok(outcome)
    });
    assert!(result.unwrap_err().is_conflict());
    assert!(team.key().is_none());

    let outcome = repo.transaction(|txn| repo.save(txn, &mut team)).unwrap();
    let SaveOutcome::Created(key) = outcome.clone() else {
        panic!("expected a create, got {:?}", outcome);
    };
    outcome.apply_to(&mut team);
    assert_eq!(team.key(), Some(&key));
    assert!(rx.try_recv().is_err());

    let stored = store.read(&key).unwrap().unwrap();
    assert_eq!(stored["members"][0]["mirror"], json!({"name": "Robert"}));
}

// =============================================================================
// Pagination Tests
// =============================================================================

#[test]
fn test_pages_visit_every_match_once() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let repo = Repository::new(&registry, &store, &config);
    let people: Vec<(String, i64, bool)> = (0..11)
        .map(|i| (format!("P{:02}", i), 20 + i, i % 3 != 0))
        .collect();
    let borrowed: Vec<(&str, i64, bool)> =
        people.iter().map(|(n, a, b)| (n.as_str(), *a, *b)).collect();
    seed(&repo, &borrowed);

    let query = Query::new("Person")
        .filter_eq("active", json!("yes"))
        .order_by(SortKey::asc("name"))
        .with_limit(3);
    let collection = repo.query(&query).unwrap();

    let mut seen = Vec::new();
    let mut page_sizes = Vec::new();
    for page in collection.pages() {
        let page = page.unwrap();
        page_sizes.push(page.len());
        seen.extend(names(&page));
    }

    let expected: Vec<String> = people
        .iter()
        .filter(|(_, _, active)| *active)
        .map(|(name, _, _)| name.clone())
        .collect();
    assert_eq!(seen, expected);
    assert_eq!(page_sizes, vec![3, 3, 1]);
    assert_eq!(seen.iter().collect::<BTreeSet<_>>().len(), seen.len());
}

#[test]
fn test_case_insensitive_filter_and_range() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let repo = Repository::new(&registry, &store, &config);
    seed(&repo, &[("Ada", 36, true), ("ADA", 17, false), ("Bob", 52, true)]);

    let page = repo
        .query(&Query::new("Person").filter_eq("name", json!("ada")))
        .unwrap()
        .next_page(None)
        .unwrap();
    assert_eq!(page.records.len(), 2);
    assert!(page.cursor.is_none());

    let page = repo
        .query(
            &Query::new("Person")
                .with_predicate(Predicate::gte("age", json!("18")))
                .order_by(SortKey::desc("age")),
        )
        .unwrap()
        .next_page(None)
        .unwrap();
    assert_eq!(names(&page.records), vec!["Bob", "Ada"]);
}

#[test]
fn test_multiple_fields_match_any_element() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let repo = Repository::new(&registry, &store, &config);
    let keys = seed(&repo, &[("Bob", 52, true), ("Ann", 30, true)]);

    let mut team = repo
        .validate(
            "Team",
            &doc(json!({
                "members": [keys[1].to_string(), keys[0].to_string()],
                "tags": ["Blue", "Red"]
            })),
            None,
        )
        .unwrap();
    repo.transaction(|txn| repo.save(txn, &mut team)).unwrap();
    let mut other = repo
        .validate(
            "Team",
            &doc(json!({"members": [keys[1].to_string()], "tags": ["Green"]})),
            None,
        )
        .unwrap();
    repo.transaction(|txn| repo.save(txn, &mut other)).unwrap();

    let count = |query: Query| repo.query(&query).unwrap().next_page(None).unwrap().records.len();
    assert_eq!(count(Query::new("Team").filter_eq("members", json!(keys[0].to_string()))), 1);
    assert_eq!(count(Query::new("Team").filter_eq("members", json!(keys[1].to_string()))), 2);
    assert_eq!(count(Query::new("Team").filter_eq("members.age", json!(52))), 1);
    assert_eq!(count(Query::new("Team").filter_eq("members.age", json!(30))), 2);
    assert_eq!(count(Query::new("Team").filter_eq("tags", json!("red"))), 1);
    assert_eq!(count(Query::new("Team").filter_eq("tags", json!("GREEN"))), 1);
    assert_eq!(count(Query::new("Team").filter_eq("tags", json!("purple"))), 0);
}

#[test]
fn test_cursor_bound_to_its_query() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let repo = Repository::new(&registry, &store, &config);
    seed(&repo, &[("A", 1, true), ("B", 2, true), ("C", 3, false)]);

    let by_name = repo
        .query(&Query::new("Person").order_by(SortKey::asc("name")).with_limit(1))
        .unwrap();
    let cursor = by_name.next_page(None).unwrap().cursor.unwrap();

    // Same query with another page size accepts it
    let wider = repo
        .query(&Query::new("Person").order_by(SortKey::asc("name")).with_limit(5))
        .unwrap();
    let rest = wider.next_page(Some(&cursor)).unwrap();
    assert_eq!(names(&rest.records), vec!["B", "C"]);

    // A different query rejects it
    let by_age = repo
        .query(&Query::new("Person").order_by(SortKey::asc("age")).with_limit(1))
        .unwrap();
    let err = by_age.next_page(Some(&cursor)).unwrap_err();
    assert_eq!(err.code(), "AERO_STORE_INVALID_CURSOR");

    let err = by_name
        .next_page(Some(&aerorecord::store::Cursor::new("not-a-cursor")))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidCursor(_)));
}

#[test]
fn test_unknown_query_field_rejected() {
    let registry = registry();
    let store = MemoryStore::new();
    let config = CoreConfig::default();
    let repo = Repository::new(&registry, &store, &config);

    let err = repo
        .query(&Query::new("Person").filter_eq("salary", json!(1)))
        .err()
        .unwrap();
    assert_eq!(err.code(), "AERO_QUERY_UNKNOWN_FIELD");
}
