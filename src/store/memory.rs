//! In-process document store
//!
//! Reference implementation of `DocumentStore`:
//! - documents keyed by `Key`, each with a version bumped on every write
//! - transactions buffer writes and remember the version of every key they
//!   touched; commit fails with `TransactionConflict` if any of those
//!   versions moved, otherwise applies all writes at once
//! - dropping a transaction without committing discards its writes
//! - queries filter and sort a snapshot, and page with offset cursors

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::errors::{StoreError, StoreResult};
use super::filter;
use super::request::{decode_cursor, encode_cursor, QueryPage, QueryRequest};
use super::{DocumentStore, Transaction};
use crate::observability::{log_event, metrics, Event};
use crate::value::{Document, Key};

/// Version of a key that has never been written.
const ABSENT: u64 = 0;

#[derive(Debug)]
struct Versioned {
    version: u64,
    document: Document,
}

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<Key, Versioned>,
    last_version: u64,
}

impl State {
    fn version_of(&self, key: &Key) -> u64 {
        self.documents.get(key).map_or(ABSENT, |v| v.version)
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.read_state().map_or(0, |s| s.documents.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

impl DocumentStore for MemoryStore {
    type Txn<'a> = MemoryTransaction<'a>;

    fn read(&self, key: &Key) -> StoreResult<Option<Document>> {
        let state = self.read_state()?;
        Ok(state.documents.get(key).map(|v| v.document.clone()))
    }

    fn begin(&self) -> StoreResult<MemoryTransaction<'_>> {
        Ok(MemoryTransaction {
            store: self,
            seen: HashMap::new(),
            writes: BTreeMap::new(),
        })
    }

    fn query(&self, request: &QueryRequest) -> StoreResult<QueryPage> {
        let offset = match &request.cursor {
            Some(cursor) => decode_cursor(request, cursor)?,
            None => 0,
        };

        let mut matching: Vec<(Key, Document)> = {
            let state = self.read_state()?;
            state
                .documents
                .iter()
                .filter(|(key, _)| key.kind() == request.kind)
                .filter(|(_, v)| filter::matches(&v.document, &request.predicates))
                .map(|(key, v)| (key.clone(), v.document.clone()))
                .collect()
        };
        filter::sort(&mut matching, &request.order);

        let limit = request.limit.max(1);
        let total = matching.len();
        let documents: Vec<_> = matching.into_iter().skip(offset).take(limit).collect();
        let next = offset + documents.len();
        let cursor = (next < total).then(|| encode_cursor(request, next));

        Ok(QueryPage { documents, cursor })
    }
}

/// Optimistic transaction over a `MemoryStore`.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    /// Version of each touched key when first touched
    seen: HashMap<Key, u64>,
    writes: BTreeMap<Key, Document>,
}

impl MemoryTransaction<'_> {
    fn remember(&mut self, key: &Key, version: u64) {
        self.seen.entry(key.clone()).or_insert(version);
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn get(&mut self, key: &Key) -> StoreResult<Option<Document>> {
        if let Some(document) = self.writes.get(key) {
            return Ok(Some(document.clone()));
        }
        let (version, document) = {
            let state = self.store.read_state()?;
            match state.documents.get(key) {
                Some(v) => (v.version, Some(v.document.clone())),
                None => (ABSENT, None),
            }
        };
        self.remember(key, version);
        Ok(document)
    }

    fn put(&mut self, key: &Key, document: Document) -> StoreResult<()> {
        if !self.seen.contains_key(key) {
            let version = self.store.read_state()?.version_of(key);
            self.remember(key, version);
        }
        self.writes.insert(key.clone(), document);
        Ok(())
    }

    fn commit(self) -> StoreResult<()> {
        let mut state = self.store.write_state()?;

        if let Some(key) = self
            .seen
            .iter()
            .find(|(key, version)| state.version_of(key) != **version)
            .map(|(key, _)| key.to_string())
        {
            metrics().increment_transaction_conflicts();
            log_event(Event::TransactionConflict, &[("key", &key)]);
            return Err(StoreError::TransactionConflict { key });
        }

        for (key, document) in self.writes {
            state.last_version += 1;
            let version = state.last_version;
            state.documents.insert(key, Versioned { version, document });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Predicate, SortKey};
    use crate::store::run_in_transaction;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn seed(store: &MemoryStore, items: &[(&str, serde_json::Value)]) {
        run_in_transaction(store, |txn| {
            for (id, body) in items {
                txn.put(&Key::new("Person", *id), doc(body.clone()))?;
            }
            Ok::<_, StoreError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_commit_makes_writes_visible() {
        let store = MemoryStore::new();
        let key = Key::new("Person", "1");
        let mut txn = store.begin().unwrap();
        txn.put(&key, doc(json!({"name": "Ada"}))).unwrap();
        assert_eq!(txn.get(&key).unwrap(), Some(doc(json!({"name": "Ada"}))));
        assert_eq!(store.read(&key).unwrap(), None);

        txn.commit().unwrap();
        assert_eq!(store.read(&key).unwrap(), Some(doc(json!({"name": "Ada"}))));
    }

    #[test]
    fn test_drop_discards_writes() {
        let store = MemoryStore::new();
        {
            let mut txn = store.begin().unwrap();
            txn.put(&Key::new("Person", "1"), doc(json!({}))).unwrap();
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_update_conflicts() {
        let store = MemoryStore::new();
        seed(&store, &[("1", json!({"n": 0}))]);
        let key = Key::new("Person", "1");

        let mut first = store.begin().unwrap();
        let mut second = store.begin().unwrap();
        first.get(&key).unwrap();
        second.get(&key).unwrap();

        second.put(&key, doc(json!({"n": 2}))).unwrap();
        second.commit().unwrap();

        first.put(&key, doc(json!({"n": 1}))).unwrap();
        let err = first.commit().unwrap_err();
        assert_eq!(
            err,
            StoreError::TransactionConflict {
                key: "Person/1".into()
            }
        );
        assert_eq!(store.read(&key).unwrap(), Some(doc(json!({"n": 2}))));
    }

    #[test]
    fn test_blind_insert_conflicts_with_concurrent_insert() {
        let store = MemoryStore::new();
        let key = Key::new("Person", "x");
        let mut first = store.begin().unwrap();
        first.put(&key, doc(json!({"who": "first"}))).unwrap();
        seed(&store, &[("x", json!({"who": "other"}))]);
        assert!(first.commit().is_err());
    }

    #[test]
    fn test_query_pages_through_results() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                ("a", json!({"age": 40})),
                ("b", json!({"age": 10})),
                ("c", json!({"age": 30})),
                ("d", json!({"age": 20})),
                ("e", json!({"age": 5})),
            ],
        );

        let mut request = QueryRequest::new("Person", 2);
        request.predicates.push(Predicate::gte("age", json!(10)));
        request.order.push(SortKey::asc("age"));

        let first = store.query(&request).unwrap();
        let ids: Vec<_> = first.documents.iter().map(|(k, _)| k.id()).collect();
        assert_eq!(ids, vec!["b", "d"]);

        let second = store
            .query(&request.clone().with_cursor(first.cursor.clone()))
            .unwrap();
        let ids: Vec<_> = second.documents.iter().map(|(k, _)| k.id()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(second.cursor.is_none());
    }

    #[test]
    fn test_query_other_kind_and_foreign_cursor() {
        let store = MemoryStore::new();
        seed(&store, &[("a", json!({"age": 1})), ("b", json!({"age": 2}))]);

        let request = QueryRequest::new("Team", 10);
        let page = store.query(&request).unwrap();
        assert!(page.documents.is_empty());
        assert!(page.cursor.is_none());

        let people = QueryRequest::new("Person", 1);
        let cursor = store.query(&people).unwrap().cursor;
        assert!(cursor.is_some());
        let err = store.query(&request.with_cursor(cursor)).unwrap_err();
        assert_eq!(err.code(), "AERO_STORE_INVALID_CURSOR");
    }
}
