//! Repository
//!
//! Ties the pipeline together over one store. The write path is
//! validate, resolve relations, serialize, put; every step after
//! validation runs inside a transaction the caller owns.

use std::sync::Arc;

use super::errors::{RepositoryError, RepositoryResult};
use crate::collection::{lower, Query, RecordCollection};
use crate::config::CoreConfig;
use crate::observability::{log_event, metrics, Event};
use crate::record::Record;
use crate::relation::{MirrorRefreshSink, NullSink, RelationResolver};
use crate::schema::{Schema, SchemaRegistry};
use crate::serialize::{from_storage, to_storage};
use crate::store::{run_in_transaction, DocumentStore, Transaction};
use crate::validation::Validator;
use crate::value::{Document, Key};

static NULL_SINK: NullSink = NullSink;

/// Result of `Repository::save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written under a newly allocated key
    Created(Key),
    /// Written over the record's existing key
    Updated(Key),
    /// Not written; the record carries the field errors
    Rejected,
}

impl SaveOutcome {
    pub fn key(&self) -> Option<&Key> {
        match self {
            SaveOutcome::Created(key) | SaveOutcome::Updated(key) => Some(key),
            SaveOutcome::Rejected => None,
        }
    }

    pub fn is_written(&self) -> bool {
        !matches!(self, SaveOutcome::Rejected)
    }

    /// Gives `record` the key it was created under.
    ///
    /// Call once the transaction has committed; until then the record
    /// stays keyless, so a retry after a failed commit creates again.
    pub fn apply_to(&self, record: &mut Record) {
        if let SaveOutcome::Created(key) = self {
            record.set_key(key.clone());
        }
    }
}

/// Record access for every registered kind of one store.
pub struct Repository<'a, S: DocumentStore> {
    registry: &'a SchemaRegistry,
    store: &'a S,
    config: &'a CoreConfig,
    sink: &'a dyn MirrorRefreshSink,
}

impl<'a, S: DocumentStore> Repository<'a, S> {
    /// Creates a repository that drops mirror refresh signals.
    pub fn new(registry: &'a SchemaRegistry, store: &'a S, config: &'a CoreConfig) -> Self {
        Self {
            registry,
            store,
            config,
            sink: &NULL_SINK,
        }
    }

    /// Routes mirror refresh signals to `sink`.
    pub fn with_sink(mut self, sink: &'a dyn MirrorRefreshSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn schema(&self, kind: &str) -> RepositoryResult<&'a Arc<Schema>> {
        self.registry
            .get(kind)
            .ok_or_else(|| RepositoryError::UnknownKind(kind.to_string()))
    }

    /// Validates raw input against the schema of `kind`.
    ///
    /// Pass the stored record as `existing` when editing; omitted fields
    /// then keep its values.
    pub fn validate(
        &self,
        kind: &str,
        raw: &Document,
        existing: Option<&Record>,
    ) -> RepositoryResult<Record> {
        let schema = self.schema(kind)?;
        Ok(Validator::new(self.config).validate(schema, raw, existing))
    }

    pub fn resolver(&self) -> RelationResolver<'a> {
        RelationResolver::new(self.registry, self.sink)
    }

    /// Writes a validated record inside `txn`.
    ///
    /// Records with field errors are rejected before anything is read.
    /// Relations are resolved against `txn`; a missing target rejects the
    /// record with a `target missing` error. A record without a key is
    /// written under a fresh one, returned in `Created` and not stored on
    /// the record (see `SaveOutcome::apply_to`). Rewriting a kind that
    /// relations point at signals a mirror refresh.
    pub fn save<T: Transaction>(
        &self,
        txn: &mut T,
        record: &mut Record,
    ) -> RepositoryResult<SaveOutcome> {
        if !record.is_valid() {
            return Ok(SaveOutcome::Rejected);
        }

        let resolver = self.resolver();
        resolver.resolve_all(txn, record)?;
        if record.has_errors() {
            return Ok(SaveOutcome::Rejected);
        }

        let (key, created) = match record.key() {
            Some(key) => (key.clone(), false),
            None => (Key::allocate(record.kind()), true),
        };

        txn.put(&key, to_storage(record))?;

        metrics().increment_records_written();
        log_event(
            Event::RecordWritten,
            &[
                ("key", &key.to_string()),
                ("mode", if created { "create" } else { "update" }),
            ],
        );

        if created {
            Ok(SaveOutcome::Created(key))
        } else {
            resolver.signal_write(&key);
            Ok(SaveOutcome::Updated(key))
        }
    }

    /// Reads a committed record.
    pub fn load(&self, key: &Key) -> RepositoryResult<Option<Record>> {
        let schema = self.schema(key.kind())?;
        let document = self.store.read(key)?;
        Ok(document.map(|doc| from_storage(schema, &doc).with_key(key.clone())))
    }

    /// Reads a record as `txn` sees it.
    pub fn load_in<T: Transaction>(
        &self,
        txn: &mut T,
        key: &Key,
    ) -> RepositoryResult<Option<Record>> {
        let schema = self.schema(key.kind())?;
        let document = txn.get(key)?;
        Ok(document.map(|doc| from_storage(schema, &doc).with_key(key.clone())))
    }

    /// Builds the collection of records `query` selects.
    pub fn query(&self, query: &Query) -> RepositoryResult<RecordCollection<'a, S>> {
        let schema = self.schema(&query.kind)?;
        let request = lower(query, schema, self.config)?;
        Ok(RecordCollection::new(self.store, Arc::clone(schema), request))
    }

    /// Runs `f` in a transaction; commits on `Ok`, rolls back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut S::Txn<'a>) -> RepositoryResult<T>,
    {
        run_in_transaction(self.store, f)
    }
}
