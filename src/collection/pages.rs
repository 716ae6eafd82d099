//! Lazy record pages over a store query

use std::sync::Arc;

use crate::observability::{log_event, metrics, Event};
use crate::record::Record;
use crate::schema::Schema;
use crate::serialize::from_storage;
use crate::store::{Cursor, DocumentStore, QueryRequest, StoreResult};

/// One materialized page.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// `None` exactly when the query is exhausted
    pub cursor: Option<Cursor>,
}

/// The records a query selects, fetched one page at a time.
///
/// Holds the lowered request but runs nothing until a page is asked for.
/// Any page can be fetched again from its cursor.
pub struct RecordCollection<'s, S: DocumentStore> {
    store: &'s S,
    schema: Arc<Schema>,
    request: QueryRequest,
}

impl<'s, S: DocumentStore> RecordCollection<'s, S> {
    pub fn new(store: &'s S, schema: Arc<Schema>, request: QueryRequest) -> Self {
        Self {
            store,
            schema,
            request,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The request as the store receives it.
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Fetches the page starting at `cursor`, or the first page.
    pub fn next_page(&self, cursor: Option<&Cursor>) -> StoreResult<RecordPage> {
        let request = self.request.clone().with_cursor(cursor.cloned());
        let page = self.store.query(&request)?;

        let records: Vec<Record> = page
            .documents
            .into_iter()
            .map(|(key, document)| from_storage(&self.schema, &document).with_key(key))
            .collect();

        metrics().increment_queries();
        log_event(
            Event::QueryPage,
            &[
                ("kind", self.schema.kind()),
                ("records", &records.len().to_string()),
                ("more", if page.cursor.is_some() { "true" } else { "false" }),
            ],
        );

        Ok(RecordPage {
            records,
            cursor: page.cursor,
        })
    }

    /// Iterates pages from the start until the query is exhausted.
    pub fn pages(&self) -> Pages<'_, S> {
        Pages {
            collection: self,
            cursor: None,
            done: false,
        }
    }
}

/// Page iterator; stops after the last page or the first error.
pub struct Pages<'c, S: DocumentStore> {
    collection: &'c RecordCollection<'c, S>,
    cursor: Option<Cursor>,
    done: bool,
}

impl<S: DocumentStore> Iterator for Pages<'_, S> {
    type Item = StoreResult<Vec<Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.collection.next_page(self.cursor.as_ref()) {
            Ok(page) => {
                self.done = page.cursor.is_none();
                self.cursor = page.cursor;
                Some(Ok(page.records))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
