//! Document store interface
//!
//! The core treats the store as an opaque transactional key-value store
//! with query capability. Every write of one record, and every relation
//! target it reads, happens inside one caller-owned transaction.
//!
//! `MemoryStore` is the in-process implementation used by tests and
//! embedders without an external backend.

mod errors;
mod filter;
mod memory;
mod request;

use crate::value::{Document, Key};

pub use errors::{StoreError, StoreResult};
pub use memory::{MemoryStore, MemoryTransaction};
pub use request::{Cursor, QueryPage, QueryRequest};

/// One open transaction.
///
/// Reads see the transaction's own writes. Dropping a transaction without
/// calling `commit` rolls it back.
pub trait Transaction {
    fn get(&mut self, key: &Key) -> StoreResult<Option<Document>>;

    fn put(&mut self, key: &Key, document: Document) -> StoreResult<()>;

    /// Makes all writes visible atomically or fails with
    /// `TransactionConflict`.
    fn commit(self) -> StoreResult<()>;
}

/// A transactional document store.
pub trait DocumentStore {
    type Txn<'a>: Transaction
    where
        Self: 'a;

    /// Reads the committed document of a key.
    fn read(&self, key: &Key) -> StoreResult<Option<Document>>;

    fn begin(&self) -> StoreResult<Self::Txn<'_>>;

    /// Runs a query and returns one page.
    fn query(&self, request: &QueryRequest) -> StoreResult<QueryPage>;
}

/// Runs `f` inside a transaction of `store`.
///
/// Commits when `f` returns `Ok`. On `Err`, or if `f` panics, the
/// transaction is dropped uncommitted. Conflicts surface unchanged; there
/// is no retry.
pub fn run_in_transaction<'s, S, T, E, F>(store: &'s S, f: F) -> Result<T, E>
where
    S: DocumentStore,
    F: FnOnce(&mut S::Txn<'s>) -> Result<T, E>,
    E: From<StoreError>,
{
    let mut txn = store.begin()?;
    let value = f(&mut txn)?;
    txn.commit()?;
    Ok(value)
}
