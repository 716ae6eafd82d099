//! Record collection
//!
//! A query names a kind, filters, an order and a page size. It is lowered
//! against the schema into a store request, then materialized lazily as
//! pages of records. Building a collection never touches the store.

mod ast;
mod errors;
mod lower;
mod pages;

pub use ast::{FilterOp, Predicate, Query, SortDirection, SortKey};
pub use errors::{QueryError, QueryResult};
pub use lower::lower;
pub use pages::{Pages, RecordCollection, RecordPage};
