//! Store-level query request, result page and cursor

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::errors::{StoreError, StoreResult};
use crate::collection::{Predicate, SortKey};
use crate::value::{Document, Key};

/// Opaque continuation token.
///
/// Callers forward it verbatim; only the store that issued it reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A query as the store receives it: storage paths, storage-shaped
/// operands.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub kind: String,
    pub predicates: Vec<Predicate>,
    pub order: Vec<SortKey>,
    pub limit: usize,
    pub cursor: Option<Cursor>,
}

impl QueryRequest {
    pub fn new(kind: impl Into<String>, limit: usize) -> Self {
        Self {
            kind: kind.into(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// CRC32 over kind, predicates and order.
    ///
    /// Limit and cursor are excluded so a caller may change the page size
    /// while paginating.
    pub fn fingerprint(&self) -> u32 {
        let canonical = json!({
            "kind": self.kind,
            "predicates": self.predicates,
            "order": self.order,
        });
        crc32fast::hash(canonical.to_string().as_bytes())
    }
}

/// One page of documents with the cursor for the next one.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub documents: Vec<(Key, Document)>,
    /// `None` exactly when the result set is exhausted
    pub cursor: Option<Cursor>,
}

#[derive(Serialize, Deserialize)]
struct CursorState {
    #[serde(rename = "q")]
    fingerprint: u32,
    #[serde(rename = "o")]
    offset: usize,
}

/// Encodes a position in the result set of `request`.
pub(crate) fn encode_cursor(request: &QueryRequest, offset: usize) -> Cursor {
    let state = CursorState {
        fingerprint: request.fingerprint(),
        offset,
    };
    // Serializing two integers cannot fail.
    let bytes = serde_json::to_vec(&state).unwrap_or_default();
    Cursor(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decodes a cursor issued for `request`; rejects cursors of other queries.
pub(crate) fn decode_cursor(request: &QueryRequest, cursor: &Cursor) -> StoreResult<usize> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.as_str())
        .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
    let state: CursorState =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
    if state.fingerprint != request.fingerprint() {
        return Err(StoreError::InvalidCursor(
            "cursor was issued for a different query".into(),
        ));
    }
    Ok(state.offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> QueryRequest {
        let mut request = QueryRequest::new("Person", 10);
        request.predicates.push(Predicate::eq("name", json!("Ada")));
        request
    }

    #[test]
    fn test_cursor_bound_to_query() {
        let cursor = encode_cursor(&request(), 20);
        assert_eq!(decode_cursor(&request(), &cursor), Ok(20));

        let mut other = request();
        other.kind = "Team".into();
        assert!(matches!(
            decode_cursor(&other, &cursor),
            Err(StoreError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_fingerprint_ignores_limit() {
        let mut bigger = request();
        bigger.limit = 50;
        assert_eq!(request().fingerprint(), bigger.fingerprint());
    }

    #[test]
    fn test_garbage_cursor_rejected() {
        let err = decode_cursor(&request(), &Cursor::new("!!not base64!!")).unwrap_err();
        assert_eq!(err.code(), "AERO_STORE_INVALID_CURSOR");
        let err = decode_cursor(&request(), &Cursor::new(URL_SAFE_NO_PAD.encode(b"{}"))).unwrap_err();
        assert_eq!(err.code(), "AERO_STORE_INVALID_CURSOR");
    }
}
