//! Query structures
//!
//! A `Query` names fields as the schema declares them. Before it reaches
//! the store it is lowered to storage paths (see `lower`).

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Filter operation types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    /// field = value
    Eq(Json),
    /// field != value
    Ne(Json),
    /// field >= value
    Gte(Json),
    /// field > value
    Gt(Json),
    /// field <= value
    Lte(Json),
    /// field < value
    Lt(Json),
}

impl FilterOp {
    pub fn operand(&self) -> &Json {
        match self {
            FilterOp::Eq(v)
            | FilterOp::Ne(v)
            | FilterOp::Gte(v)
            | FilterOp::Gt(v)
            | FilterOp::Lte(v)
            | FilterOp::Lt(v) => v,
        }
    }

    /// Same operation with a different operand.
    pub fn with_operand(&self, operand: Json) -> Self {
        match self {
            FilterOp::Eq(_) => FilterOp::Eq(operand),
            FilterOp::Ne(_) => FilterOp::Ne(operand),
            FilterOp::Gte(_) => FilterOp::Gte(operand),
            FilterOp::Gt(_) => FilterOp::Gt(operand),
            FilterOp::Lte(_) => FilterOp::Lte(operand),
            FilterOp::Lt(_) => FilterOp::Lt(operand),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(
            self,
            FilterOp::Gte(_) | FilterOp::Gt(_) | FilterOp::Lte(_) | FilterOp::Lt(_)
        )
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "eq",
            FilterOp::Ne(_) => "ne",
            FilterOp::Gte(_) => "gte",
            FilterOp::Gt(_) => "gt",
            FilterOp::Lte(_) => "lte",
            FilterOp::Lt(_) => "lt",
        }
    }
}

/// A single predicate (field + operation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Field name, optionally dotted (`title.en`, `address.zip`)
    pub field: String,
    pub op: FilterOp,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    pub fn eq(field: impl Into<String>, value: Json) -> Self {
        Self::new(field, FilterOp::Eq(value))
    }

    pub fn ne(field: impl Into<String>, value: Json) -> Self {
        Self::new(field, FilterOp::Ne(value))
    }

    pub fn gte(field: impl Into<String>, value: Json) -> Self {
        Self::new(field, FilterOp::Gte(value))
    }

    pub fn gt(field: impl Into<String>, value: Json) -> Self {
        Self::new(field, FilterOp::Gt(value))
    }

    pub fn lte(field: impl Into<String>, value: Json) -> Self {
        Self::new(field, FilterOp::Lte(value))
    }

    pub fn lt(field: impl Into<String>, value: Json) -> Self {
        Self::new(field, FilterOp::Lt(value))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One sort criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A query over one entity kind.
///
/// Predicates are combined with AND. Sort keys apply in order; the store
/// breaks remaining ties by record key.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: String,
    pub predicates: Vec<Predicate>,
    pub order: Vec<SortKey>,
    /// Page size; the configured default when absent
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filter(self, field: impl Into<String>, op: FilterOp) -> Self {
        self.with_predicate(Predicate::new(field, op))
    }

    pub fn filter_eq(self, field: impl Into<String>, value: Json) -> Self {
        self.with_predicate(Predicate::eq(field, value))
    }

    pub fn order_by(mut self, key: SortKey) -> Self {
        self.order.push(key);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_builder() {
        let query = Query::new("Person")
            .filter_eq("name", json!("Ada"))
            .filter("age", FilterOp::Gte(json!(18)))
            .order_by(SortKey::desc("age"))
            .with_limit(5);

        assert_eq!(query.kind, "Person");
        assert_eq!(query.predicates.len(), 2);
        assert_eq!(query.order, vec![SortKey::desc("age")]);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_operand_rewrite_keeps_op() {
        let op = FilterOp::Lt(json!("B"));
        let rewritten = op.with_operand(json!("b"));
        assert_eq!(rewritten, FilterOp::Lt(json!("b")));
        assert!(rewritten.is_range());
        assert_eq!(rewritten.op_name(), "lt");
        assert_eq!(FilterOp::Ne(json!(1)).operand(), &json!(1));
    }
}
