//! Query lowering
//!
//! Rewrites a schema-level `Query` into the `QueryRequest` the store
//! executes. Field paths become storage paths and operands take the
//! storage shape of the field they are compared against:
//!
//! | Field | Path | Operand |
//! |---|---|---|
//! | case-insensitive str | `name[.lang].idx` | lower-cased string |
//! | relation | `field.reference_key` | `kind/id` string |
//! | relation mirror | `field.mirror.name` | verbatim |
//! | datetime | unchanged | RFC 3339, UTC |
//! | bool | unchanged | via `true_strings` |
//! | nested record | `field.nested` | per nested field |

use chrono::SecondsFormat;
use serde_json::{json, Value as Json};

use super::ast::{Predicate, Query, SortKey};
use super::errors::{QueryError, QueryResult};
use crate::config::CoreConfig;
use crate::schema::{FieldKind, Schema};
use crate::store::QueryRequest;
use crate::validation::Validator;
use crate::value::Value;

/// Lowers `query` against `schema`; the page size comes from `config`.
pub fn lower(query: &Query, schema: &Schema, config: &CoreConfig) -> QueryResult<QueryRequest> {
    let validator = Validator::new(config);
    let mut request = QueryRequest::new(schema.kind(), config.page_limit(query.limit));

    for predicate in &query.predicates {
        let target = resolve(schema, &predicate.field)?;
        if let Some(kind) = target.kind.filter(|k| predicate.op.is_range() && !is_ordered(k)) {
            return Err(QueryError::UnsupportedOperand {
                field: predicate.field.clone(),
                reason: format!("{} is not defined for {}", predicate.op.op_name(), kind.type_name()),
            });
        }
        let operand = lower_operand(&validator, &target, &predicate.field, predicate.op.operand())?;
        request
            .predicates
            .push(Predicate::new(target.path, predicate.op.with_operand(operand)));
    }

    for key in &query.order {
        let target = resolve(schema, &key.field)?;
        request.order.push(SortKey {
            field: target.path,
            direction: key.direction,
        });
    }

    Ok(request)
}

/// A resolved field path.
struct StoragePath<'s> {
    path: String,
    /// Kind operands are coerced to; `None` passes them through
    kind: Option<&'s FieldKind>,
    /// Compare against the lower-cased index copy
    fold: bool,
}

fn resolve<'s>(schema: &'s Schema, path: &str) -> QueryResult<StoragePath<'s>> {
    let unknown = || QueryError::UnknownField {
        kind: schema.kind().to_string(),
        field: path.to_string(),
    };

    let segments: Vec<&str> = path.split('.').collect();
    let field = schema.get(segments[0]).ok_or_else(unknown)?;
    let mut storage = field.name.clone();
    let mut rest = &segments[1..];

    if let [lang, tail @ ..] = rest {
        if field.language_codes().iter().any(|code| code == lang) {
            storage = format!("{}.{}", storage, lang);
            rest = tail;
        }
    }

    match (&field.kind, rest) {
        (FieldKind::Str { case_sensitive: false, .. }, []) => Ok(StoragePath {
            path: format!("{}.idx", storage),
            kind: Some(&field.kind),
            fold: true,
        }),
        (FieldKind::Relation { .. }, [] | ["reference_key"]) => Ok(StoragePath {
            path: format!("{}.reference_key", storage),
            kind: Some(&field.kind),
            fold: false,
        }),
        (FieldKind::Relation { mirror, .. }, [name]) if mirror.iter().any(|m| m == name) => {
            Ok(StoragePath {
                path: format!("{}.mirror.{}", storage, name),
                kind: None,
                fold: false,
            })
        }
        (FieldKind::Record { schema: nested }, [_, ..]) => {
            let inner = resolve(nested, &rest.join(".")).map_err(|_| unknown())?;
            Ok(StoragePath {
                path: format!("{}.{}", storage, inner.path),
                ..inner
            })
        }
        (FieldKind::Record { .. }, []) => Err(unknown()),
        (kind, []) => Ok(StoragePath {
            path: storage,
            kind: Some(kind),
            fold: false,
        }),
        _ => Err(unknown()),
    }
}

fn is_ordered(kind: &FieldKind) -> bool {
    !matches!(kind, FieldKind::Bool | FieldKind::Relation { .. })
}

fn lower_operand(
    validator: &Validator<'_>,
    target: &StoragePath<'_>,
    field: &str,
    raw: &Json,
) -> QueryResult<Json> {
    let unsupported = |reason: String| QueryError::UnsupportedOperand {
        field: field.to_string(),
        reason,
    };

    if raw.is_array() || raw.is_object() || raw.is_null() {
        return Err(unsupported("operand must be a string, number or bool".into()));
    }
    let Some(kind) = target.kind else {
        return Ok(raw.clone());
    };

    let value = validator
        .coerce_operand(kind, raw)
        .map_err(|reason| unsupported(reason.to_string()))?;

    Ok(match value {
        Value::Str(s) if target.fold => Json::String(s.to_lowercase()),
        Value::Str(s) => Json::String(s),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::Bool(b) => Json::Bool(b),
        Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Relation(relation) => Json::String(relation.key.to_string()),
        Value::Record(_) | Value::Raw(_) => raw.clone(),
    })
}
