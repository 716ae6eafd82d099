//! Per-kind coercion of one raw element
//!
//! Turns one untyped JSON element into a typed `Value`. On failure the raw
//! element is kept as `Value::Raw` so it can be redisplayed.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as Json;

use super::email::is_valid_email;
use super::validator::{Context, Validator};
use crate::record::{FieldError, Reason};
use crate::schema::{FieldDescriptor, FieldKind};
use crate::value::{Key, RelationValue, Value};

/// Unix timestamps accepted for datetime input, in seconds.
const MIN_TIMESTAMP: i64 = -(1 << 30);
const MAX_TIMESTAMP: i64 = (1 << 31) - 2;

impl<'a> Validator<'a> {
    /// Coerces one element and runs the field's checks on success.
    pub(super) fn coerce_element(
        &self,
        field: &FieldDescriptor,
        raw: &Json,
        ctx: &Context,
    ) -> (Value, Vec<FieldError>) {
        if let FieldKind::Record { schema } = &field.kind {
            let Some(obj) = raw.as_object() else {
                return rejected(raw, Reason::InvalidType { expected: "record" });
            };
            let nested = self.validate_fields(schema, obj, None, ctx);
            let errors = nested
                .errors
                .into_iter()
                .flat_map(|(name, errs)| {
                    errs.into_iter().map(move |e| e.nested_under(&name))
                })
                .collect();
            return (Value::Record(nested.values), errors);
        }

        let value = match self.coerce_scalar(&field.kind, raw, ctx) {
            Ok(value) => value,
            Err(reason) => return rejected(raw, reason),
        };

        let errors = field
            .checks
            .iter()
            .filter_map(|check| check.run(&value))
            .map(|code| FieldError::new(Reason::Custom(code)))
            .collect();
        (value, errors)
    }

    fn coerce_scalar(&self, kind: &FieldKind, raw: &Json, ctx: &Context) -> Result<Value, Reason> {
        match kind {
            FieldKind::Str {
                min_length,
                max_length,
                ..
            } => {
                let s = scalar_string(raw).ok_or(Reason::InvalidType { expected: "str" })?;
                let len = s.chars().count();
                if let Some(min) = *min_length {
                    if len < min {
                        return Err(Reason::TooShort { min });
                    }
                }
                if let Some(max) = *max_length {
                    if len > max {
                        return Err(Reason::TooLong { max });
                    }
                }
                Ok(Value::Str(s))
            }
            FieldKind::Email => {
                let s = raw.as_str().ok_or(Reason::InvalidType { expected: "email" })?;
                if !s.is_empty() && !is_valid_email(s) {
                    return Err(Reason::InvalidEmail);
                }
                Ok(Value::Str(s.to_string()))
            }
            FieldKind::Int { min, max } => {
                let i = parse_int(raw)?;
                if min.is_some_and(|m| i < m) || max.is_some_and(|m| i > m) {
                    return Err(Reason::OutOfRange);
                }
                Ok(Value::Int(i))
            }
            FieldKind::Float { min, max } => {
                let f = parse_float(raw).ok_or(Reason::InvalidType { expected: "float" })?;
                if min.is_some_and(|m| f < m) || max.is_some_and(|m| f > m) {
                    return Err(Reason::OutOfRange);
                }
                Ok(Value::Float(f))
            }
            FieldKind::Bool => match raw {
                Json::Bool(b) => Ok(Value::Bool(*b)),
                Json::String(s) => Ok(Value::Bool(self.config.is_true_string(s))),
                Json::Number(n) => Ok(Value::Bool(self.config.is_true_string(&n.to_string()))),
                _ => Err(Reason::InvalidType { expected: "bool" }),
            },
            FieldKind::Select { choices } => {
                let s = scalar_string(raw).ok_or(Reason::InvalidType { expected: "select" })?;
                if !s.is_empty() && !choices.iter().any(|c| *c == s) {
                    return Err(Reason::NotAChoice);
                }
                Ok(Value::Str(s))
            }
            FieldKind::DateTime { .. } => parse_datetime(raw, ctx.now).map(Value::DateTime),
            FieldKind::Relation { target, .. } => parse_reference(raw, target)
                .map(|key| Value::Relation(RelationValue::unresolved(key))),
            FieldKind::Record { .. } => Err(Reason::InvalidType { expected: "record" }),
        }
    }

    /// Coerces a query operand to the field's value type.
    ///
    /// Bounds, choices and checks are not applied: a filter may compare
    /// against values no record could hold.
    pub(crate) fn coerce_operand(&self, kind: &FieldKind, raw: &Json) -> Result<Value, Reason> {
        match kind {
            FieldKind::Str { .. } | FieldKind::Email | FieldKind::Select { .. } => scalar_string(raw)
                .map(Value::Str)
                .ok_or(Reason::InvalidType { expected: "str" }),
            FieldKind::Int { .. } => parse_int(raw).map(Value::Int),
            FieldKind::Float { .. } => parse_float(raw)
                .map(Value::Float)
                .ok_or(Reason::InvalidType { expected: "float" }),
            FieldKind::DateTime { .. } => parse_datetime(raw, Utc::now()).map(Value::DateTime),
            FieldKind::Bool | FieldKind::Relation { .. } => {
                let ctx = Context {
                    now: Utc::now(),
                    creating: false,
                };
                self.coerce_scalar(kind, raw, &ctx)
            }
            FieldKind::Record { .. } => Err(Reason::InvalidType { expected: "record" }),
        }
    }
}

fn rejected(raw: &Json, reason: Reason) -> (Value, Vec<FieldError>) {
    (Value::Raw(raw.clone()), vec![FieldError::new(reason)])
}

/// String form of a JSON scalar; containers and null have none.
fn scalar_string(raw: &Json) -> Option<String> {
    match raw {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_int(raw: &Json) -> Result<i64, Reason> {
    let invalid = Reason::InvalidType { expected: "int" };
    match raw {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if n.is_u64() {
                Err(Reason::OutOfRange)
            } else {
                integral(n.as_f64().unwrap_or(f64::NAN)).ok_or(invalid)
            }
        }
        Json::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => Ok(i),
                Err(_) => s
                    .parse::<f64>()
                    .ok()
                    .and_then(integral)
                    .ok_or(invalid),
            }
        }
        _ => Err(invalid),
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_float(raw: &Json) -> Option<f64> {
    let f = match raw {
        Json::Number(n) => n.as_f64()?,
        Json::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// Storage is RFC 3339, which only carries four-digit years.
fn parse_datetime(raw: &Json, now: DateTime<Utc>) -> Result<DateTime<Utc>, Reason> {
    let dt = parse_instant(raw, now)?;
    if (0..=9999).contains(&dt.year()) {
        Ok(dt)
    } else {
        Err(Reason::InvalidDate)
    }
}

fn parse_instant(raw: &Json, now: DateTime<Utc>) -> Result<DateTime<Utc>, Reason> {
    match raw {
        Json::Number(n) => n.as_i64().map_or(Err(Reason::InvalidDate), from_timestamp),
        Json::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("now") {
                return Ok(now);
            }
            if let Ok(secs) = s.parse::<i64>() {
                return from_timestamp(secs);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Ok(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or(Reason::InvalidDate)
        }
        _ => Err(Reason::InvalidDate),
    }
}

fn from_timestamp(secs: i64) -> Result<DateTime<Utc>, Reason> {
    if !(MIN_TIMESTAMP..=MAX_TIMESTAMP).contains(&secs) {
        return Err(Reason::InvalidDate);
    }
    DateTime::from_timestamp(secs, 0).ok_or(Reason::InvalidDate)
}

/// Accepts `id`, `kind/id`, or an object with `reference_key` / `key`.
fn parse_reference(raw: &Json, target: &str) -> Result<Key, Reason> {
    let text = match raw {
        Json::String(s) => s.as_str(),
        Json::Object(obj) => obj
            .get("reference_key")
            .or_else(|| obj.get("key"))
            .and_then(Json::as_str)
            .ok_or(Reason::InvalidType { expected: "relation" })?,
        _ => return Err(Reason::InvalidType { expected: "relation" }),
    };
    let text = text.trim();
    if text.is_empty() {
        return Err(Reason::InvalidType { expected: "relation" });
    }

    match Key::parse(text) {
        Some(key) if key.kind() == target => Ok(key),
        Some(_) => Err(Reason::WrongTargetKind {
            expected: target.to_string(),
        }),
        None if !text.contains('/') => Ok(Key::new(target, text)),
        None => Err(Reason::InvalidType { expected: "relation" }),
    }
}
