//! Lossless coercion of raw JSON into typed values
//!
//! Lax mode converts only when nothing is lost:
//! - int: integers, floats with no fractional part, base-10 integer strings
//! - float: numbers, strings holding a finite float
//! - bool: booleans, 0/1, "true"/"false"/"1"/"0"
//! - string: strings only
//!
//! Strict mode accepts only values whose JSON type already matches
//! (ints are still accepted as floats). Dates and datetimes are always
//! parsed from strings since JSON has no temporal type.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::types::FieldType;
use super::value::TypedValue;
use crate::config::CoercionMode;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerces a raw value to a scalar declared type.
///
/// Returns `None` for records and lists; the validator walks those.
pub fn coerce_scalar(field_type: &FieldType, raw: &Value, mode: CoercionMode) -> Option<TypedValue> {
    match field_type {
        FieldType::Int => coerce_int(raw, mode).map(TypedValue::Int),
        FieldType::Float => coerce_float(raw, mode).map(TypedValue::Float),
        FieldType::Bool => coerce_bool(raw, mode).map(TypedValue::Bool),
        FieldType::String => raw.as_str().map(|s| TypedValue::String(s.to_string())),
        FieldType::Date => raw.as_str().and_then(parse_date).map(TypedValue::Date),
        FieldType::DateTime => raw.as_str().and_then(parse_datetime),
        FieldType::Enum { values } => raw
            .as_str()
            .filter(|s| values.iter().any(|allowed| allowed == s))
            .map(|s| TypedValue::String(s.to_string())),
        FieldType::Record { .. } | FieldType::List { .. } => None,
    }
}

fn coerce_int(raw: &Value, mode: CoercionMode) -> Option<i64> {
    match (raw, mode) {
        (Value::Number(n), CoercionMode::Strict) => n.as_i64(),
        (Value::Number(n), CoercionMode::Lax) => n.as_i64().or_else(|| {
            // u64 beyond i64 range also lands here and is rejected below
            let f = n.as_f64()?;
            let integral = f.is_finite() && f.fract() == 0.0;
            let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
            (integral && in_range).then_some(f as i64)
        }),
        (Value::String(s), CoercionMode::Lax) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_float(raw: &Value, mode: CoercionMode) -> Option<f64> {
    match (raw, mode) {
        (Value::Number(n), _) => n.as_f64(),
        (Value::String(s), CoercionMode::Lax) => {
            s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

fn coerce_bool(raw: &Value, mode: CoercionMode) -> Option<bool> {
    match (raw, mode) {
        (Value::Bool(b), _) => Some(*b),
        (Value::Number(n), CoercionMode::Lax) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        (Value::String(s), CoercionMode::Lax) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses an ISO 8601 calendar date (`YYYY-MM-DD`).
///
/// All four year digits and both month and day digits are required;
/// chrono alone would accept `1976-4-5` or `76-04-25`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 || !has_date_shape(s.as_bytes()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parses an extended ISO 8601 datetime.
///
/// Accepts fractional seconds of any precision, a `T` or space separator,
/// and an optional `Z` / `±HH:MM` offset. Offset-carrying inputs keep
/// their offset.
pub fn parse_datetime(s: &str) -> Option<TypedValue> {
    if !has_datetime_shape(s.as_bytes()) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(TypedValue::DateTimeTz(dt));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(TypedValue::DateTime)
}

/// `YYYY-MM-DD` at the start of `b`
fn has_date_shape(b: &[u8]) -> bool {
    b.len() >= 10
        && b[4] == b'-'
        && b[7] == b'-'
        && [0, 1, 2, 3, 5, 6, 8, 9].iter().all(|&i| b[i].is_ascii_digit())
}

/// `YYYY-MM-DDTHH:MM:SS` (or space separated) at the start of `b`
fn has_datetime_shape(b: &[u8]) -> bool {
    b.len() >= 19
        && has_date_shape(b)
        && matches!(b[10], b'T' | b't' | b' ')
        && b[13] == b':'
        && b[16] == b':'
        && [11, 12, 14, 15, 17, 18].iter().all(|&i| b[i].is_ascii_digit())
}
