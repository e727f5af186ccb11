//! Type coercion for non-absent input.
//!
//! Absent input and defaults are handled by `Field::resolve`, which
//! delegates here once a value is present.

use chrono::{DateTime, Utc};

use crate::common::{Error, Result};
use crate::types::{FieldType, Value};

/// Coerce `input` into the canonical representation of `ty`.
///
/// | Type     | Accepts                                                   |
/// |----------|-----------------------------------------------------------|
/// | `Int`    | ints; finite floats truncated toward zero                 |
/// | `Float`  | floats; ints widened                                      |
/// | `String` | strings                                                   |
/// | `Bool`   | bools; boolean strings (`"true"`, `"F"`, `"1"`, ...)      |
/// | `Date`   | dates; RFC 3339 strings; int or float epoch milliseconds  |
/// | `Bytes`  | bytes; strings (UTF-8); vectors of ints in `0..=255`      |
/// | `Vector` | vectors whose items validate against the item type        |
///
/// # Errors
///
/// Returns `Error::InvalidFieldType` naming `field` when the value cannot be
/// coerced, including `Value::Null`.
///
/// # Example
/// ```
/// use tabledb::types::{validate_type, FieldType};
/// use tabledb::Value;
///
/// let v = validate_type("age", &FieldType::Int, &Value::Float(41.9)).unwrap();
/// assert_eq!(v, Value::Int(41));
/// ```
pub fn validate_type(field: &str, ty: &FieldType, input: &Value) -> Result<Value> {
    let invalid = || Error::invalid_type(field, describe(input));

    match (ty, input) {
        (FieldType::Int, Value::Int(v)) => Ok(Value::Int(*v)),
        (FieldType::Int, Value::Float(v)) if v.is_finite() => Ok(Value::Int(v.trunc() as i64)),

        (FieldType::Float, Value::Float(v)) => Ok(Value::Float(*v)),
        (FieldType::Float, Value::Int(v)) => Ok(Value::Float(*v as f64)),

        (FieldType::String, Value::Str(v)) => Ok(Value::Str(v.clone())),

        (FieldType::Bool, Value::Bool(v)) => Ok(Value::Bool(*v)),
        (FieldType::Bool, Value::Str(s)) => parse_bool(s).map(Value::Bool).ok_or_else(invalid),

        (FieldType::Date, Value::Date(v)) => Ok(Value::Date(*v)),
        (FieldType::Date, Value::Str(s)) => DateTime::parse_from_rfc3339(s)
            .map(|d| Value::Date(d.with_timezone(&Utc)))
            .map_err(|_| invalid()),
        (FieldType::Date, Value::Int(ms)) => from_millis(*ms).ok_or_else(invalid),
        (FieldType::Date, Value::Float(ms)) if ms.is_finite() => {
            from_millis(ms.trunc() as i64).ok_or_else(invalid)
        }

        (FieldType::Bytes, Value::Bytes(v)) => Ok(Value::Bytes(v.clone())),
        (FieldType::Bytes, Value::Str(s)) => Ok(Value::Bytes(s.as_bytes().to_vec())),
        (FieldType::Bytes, Value::Vector(items)) => items
            .iter()
            .map(|item| match item {
                Value::Int(b) => u8::try_from(*b).ok(),
                _ => None,
            })
            .collect::<Option<Vec<u8>>>()
            .map(Value::Bytes)
            .ok_or_else(invalid),

        (FieldType::Vector { .. }, Value::Vector(items)) => {
            let item_type = ty
                .item_type()
                .ok_or_else(|| Error::UnsupportedFieldType {
                    field: field.to_string(),
                    field_type: ty.to_string(),
                })?;
            items
                .iter()
                .map(|item| validate_type(field, &item_type, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Vector)
        }

        _ => Err(invalid()),
    }
}

/// The boolean spellings accepted for `Bool` fields.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn from_millis(ms: i64) -> Option<Value> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(Value::Date)
}

fn describe(input: &Value) -> String {
    match input {
        Value::Null => "null".to_string(),
        Value::Str(s) => format!("{} (string)", s),
        Value::Vector(_) | Value::Bytes(_) => input.kind().to_string(),
        other => format!("{} ({})", other, other.kind()),
    }
}
