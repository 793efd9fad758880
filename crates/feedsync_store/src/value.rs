//! Conversions between JSON values and SQLite values.

use crate::error::StoreResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// Converts a scalar JSON value into a bindable SQLite value.
///
/// Returns `None` for `null`, arrays and objects. Booleans bind as 0/1.
pub fn json_to_sql(value: &Value) -> Option<SqlValue> {
    match value {
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Converts a SQLite column value into JSON.
///
/// Non-finite reals become `null`; blobs become standard base64 strings.
///
/// # Errors
///
/// Returns [`StoreError::InvalidText`](crate::StoreError::InvalidText) for
/// TEXT that is not valid UTF-8. Such text is never rewritten.
pub fn sql_to_json(value: ValueRef<'_>) -> StoreResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(std::str::from_utf8(bytes)?.to_owned()),
        ValueRef::Blob(bytes) => Value::String(STANDARD.encode(bytes)),
    })
}
