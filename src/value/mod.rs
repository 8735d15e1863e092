//! Cell values and their SQL literal form.
//!
//! Values arrive from the grid as JSON. A JSON object of the exact shape
//! `{"$date": "<timestamp>"}` is read as a timestamp; every other object is
//! kept as-is so that rendering can reject it with a typed error instead of
//! emitting a malformed literal.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{JournalError, JournalResult};

/// Key used to tag timestamps in the JSON representation.
pub const DATE_TAG: &str = "$date";

/// A pending cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<CellValue>),
    Timestamp(DateTime<Utc>),
    /// A structured value with no SQL literal form.
    Object(Map<String, Value>),
}

impl CellValue {
    /// Runtime type name, as reported in unsupported-type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "string",
            CellValue::List(_) => "array",
            CellValue::Timestamp(_) => "date",
            CellValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Row-key identity. Numbers compare by value, so `1` and `1.0` address
    /// the same row; everything else compares structurally.
    pub fn same_key(&self, other: &CellValue) -> bool {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => numbers_equal(a, b),
            (CellValue::List(a), CellValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_key(y))
            }
            _ => self == other,
        }
    }

    /// Build a timestamp value from an RFC 3339 or SQLite-formatted string.
    pub fn timestamp_from_str(s: &str) -> JournalResult<CellValue> {
        parse_datetime(s)
            .map(CellValue::Timestamp)
            .ok_or_else(|| JournalError::InvalidTimestamp(s.to_string()))
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => CellValue::Number(n),
            Value::String(s) => CellValue::Text(s),
            Value::Array(items) => CellValue::List(items.into_iter().map(CellValue::from).collect()),
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(dt) = map.get(DATE_TAG).and_then(|v| v.as_str()).and_then(parse_datetime) {
                        return CellValue::Timestamp(dt);
                    }
                }
                CellValue::Object(map)
            }
        }
    }
}

impl From<CellValue> for Value {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Number(n) => Value::Number(n),
            CellValue::Text(s) => Value::String(s),
            CellValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            CellValue::Timestamp(dt) => {
                let mut map = Map::new();
                map.insert(DATE_TAG.to_string(), Value::String(format_timestamp(&dt)));
                Value::Object(map)
            }
            CellValue::Object(map) => Value::Object(map),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n.into())
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n.into())
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Number(n.into())
    }
}

/// Non-finite floats have no SQL literal and become `Null`.
impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(CellValue::Null, CellValue::Number)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(dt: DateTime<Utc>) -> Self {
        CellValue::Timestamp(dt)
    }
}

impl<T: Into<CellValue>> From<Vec<T>> for CellValue {
    fn from(items: Vec<T>) -> Self {
        CellValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// Render a value as a SQL literal.
///
/// Strings are single-quoted with every embedded quote doubled; lists render
/// as a parenthesized, comma-separated tuple; timestamps render as quoted
/// ISO-8601 strings. Objects fail with [`JournalError::UnsupportedValueType`].
///
/// An empty list renders as `()`, which most databases reject outside of
/// an `IN` list; callers staging list values must not stage empty ones.
pub fn serialize_value(value: &CellValue) -> JournalResult<String> {
    match value {
        CellValue::Null => Ok("NULL".to_string()),
        CellValue::Bool(true) => Ok("TRUE".to_string()),
        CellValue::Bool(false) => Ok("FALSE".to_string()),
        CellValue::Number(n) => Ok(n.to_string()),
        CellValue::Text(s) => Ok(quote_literal(s)),
        CellValue::List(items) => {
            let rendered = items
                .iter()
                .map(serialize_value)
                .collect::<JournalResult<Vec<_>>>()?;
            Ok(format!("({})", rendered.join(", ")))
        }
        CellValue::Timestamp(dt) => Ok(quote_literal(&format_timestamp(dt))),
        CellValue::Object(_) => Err(JournalError::UnsupportedValueType {
            type_name: value.type_name().to_string(),
        }),
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a datetime string in various formats.
/// Handles both RFC3339 format (2025-12-11T06:50:10.674Z) and
/// SQLite format (2025-12-11 06:50:10.674).
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
