//! Values carried by log entries and key-value lists

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Longest rendered value kept in key-value output, in bytes
pub const MAX_VALUE_LEN: usize = 1024;

/// Value type for log entries and structured fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// Arbitrary structured data, rendered as compact JSON
    Json(serde_json::Value),
}

impl FieldValue {
    /// Capture any serializable value as structured JSON
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => FieldValue::Json(v),
            Err(e) => FieldValue::String(format!("!json({})", e)),
        }
    }

    /// Capture an error together with its source chain
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut msg = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = cause.source();
        }
        FieldValue::String(msg)
    }

    /// The value as a key, if it is a string
    pub fn as_key(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Null values and empty strings are skipped unless empty printing is on
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render as JSON-escaped text: strings are trimmed and quoted,
    /// numbers and booleans are bare, structured data is compact JSON.
    pub fn escaped(&self) -> String {
        match self {
            FieldValue::Null => "null".to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::UInt(u) => u.to_string(),
            FieldValue::Float(f) => serde_json::to_string(f).unwrap_or_else(|_| "null".into()),
            FieldValue::String(s) => {
                serde_json::to_string(s.trim()).unwrap_or_else(|_| format!("\"{}\"", s))
            }
            FieldValue::Json(v) => v.to_string(),
        }
    }

    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::UInt(u) => serde_json::Value::Number((*u).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Json(v) => write!(f, "{}", v),
        }
    }
}

/// Cut `value` to at most `max` bytes on a char boundary, marking the cut.
pub(crate) fn truncate(mut value: String, max: usize, marker: &str) -> String {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
    value.push_str(marker);
    value
}

/// Check that `entries` is an alternating key/value list.
///
/// # Panics
///
/// Panics if the list has an odd length or a key is not a string: both are
/// bugs in the calling code.
#[track_caller]
pub fn validate_key_values(entries: &[FieldValue]) {
    assert!(
        entries.len() % 2 == 0,
        "odd number of key-value entries: {}",
        entries.len()
    );
    if let Some(key) = entries.iter().step_by(2).find(|k| k.as_key().is_none()) {
        panic!("key is not a string: {}", key.escaped());
    }
}

/// Split an alternating key/value list into pairs.
///
/// # Panics
///
/// As [`validate_key_values`].
#[track_caller]
pub fn key_value_pairs(entries: &[FieldValue]) -> Vec<(&str, &FieldValue)> {
    validate_key_values(entries);
    entries
        .chunks_exact(2)
        .filter_map(|pair| pair[0].as_key().map(|key| (key, &pair[1])))
        .collect()
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::String(s.clone())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(i: $t) -> Self {
                FieldValue::Int(i as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(u: $t) -> Self {
                FieldValue::UInt(u as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for FieldValue {
    fn from(f: f32) -> Self {
        FieldValue::Float(f64::from(f))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<Duration> for FieldValue {
    fn from(d: Duration) -> Self {
        FieldValue::String(format!("{:?}", d))
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::String(t.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::Json(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}
