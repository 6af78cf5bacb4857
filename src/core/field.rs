//! Field value types read from content items

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    List(Vec<String>),
    Null,
}

impl FieldValue {
    /// Convert a JSON value into a field value
    ///
    /// Objects are not addressable by the query pipeline and read as `Null`.
    /// Array elements that are not strings keep their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null | Value::Object(_) => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
            },
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Array(values) => FieldValue::List(
                values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
        }
    }

    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Numeric view used by range filters and numeric sorts
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    /// Timestamp view used by newest/oldest and trending sorts
    ///
    /// Strings are accepted in RFC 3339, `YYYY-MM-DD HH:MM:SS` (SQLite) or
    /// bare `YYYY-MM-DD` form.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            FieldValue::String(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// Canonical string form used for exact-match filters
    pub fn to_filter_string(&self) -> Option<String> {
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Boolean(b) => Some(b.to_string()),
            FieldValue::Uuid(u) => Some(u.to_string()),
            FieldValue::DateTime(dt) => Some(dt.to_rfc3339()),
            FieldValue::List(_) | FieldValue::Null => None,
        }
    }

    /// Case-insensitive substring match; `needle` must already be lower-case
    pub fn contains_text(&self, needle: &str) -> bool {
        match self {
            FieldValue::String(s) => s.to_lowercase().contains(needle),
            FieldValue::List(values) => values.iter().any(|v| v.to_lowercase().contains(needle)),
            _ => false,
        }
    }

    /// Exact string equality, or membership for list fields
    pub fn matches_exact(&self, expected: &str) -> bool {
        match self {
            FieldValue::List(values) => values.iter().any(|v| v == expected),
            other => other.to_filter_string().is_some_and(|s| s == expected),
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Parse the timestamp shapes found in content payloads
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Stable identifier of a content item
///
/// Backends use integer row ids, UUIDs and opaque strings
/// interchangeably, so all three are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Integer(i64),
    Uuid(Uuid),
    String(String),
}

impl ItemId {
    /// Parse an identifier from a URL path segment
    pub fn parse(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return ItemId::Integer(i);
        }
        if let Ok(u) = Uuid::parse_str(raw) {
            return ItemId::Uuid(u);
        }
        ItemId::String(raw.to_string())
    }

    /// Read an identifier out of a field value
    pub fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(i) => Some(ItemId::Integer(*i)),
            FieldValue::Uuid(u) => Some(ItemId::Uuid(*u)),
            FieldValue::String(s) => Some(ItemId::parse(s)),
            _ => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Integer(i) => write!(f, "{}", i),
            ItemId::Uuid(u) => write!(f, "{}", u),
            ItemId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        ItemId::Integer(value)
    }
}

impl From<Uuid> for ItemId {
    fn from(value: Uuid) -> Self {
        ItemId::Uuid(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId::parse(value)
    }
}
