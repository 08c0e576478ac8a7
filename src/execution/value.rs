//! Row model
//!
//! One canonical representation for query rows: an ordered list of
//! `(column name, scalar)` pairs that serialises as a JSON object.

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl ScalarValue {
    /// Map a JSON value from the store. Integers stay exact, ISO dates become `Date`
    /// and nested values become text.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ScalarValue::Null,
            serde_json::Value::Bool(b) => ScalarValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ScalarValue::Int(i),
                None => n.as_f64().map(ScalarValue::Number).unwrap_or(ScalarValue::Null),
            },
            serde_json::Value::String(s) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                Ok(date) => ScalarValue::Date(date),
                Err(_) => ScalarValue::Text(s),
            },
            other => ScalarValue::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Lenient numeric coercion; anything unparseable is zero.
    pub fn as_f64(&self) -> f64 {
        match self {
            ScalarValue::Int(i) => *i as f64,
            ScalarValue::Number(n) => *n,
            ScalarValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ScalarValue::Text(s) => s.trim().parse().unwrap_or(0.0),
            ScalarValue::Null | ScalarValue::Date(_) => 0.0,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            ScalarValue::Date(d) => chrono::Datelike::year(d),
            ScalarValue::Int(i) => (*i).clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            other => {
                let n = other.as_f64();
                if n.is_finite() {
                    n.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
                } else {
                    0
                }
            }
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            ScalarValue::Bool(b) => *b,
            ScalarValue::Int(i) => *i != 0,
            ScalarValue::Number(n) => *n != 0.0,
            ScalarValue::Text(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s == "1" || s.eq_ignore_ascii_case("yes")
            }
            ScalarValue::Null | ScalarValue::Date(_) => false,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ScalarValue::Date(d) => Some(*d),
            ScalarValue::Text(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .or_else(|| {
                        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                            .ok()
                            .map(|dt| dt.date())
                    })
                    .or_else(|| {
                        chrono::DateTime::parse_from_rfc3339(s)
                            .ok()
                            .map(|dt| dt.date_naive())
                    })
            }
            _ => None,
        }
    }

    /// Display text; null is empty.
    pub fn as_text(&self) -> String {
        match self {
            ScalarValue::Null => String::new(),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Number(n) => n.to_string(),
            ScalarValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            ScalarValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Number(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int(i64::from(value))
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<NaiveDate> for ScalarValue {
    fn from(value: NaiveDate) -> Self {
        ScalarValue::Date(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ScalarValue::Null)
    }
}

/// One result row. Column order and original casing are preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    columns: Vec<(String, ScalarValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<ScalarValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build from a JSON object (e.g. `row_to_json` output). Non-objects yield `None`.
    pub fn from_json_object(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Self {
                columns: map
                    .into_iter()
                    .map(|(k, v)| (k, ScalarValue::from_json(v)))
                    .collect(),
            }),
            _ => None,
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<ScalarValue>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Exact-name lookup.
    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.columns.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    pub fn get_ignore_case(&self, column: &str) -> Option<&ScalarValue> {
        self.columns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (k, v) in &self.columns {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Rows in execution order; never reordered.
pub type RawResultSet = Vec<RawRow>;
