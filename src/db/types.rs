//! Row and value types shared by every backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of data from a result set, in column order.
pub type Row = Vec<Value>;

/// A batch of rows pulled from a cursor in one round trip.
///
/// A page shorter than the number of rows requested means the cursor is
/// exhausted.
pub type ResultPage = Vec<Row>;

/// What a statement produced when it was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The statement opened a result set with these column headers.
    ResultSet {
        /// Column names in result order.
        headers: Vec<String>,
    },

    /// The statement ran (DDL/DML) but produced no rows to display.
    NoResultSet {
        /// Rows changed by the statement, as reported by the backend.
        rows_affected: u64,
    },
}

impl ExecuteOutcome {
    /// Returns the headers if the statement produced a result set.
    pub fn headers(&self) -> Option<&[String]> {
        match self {
            Self::ResultSet { headers } => Some(headers.as_slice()),
            Self::NoResultSet { .. } => None,
        }
    }

    /// Returns true if the statement produced no result set.
    pub fn is_no_result_set(&self) -> bool {
        matches!(self, Self::NoResultSet { .. })
    }
}

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Attempts to convert the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Converts the value to plain JSON, without the enum tagging.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::Array(
                b.iter().map(|byte| serde_json::Value::from(*byte)).collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

// Conversion implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
