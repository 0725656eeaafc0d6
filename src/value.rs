//! Scalar and tabular values shared by statistics, custom metadata and queries.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// UTF-8 string
    Str(String),
}

impl Scalar {
    /// Whether this is [`Scalar::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Scalar::Int(v) => Some(v as f64),
            Scalar::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Integers and floats compare numerically; strings lexically; booleans
    /// with `false < true`. Any other pairing (including nulls and NaN)
    /// yields `None`.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Replace a NaN or infinite float with [`Scalar::Null`], which is what
    /// JSON stores for it
    pub fn normalized(self) -> Self {
        match self {
            Scalar::Float(v) if !v.is_finite() => Scalar::Null,
            other => other,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "NULL"),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Str(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v).normalized()
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// A small result table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Column headers
    pub columns: Vec<String>,
    /// Row-major cells; every row has `columns.len()` entries
    pub rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// The single cell of a 1x1 table
    pub fn single_cell(&self) -> Option<&Scalar> {
        match (self.columns.len(), self.rows.as_slice()) {
            (1, [row]) => row.first(),
            _ => None,
        }
    }
}

/// Computed value of a custom metadata item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CustomValue {
    /// A single value
    Scalar(Scalar),
    /// A small table
    Table(Table),
}

impl CustomValue {
    /// Scalar view: the scalar itself, or the cell of a 1x1 table
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            CustomValue::Scalar(s) => Some(s),
            CustomValue::Table(t) => t.single_cell(),
        }
    }

    /// Normalize every scalar, including table cells
    pub fn normalized(self) -> Self {
        match self {
            CustomValue::Scalar(s) => CustomValue::Scalar(s.normalized()),
            CustomValue::Table(t) => CustomValue::Table(Table {
                columns: t.columns,
                rows: t
                    .rows
                    .into_iter()
                    .map(|row| row.into_iter().map(Scalar::normalized).collect())
                    .collect(),
            }),
        }
    }
}

impl From<Scalar> for CustomValue {
    fn from(v: Scalar) -> Self {
        CustomValue::Scalar(v)
    }
}

impl From<Table> for CustomValue {
    fn from(v: Table) -> Self {
        CustomValue::Table(v)
    }
}

impl From<i64> for CustomValue {
    fn from(v: i64) -> Self {
        CustomValue::Scalar(Scalar::Int(v))
    }
}

impl From<f64> for CustomValue {
    fn from(v: f64) -> Self {
        CustomValue::Scalar(Scalar::from(v))
    }
}

impl From<&str> for CustomValue {
    fn from(v: &str) -> Self {
        CustomValue::Scalar(Scalar::Str(v.to_string()))
    }
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomValue::Scalar(s) => write!(f, "{}", s),
            CustomValue::Table(t) => write!(
                f,
                "table [{}] ({} rows)",
                t.columns.join(", "),
                t.rows.len()
            ),
        }
    }
}
