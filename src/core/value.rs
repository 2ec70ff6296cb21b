//! Database value types
//!
//! This module defines the scalar values exchanged with the database, the
//! unordered result row and the ordered field map used for writes and conditions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One column value as it travels to and from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl DatabaseValue {
    /// Integer view of the value
    ///
    /// Text is parsed, floats are accepted only without a fraction.
    pub fn as_long(&self) -> Option<i64> {
        match *self {
            DatabaseValue::Long(v) => Some(v),
            DatabaseValue::Int(v) => Some(i64::from(v)),
            DatabaseValue::Bool(v) => Some(i64::from(v)),
            DatabaseValue::Float(v) => whole(f64::from(v)),
            DatabaseValue::Double(v) => whole(v),
            DatabaseValue::String(ref s) => s.trim().parse().ok(),
            DatabaseValue::Null | DatabaseValue::Bytes(_) => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match *self {
            DatabaseValue::Double(v) => Some(v),
            DatabaseValue::Float(v) => Some(f64::from(v)),
            DatabaseValue::Int(v) => Some(f64::from(v)),
            DatabaseValue::Long(v) => Some(v as f64),
            DatabaseValue::String(ref s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrowed text, only for `String` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Kind name used in type mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Float(_) => "float",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
        }
    }
}

fn whole(v: f64) -> Option<i64> {
    (v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64).then_some(v as i64)
}

/// Text form used for keys and log output; `Null` prints as `null`
impl fmt::Display for DatabaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseValue::Null => f.write_str("null"),
            DatabaseValue::Bool(v) => write!(f, "{}", v),
            DatabaseValue::Int(v) => write!(f, "{}", v),
            DatabaseValue::Long(v) => write!(f, "{}", v),
            DatabaseValue::Float(v) => write!(f, "{}", v),
            DatabaseValue::Double(v) => write!(f, "{}", v),
            DatabaseValue::String(s) => f.write_str(s),
            DatabaseValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

macro_rules! value_from {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for DatabaseValue {
                fn from(v: $source) -> Self {
                    DatabaseValue::$variant(v.into())
                }
            }
        )+
    };
}

value_from! {
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    &String => String,
    Vec<u8> => Bytes,
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DatabaseValue::Null, Into::into)
    }
}

/// One result row keyed by column name; column order is not kept
pub type DatabaseRow = HashMap<String, DatabaseValue>;

pub type DatabaseResult = Vec<DatabaseRow>;

/// Ordered column name -> value mapping
///
/// Used for persistable field maps and for equality condition sets. Order
/// drives the column order of generated SQL.
pub type FieldMap = IndexMap<String, DatabaseValue>;

/// Build a [`FieldMap`] from `"column" => value` pairs
///
/// ```
/// use rust_data_mapper::{fields, DatabaseValue};
///
/// let conditions = fields! { "email" => "ada@example.com", "id" => 7i64 };
/// assert_eq!(conditions.get("id"), Some(&DatabaseValue::Long(7)));
///
/// let empty = fields! {};
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::FieldMap::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::FieldMap::new();
        $(
            map.insert(
                ::std::string::String::from($column),
                $crate::DatabaseValue::from($value),
            );
        )+
        map
    }};
}
