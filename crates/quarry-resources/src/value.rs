//! Canonical field values of loaded package metadata

use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parsed package metadata: field name to value
pub type PackageData = BTreeMap<String, FieldValue>;

/// A metadata field value, independent of the file format it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    /// Only produced by the loader when coercing version fields
    #[serde(skip_deserializing)]
    Version(Version),
}

impl FieldValue {
    /// Short type name used in validation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
            FieldValue::Version(_) => "version",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_version(&self) -> Option<&Version> {
        match self {
            FieldValue::Version(v) => Some(v),
            _ => None,
        }
    }

    /// Scalar text form, used when comparing a field against a path variable
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            // Debug keeps the fractional part (`1.0`, not `1`)
            FieldValue::Float(f) => Some(format!("{:?}", f)),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Version(v) => Some(v.to_string()),
            FieldValue::Null | FieldValue::List(_) | FieldValue::Map(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scalar_text() {
            Some(text) => f.write_str(&text),
            None => match self {
                FieldValue::Null => f.write_str("null"),
                other => write!(f, "<{}>", other.type_name()),
            },
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<Version> for FieldValue {
    fn from(v: Version) -> Self {
        FieldValue::Version(v)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}
