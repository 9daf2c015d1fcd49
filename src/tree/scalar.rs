//! Scalar payloads stored in leaf nodes.

use std::fmt;

use toml::value::Datetime;

/// A terminal value of the configuration tree.
///
/// The variants mirror the scalar kinds of the TOML data model, which is the
/// format configuration sources are written in.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Datetime(Datetime),
}

impl Scalar {
    /// The string payload, if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// A short name of the scalar kind, used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Datetime(_) => "datetime",
        }
    }

    /// Convert into a TOML value.
    pub fn to_toml(&self) -> toml::Value {
        match self {
            Self::String(s) => toml::Value::String(s.clone()),
            Self::Integer(i) => toml::Value::Integer(*i),
            Self::Float(f) => toml::Value::Float(*f),
            Self::Boolean(b) => toml::Value::Boolean(*b),
            Self::Datetime(d) => toml::Value::Datetime(*d),
        }
    }

    /// Convert a TOML value, or `None` for tables and arrays.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(Self::String(s.clone())),
            toml::Value::Integer(i) => Some(Self::Integer(*i)),
            toml::Value::Float(f) => Some(Self::Float(*f)),
            toml::Value::Boolean(b) => Some(Self::Boolean(*b)),
            toml::Value::Datetime(d) => Some(Self::Datetime(*d)),
            toml::Value::Array(_) | toml::Value::Table(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Datetime(d) => write!(f, "{d}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}
