//! Typed argument values.
//!
//! Every script argument starts life as a string.  The binder turns it into
//! a [`Value`] of the [`ValueType`] a parameter declares, or infers one when
//! the parameter is declared [`ValueType::Auto`].

use std::fmt;
use std::time::Duration;

use crate::keys::Key;

/// The type a parameter asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// Infer: integer, number, boolean, duration, then string.
    #[default]
    Auto,
    Str,
    Int,
    Number,
    Bool,
    Duration,
    Key,
}

impl ValueType {
    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Auto => "any",
            ValueType::Str => "string",
            ValueType::Int => "integer",
            ValueType::Number => "number",
            ValueType::Bool => "boolean",
            ValueType::Duration => "duration",
            ValueType::Key => "key",
        }
    }
}

/// A bound argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    Duration(Duration),
    Key(Key),
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Number(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Duration(d) => write!(f, "{}s", d.as_secs_f64()),
            Value::Key(k) => write!(f, "{k}"),
        }
    }
}

impl Value {
    /// Type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Str(_) => ValueType::Str,
            Value::Int(_) => ValueType::Int,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Bool,
            Value::Duration(_) => ValueType::Duration,
            Value::Key(_) => ValueType::Key,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<Key> {
        match self {
            Value::Key(k) => Some(*k),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        Value::Key(k)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
