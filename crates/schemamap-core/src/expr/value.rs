//! Runtime values seen by the expression evaluator
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// A lazily dereferenced object
///
/// `Resolved` wraps an object whose attributes are read through an
/// [`Environment`](super::eval::Environment), so references to other indexed
/// objects can be followed. `Stub` stands in for a reference whose target is
/// not in the index and only knows its identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Proxy {
    Resolved { class_name: String, object: Arc<Value> },
    Stub { class_name: String, id: Value },
}

impl Proxy {
    pub fn class_name(&self) -> &str {
        match self {
            Proxy::Resolved { class_name, .. } | Proxy::Stub { class_name, .. } => class_name,
        }
    }

    /// The raw JSON this proxy stands for
    pub fn to_json(&self) -> Value {
        match self {
            Proxy::Resolved { object, .. } => (**object).clone(),
            Proxy::Stub { id, .. } => id.clone(),
        }
    }
}

/// Dynamically typed evaluator value
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Datum>),
    Map(IndexMap<String, Datum>),
    Object(Proxy),
}

impl Datum {
    pub fn from_json(value: &Value) -> Datum {
        match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Datum::Int(i),
                None => Datum::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Datum::Str(s.clone()),
            Value::Array(items) => Datum::List(items.iter().map(Datum::from_json).collect()),
            Value::Object(map) => Datum::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Datum::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Datum::Null => Value::Null,
            Datum::Bool(b) => Value::Bool(*b),
            Datum::Int(i) => Value::Number((*i).into()),
            Datum::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Datum::Str(s) => Value::String(s.clone()),
            Datum::List(items) => Value::Array(items.iter().map(Datum::to_json).collect()),
            Datum::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Datum::Object(proxy) => proxy.to_json(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Datum::Null => false,
            Datum::Bool(b) => *b,
            Datum::Int(i) => *i != 0,
            Datum::Float(f) => *f != 0.0,
            Datum::Str(s) => !s.is_empty(),
            Datum::List(items) => !items.is_empty(),
            Datum::Map(map) => !map.is_empty(),
            Datum::Object(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "NoneType",
            Datum::Bool(_) => "bool",
            Datum::Int(_) => "int",
            Datum::Float(_) => "float",
            Datum::Str(_) => "str",
            Datum::List(_) => "list",
            Datum::Map(_) => "dict",
            Datum::Object(_) => "object",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Int(i) => Some(*i as f64),
            Datum::Float(f) => Some(*f),
            Datum::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// String form used by `str()` and string concatenation
    pub fn to_display_string(&self) -> String {
        match self {
            Datum::Str(s) => s.clone(),
            Datum::Object(Proxy::Stub {
                id: Value::String(id),
                ..
            }) => id.clone(),
            other => other.to_string(),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "None"),
            Datum::Bool(true) => write!(f, "True"),
            Datum::Bool(false) => write!(f, "False"),
            Datum::Int(i) => write!(f, "{}", i),
            Datum::Float(x) => write!(f, "{}", format_float(*x)),
            Datum::Str(s) => write!(f, "'{}'", s),
            Datum::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Datum::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': {}", k, v)?;
                }
                write!(f, "}}")
            }
            Datum::Object(proxy) => write!(f, "{}", proxy.to_json()),
        }
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Str(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::Str(s)
    }
}

impl From<i64> for Datum {
    fn from(i: i64) -> Self {
        Datum::Int(i)
    }
}

impl From<f64> for Datum {
    fn from(f: f64) -> Self {
        Datum::Float(f)
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Bool(b)
    }
}
