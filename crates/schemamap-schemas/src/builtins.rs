//! Built-in primitive types
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};

/// Primitive value kinds that user-declared types ultimately reduce to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
    Uri,
    Curie,
}

/// Names of the built-in types and the primitive each maps to
pub const BUILTIN_TYPES: &[(&str, Primitive)] = &[
    ("string", Primitive::String),
    ("str", Primitive::String),
    ("ncname", Primitive::String),
    ("objectidentifier", Primitive::String),
    ("nodeidentifier", Primitive::String),
    ("integer", Primitive::Integer),
    ("int", Primitive::Integer),
    ("float", Primitive::Float),
    ("double", Primitive::Float),
    ("decimal", Primitive::Float),
    ("boolean", Primitive::Boolean),
    ("bool", Primitive::Boolean),
    ("date", Primitive::Date),
    ("datetime", Primitive::DateTime),
    ("time", Primitive::Time),
    ("uri", Primitive::Uri),
    ("uriorcurie", Primitive::Uri),
    ("curie", Primitive::Curie),
];

/// Look up a built-in type by name
pub fn builtin(name: &str) -> Option<Primitive> {
    BUILTIN_TYPES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, primitive)| *primitive)
}

/// Whether `name` is one of the built-in type names
pub fn is_builtin(name: &str) -> bool {
    builtin(name).is_some()
}

impl Primitive {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Primitive::Integer | Primitive::Float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin("integer"), Some(Primitive::Integer));
        assert_eq!(builtin("uriorcurie"), Some(Primitive::Uri));
        assert_eq!(builtin("Person"), None);
        assert!(Primitive::Float.is_numeric());
        assert!(!Primitive::Date.is_numeric());
    }
}
