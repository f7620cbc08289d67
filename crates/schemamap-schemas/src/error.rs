//! Error types for schema model and schema view operations

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while canonicalizing or querying a schema
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema document does not have the expected shape
    #[error("Malformed schema: {message}")]
    Malformed { message: String },

    /// A referenced element does not exist
    #[error("Unknown {kind} '{name}'")]
    UnknownElement { kind: String, name: String },

    /// Inheritance among classes is cyclic
    #[error("Cyclic is_a/mixins chain involving class '{class_name}'")]
    CyclicInheritance { class_name: String },

    /// Conversion between JSON values and schema structures failed
    #[error("Schema conversion failed: {source}")]
    Conversion {
        #[from]
        source: serde_json::Error,
    },
}

impl SchemaError {
    /// Create a malformed-schema error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create an unknown-element error
    pub fn unknown(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownElement {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
