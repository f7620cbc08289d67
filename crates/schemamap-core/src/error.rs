//! Error types for the Schemamap core library
//!
//! This module defines the error handling system for the transformation
//! engine, using thiserror for ergonomic error definitions and anyhow for
//! flexible error contexts at the boundary.

use schemamap_schemas::{LoaderError, SchemaError};
use thiserror::Error;

/// Main error type for Schemamap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or inconsistent transformation specification
    #[error("Specification error: {message}")]
    Specification { message: String },

    /// An expression is syntactically invalid or uses an unsupported construct
    #[error("Expression error in '{expression}': {message}")]
    Expression { expression: String, message: String },

    /// A braced variable resolved to null
    #[error("Unset value: '{name}' is null")]
    UnsetValue { name: String },

    /// More than one candidate of `sources` is populated
    #[error("Ambiguous sources for {class_name}.{slot_name}: {candidates:?} are all populated")]
    Ambiguity {
        class_name: String,
        slot_name: String,
        candidates: Vec<String>,
    },

    /// Unit parsing or conversion failure
    #[error(transparent)]
    Unit(#[from] UnitError),

    /// The specification cannot be inverted
    #[error("Non-invertible specification: {message}")]
    NonInvertible { message: String },

    /// Schema model or schema view errors
    #[error("Schema error: {source}")]
    Schema {
        #[from]
        source: SchemaError,
    },

    /// Errors reading schema or specification documents
    #[error("Loader error: {source}")]
    Loader {
        #[from]
        source: LoaderError,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing and serialization errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Unit errors, kept separate so callers can match on the unit failure kind
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    /// The unit expression could not be parsed or names an unknown unit
    #[error("Undefined unit '{unit}' ({system})")]
    UndefinedUnit { unit: String, system: String },

    /// The two units measure different dimensions
    #[error("Cannot convert from '{from}' ({from_dimension}) to '{to}' ({to_dimension})")]
    Dimensionality {
        from: String,
        to: String,
        from_dimension: String,
        to_dimension: String,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a specification error
    pub fn specification(message: impl Into<String>) -> Self {
        Error::Specification {
            message: message.into(),
        }
    }

    /// Create an expression error
    pub fn expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Expression {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create a non-invertible error
    pub fn non_invertible(message: impl Into<String>) -> Self {
        Error::NonInvertible {
            message: message.into(),
        }
    }

    /// Whether this error may be recovered by the permissive evaluator
    pub fn is_expression_error(&self) -> bool {
        matches!(self, Error::Expression { .. })
    }
}

impl UnitError {
    pub fn undefined(unit: impl Into<String>, system: impl std::fmt::Display) -> Self {
        UnitError::UndefinedUnit {
            unit: unit.into(),
            system: system.to_string(),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
