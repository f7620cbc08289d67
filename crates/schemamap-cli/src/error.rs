//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from schemamap-core library
    #[error(transparent)]
    Core(#[from] schemamap_core::Error),

    /// Error reading a schema or data document
    #[error(transparent)]
    Loader(#[from] schemamap_schemas::LoaderError),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(schemamap_core::Error::NonInvertible { .. }) => 6,
            Self::Core(schemamap_core::Error::Expression { .. }) => 7,
            Self::Core(schemamap_core::Error::Unit(_)) => 8,
            Self::Core(_) => 2,
            Self::FileNotFound { .. } => 3,
            Self::Loader(_) => 4,
            Self::Config(_) => 5,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Other { .. } => 99,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Self::Other {
            message: format!("{:#}", error),
        }
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes_by_kind() {
        let err: Error = schemamap_core::Error::non_invertible("expression on Agent.age").into();
        assert_eq!(err.exit_code(), 6);
        let err: Error = schemamap_core::Error::specification("no class derivation").into();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(Error::config("bad").exit_code(), 5);
    }

    #[test]
    fn test_anyhow_context_is_kept() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("disk full")).context("writing output.yaml");
        let err: Error = result.unwrap_err().into();
        assert_eq!(err.to_string(), "writing output.yaml: disk full");
    }

    #[test]
    fn test_format_error_without_color() {
        let err = Error::other("boom");
        assert_eq!(format_error(&err, false), "Error: boom");
    }
}
