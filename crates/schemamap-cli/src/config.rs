//! Configuration management for the CLI
//!
//! This module handles loading and merging configuration from:
//! - Default values
//! - Configuration files (YAML/JSON/TOML)
//! - Command-line arguments

use crate::cli::{OutputFormat, TransformFlags};
use crate::error::{Error, Result};
use schemamap_core::TransformerOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transformer options
    pub transform: TransformerOptions,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default document format
    pub format: OutputFormat,

    /// Use colored output by default
    pub color: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,

    /// Log file path
    pub file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Yaml,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|_| Error::FileNotFound {
            path: path.to_path_buf(),
        })?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?,
            _ => serde_json::from_str(&content)?,
        };

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Every file found is merged, the current directory taking precedence
    /// over the user config directory and the home directory.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        for path in Self::default_config_paths().into_iter().rev() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(found) => config.merge(found),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to load configuration");
                    }
                }
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Current directory
        for extension in ["yaml", "json", "toml"] {
            paths.push(PathBuf::from(format!(".schemamap.{}", extension)));
        }

        // User config directory
        if let Some(config_dir) = dirs::config_dir() {
            let schemamap_dir = config_dir.join("schemamap");
            for extension in ["yaml", "json", "toml"] {
                paths.push(schemamap_dir.join(format!("config.{}", extension)));
            }
        }

        // Home directory
        if let Some(home_dir) = dirs::home_dir() {
            for extension in ["yaml", "json", "toml"] {
                paths.push(home_dir.join(format!(".schemamap.{}", extension)));
            }
        }

        paths
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        self.transform = other.transform;
        self.output = other.output;
        if other.logging.level.is_some() {
            self.logging.level = other.logging.level;
        }
        if other.logging.format.is_some() {
            self.logging.format = other.logging.format;
        }
        if other.logging.file.is_some() {
            self.logging.file = other.logging.file;
        }
    }

    /// Transformer options with command-line flags applied on top
    pub fn transformer_options(&self, flags: &TransformFlags) -> TransformerOptions {
        let mut options = self.transform.clone();
        if flags.unrestricted_eval {
            options.unrestricted_eval = true;
        }
        if flags.strict {
            options.strict = true;
        }
        if flags.no_coerce {
            options.coerce_types = false;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_load_each_format() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("config.yaml");
        fs::write(&yaml, "transform:\n  unrestricted_eval: true\noutput:\n  format: json-pretty\n").unwrap();
        let config = Config::from_file(&yaml).unwrap();
        assert!(config.transform.unrestricted_eval);
        assert!(config.transform.coerce_types);
        assert_eq!(config.output.format, OutputFormat::JsonPretty);

        let toml = dir.path().join("config.toml");
        fs::write(&toml, "[transform]\nstrict = true\n\n[logging]\nformat = \"json\"\n").unwrap();
        let config = Config::from_file(&toml).unwrap();
        assert!(config.transform.strict);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.output, OutputConfig::default());

        let json = dir.path().join("config.json");
        fs::write(&json, r#"{"transform": {"expand_curies": false}}"#).unwrap();
        let config = Config::from_file(&json).unwrap();
        assert!(!config.transform.expand_curies);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Config::load_with_file(Some(Path::new("/nonexistent/schemamap.yaml"))).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_flags_override_options() {
        let config = Config::default();
        let options = config.transformer_options(&TransformFlags {
            strict: true,
            no_coerce: true,
            ..Default::default()
        });
        assert!(options.strict);
        assert!(!options.coerce_types);
        assert!(!options.unrestricted_eval);
    }

    #[test]
    fn test_merge_keeps_unset_logging_fields() {
        let mut base = Config::default();
        base.logging.file = Some(PathBuf::from("schemamap.log"));
        let mut other = Config::default();
        other.logging.level = Some("debug".to_string());
        base.merge(other);
        assert_eq!(base.logging.level.as_deref(), Some("debug"));
        assert_eq!(base.logging.file, Some(PathBuf::from("schemamap.log")));
    }
}
