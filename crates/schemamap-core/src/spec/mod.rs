//! Transformation specifications: data model, normalization and inference
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

pub mod inference;
pub mod model;
pub mod normalizer;

pub use inference::induce_missing_values;
pub use model::*;
pub use normalizer::{check_inheritance, normalize_value, Normalizer};

use crate::error::Result;
use schemamap_schemas::loader::DocumentParser;
use serde_json::Value;
use std::path::Path;

impl TransformationSpecification {
    /// Normalize and validate a raw document
    pub fn from_value(raw: Value) -> Result<Self> {
        Normalizer::new().normalize(raw)
    }

    /// Parse a YAML (or JSON) document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
        Self::from_value(serde_json::to_value(yaml)?)
    }

    /// Load a YAML or JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = DocumentParser::new().parse_file(path)?;
        Self::from_value(raw)
    }

    /// Serialize to a JSON value in canonical form
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
