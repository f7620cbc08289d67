//! Session facade bundling schemas, specification and transformer
//!
//! A [`Session`] holds the source schema, the transformation specification
//! and the transformer options, and builds the pieces that depend on them on
//! first use: the object transformer (with its object index), the derived
//! target schema, and inverted specifications. Replacing the schema or the
//! specification discards everything derived from them.
//!
//! # Example
//!
//! ```
//! use schemamap_core::{Session, TransformationSpecification};
//! use schemamap_schemas::SchemaView;
//! use serde_json::json;
//!
//! let mut session = Session::new();
//! session.set_source_schema(SchemaView::from_value(json!({
//!     "name": "personinfo",
//!     "classes": {"Person": {"attributes": {"name": {"range": "string"}}}}
//! })).unwrap());
//! session.set_transformer_specification(TransformationSpecification::from_value(json!({
//!     "class_derivations": {"Agent": {
//!         "populated_from": "Person",
//!         "slot_derivations": {"label": {"populated_from": "name"}}
//!     }}
//! })).unwrap());
//!
//! let agent = session.transform(&json!({"name": "Alice"}), Some("Person")).unwrap();
//! assert_eq!(agent, json!({"label": "Alice"}));
//! let person = session.reverse_transform(&agent, Some("Agent")).unwrap();
//! assert_eq!(person, json!({"name": "Alice"}));
//! ```
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::config::TransformerOptions;
use crate::error::{Error, Result};
use crate::inverter::Inverter;
use crate::schema_mapper::SchemaMapper;
use crate::spec::TransformationSpecification;
use crate::transformer::ObjectTransformer;
use schemamap_schemas::{SchemaDefinition, SchemaLoader, SchemaView};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Entry point tying a source schema and a specification together
#[derive(Debug, Default)]
pub struct Session {
    source_schema: Option<SchemaView>,
    target_schema: Option<SchemaView>,
    specification: Option<TransformationSpecification>,
    options: TransformerOptions,
    transformer: Option<ObjectTransformer>,
    derived_target_schema: Option<SchemaView>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TransformerOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &TransformerOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: TransformerOptions) {
        self.options = options;
        self.reset();
    }

    pub fn set_source_schema(&mut self, schema: SchemaView) {
        self.source_schema = Some(schema);
        self.reset();
    }

    /// Load the source schema from a YAML or JSON file, resolving local imports
    pub fn load_source_schema(&mut self, path: &Path) -> Result<()> {
        let schema = SchemaLoader::new().load_schema(path)?;
        info!(path = %path.display(), "Loaded source schema");
        self.set_source_schema(schema);
        Ok(())
    }

    /// Use an explicit target schema instead of deriving one
    pub fn set_target_schema(&mut self, schema: SchemaView) {
        self.target_schema = Some(schema);
        self.reset();
    }

    pub fn set_transformer_specification(&mut self, specification: TransformationSpecification) {
        self.specification = Some(specification);
        self.reset();
    }

    /// Load the specification from a YAML or JSON file
    pub fn load_transformer_specification(&mut self, path: &Path) -> Result<()> {
        let specification = TransformationSpecification::from_path(path)?;
        info!(path = %path.display(), "Loaded transformation specification");
        self.set_transformer_specification(specification);
        Ok(())
    }

    pub fn source_schema(&self) -> Option<&SchemaView> {
        self.source_schema.as_ref()
    }

    pub fn specification(&self) -> Option<&TransformationSpecification> {
        self.specification.as_ref()
    }

    fn reset(&mut self) {
        self.transformer = None;
        self.derived_target_schema = None;
    }

    fn require_source_schema(&self) -> Result<&SchemaView> {
        self.source_schema
            .as_ref()
            .ok_or_else(|| Error::specification("no source schema has been set"))
    }

    fn require_specification(&self) -> Result<&TransformationSpecification> {
        self.specification
            .as_ref()
            .ok_or_else(|| Error::specification("no transformation specification has been set"))
    }

    /// The transformer, built on first use
    pub fn transformer(&mut self) -> Result<&mut ObjectTransformer> {
        let transformer = match self.transformer.take() {
            Some(transformer) => transformer,
            None => {
                let transformer = ObjectTransformer::new(
                    self.require_specification()?.clone(),
                    self.require_source_schema()?.clone(),
                    self.options.clone(),
                )?;
                debug!("Built object transformer");
                match &self.target_schema {
                    Some(target) => transformer.with_target_schema(target.clone()),
                    None => transformer,
                }
            }
        };
        Ok(self.transformer.insert(transformer))
    }

    /// The specification with defaults induced from the source schema
    pub fn derived_specification(&mut self) -> Result<&TransformationSpecification> {
        Ok(self.transformer()?.derived_specification())
    }

    /// Derive the target schema from the (patched) source schema
    pub fn derive_schema(&mut self, target_id: Option<&str>, target_name: Option<&str>) -> Result<SchemaDefinition> {
        let transformer = self.transformer()?;
        SchemaMapper::new(transformer.source_schemaview()).derive_schema(
            transformer.derived_specification(),
            target_id,
            target_name,
        )
    }

    /// The explicit target schema, or the derived one
    pub fn target_schema(&mut self) -> Result<&SchemaView> {
        if self.target_schema.is_none() && self.derived_target_schema.is_none() {
            let derived = self.derive_schema(None, None)?;
            self.derived_target_schema = Some(SchemaView::new(derived));
        }
        self.target_schema
            .as_ref()
            .or(self.derived_target_schema.as_ref())
            .ok_or_else(|| Error::specification("no target schema could be derived"))
    }

    /// Index every identified object reachable from `root` so dot-paths
    /// can follow references
    pub fn index(&mut self, root: &Value, class_name: &str) -> Result<()> {
        self.transformer()?.index(root, class_name);
        Ok(())
    }

    /// Map one source object
    pub fn transform(&mut self, obj: &Value, source_type: Option<&str>) -> Result<Value> {
        self.transformer()?.map_object(obj, source_type, None)
    }

    /// Map one source object into a specific target class
    pub fn transform_to(&mut self, obj: &Value, source_type: Option<&str>, target_type: &str) -> Result<Value> {
        self.transformer()?.map_object(obj, source_type, Some(target_type))
    }

    /// Invert the derived specification
    pub fn invert(&mut self, strict: bool) -> Result<TransformationSpecification> {
        let transformer = self.transformer()?;
        Inverter::new(transformer.source_schemaview())
            .strict(strict)
            .invert(transformer.derived_specification())
    }

    /// Map a target object back to the source schema
    ///
    /// The specification is inverted non-strictly and applied with the
    /// target schema as the source schema.
    pub fn reverse_transform(&mut self, obj: &Value, source_type: Option<&str>) -> Result<Value> {
        let inverted = self.invert(false)?;
        let target = self.target_schema()?.clone();
        let original_source = (**self.transformer()?.source_schemaview()).clone();
        let reverse = ObjectTransformer::new(inverted, target, self.options.clone())?
            .with_target_schema(original_source);
        reverse.map_object(obj, source_type, None)
    }
}
