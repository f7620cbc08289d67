//! Schema loader with local import resolution
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::loader::{
    error::{LoaderError, LoaderResult},
    parser::DocumentParser,
};
use crate::model::{canonicalize_schema_value, SchemaDefinition};
use crate::view::SchemaView;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Prefix marking imports of the built-in type library
const BUILTIN_IMPORT_PREFIX: &str = "linkml:";

/// Configuration for schema loader behavior
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Whether `imports` are followed
    pub resolve_imports: bool,
    /// Maximum import nesting depth
    pub max_import_depth: usize,
    /// Check `is_a`/`mixins` for cycles after loading
    pub check_inheritance: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            resolve_imports: true,
            max_import_depth: 16,
            check_inheritance: true,
        }
    }
}

/// Loads schema documents from disk and merges their local imports
#[derive(Debug, Default)]
pub struct SchemaLoader {
    config: LoaderConfig,
    parser: DocumentParser,
}

impl SchemaLoader {
    /// Create a new schema loader with default configuration
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a new schema loader with custom configuration
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            config,
            parser: DocumentParser::new(),
        }
    }

    /// Parse any YAML or JSON document into a JSON value
    pub fn load_value(&self, path: &Path) -> LoaderResult<Value> {
        self.parser.parse_file(path)
    }

    /// Load a schema and every local schema it imports
    pub fn load_schema(&self, path: &Path) -> LoaderResult<SchemaView> {
        let mut stack = Vec::new();
        let schema = self.load_recursive(path, &mut stack)?;
        let view = SchemaView::new(schema);

        if self.config.check_inheritance {
            view.check_inheritance()
                .map_err(|source| LoaderError::InvalidSchema {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        debug!(
            path = %path.display(),
            classes = view.all_classes().len(),
            enums = view.all_enums().len(),
            "loaded schema"
        );
        Ok(view)
    }

    /// Build a schema from an in-memory document; imports are not followed
    pub fn schema_from_value(&self, value: Value) -> LoaderResult<SchemaView> {
        let path = PathBuf::from("<memory>");
        let schema = Self::to_schema(value, &path)?;
        Ok(SchemaView::new(schema))
    }

    fn load_recursive(&self, path: &Path, stack: &mut Vec<PathBuf>) -> LoaderResult<SchemaDefinition> {
        let canonical = path
            .canonicalize()
            .map_err(|e| LoaderError::io_error(path.to_path_buf(), e))?;

        if stack.contains(&canonical) {
            let mut chain = stack.clone();
            chain.push(canonical);
            return Err(LoaderError::circular_import(chain));
        }
        if stack.len() >= self.config.max_import_depth {
            return Err(LoaderError::import_error(
                path.display().to_string(),
                path.to_path_buf(),
                format!("import depth exceeds {}", self.config.max_import_depth),
            ));
        }

        stack.push(canonical.clone());
        let raw = self.parser.parse_file(&canonical)?;
        let schema = Self::to_schema(raw, &canonical)?;

        let mut view = SchemaView::new(schema);
        if self.config.resolve_imports {
            let base_dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
            let imports = view.schema().imports.clone();
            for import in imports {
                let Some(import_path) = resolve_import(&base_dir, &import) else {
                    trace!(import = %import, "skipping built-in import");
                    continue;
                };
                if !import_path.exists() {
                    return Err(LoaderError::import_error(
                        import,
                        canonical.clone(),
                        format!("'{}' does not exist", import_path.display()),
                    ));
                }
                let imported = self.load_recursive(&import_path, stack)?;
                debug!(import = %import, "merging imported schema");
                view.absorb_import(imported);
            }
        }
        stack.pop();

        Ok(view.into_schema())
    }

    fn to_schema(raw: Value, path: &Path) -> LoaderResult<SchemaDefinition> {
        let invalid = |source| LoaderError::InvalidSchema {
            path: path.to_path_buf(),
            source,
        };
        let canonical = canonicalize_schema_value(raw).map_err(invalid)?;
        SchemaDefinition::from_value(canonical).map_err(invalid)
    }
}

/// Map an import name to a file path; `None` for built-in imports
fn resolve_import(base_dir: &Path, import: &str) -> Option<PathBuf> {
    if import.starts_with(BUILTIN_IMPORT_PREFIX) {
        return None;
    }
    let mut path = base_dir.join(import);
    if path.extension().is_none() {
        path.set_extension("yaml");
    }
    Some(path)
}
