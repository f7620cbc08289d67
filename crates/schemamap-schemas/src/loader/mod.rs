//! Schema loading and parsing functionality
//!
//! Schemas are read from YAML or JSON, canonicalized into the metamodel of
//! [`crate::model`], and merged with the local schemas they import.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use schemamap_schemas::loader::SchemaLoader;
//! use std::path::Path;
//!
//! let loader = SchemaLoader::new();
//! let view = loader.load_schema(Path::new("personinfo.yaml"))?;
//! println!("classes: {:?}", view.all_classes().keys().collect::<Vec<_>>());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

pub mod error;
pub mod parser;
pub mod schema_loader;

pub use error::{LoaderError, LoaderResult};
pub use parser::{DocumentParser, Format};
pub use schema_loader::{LoaderConfig, SchemaLoader};
