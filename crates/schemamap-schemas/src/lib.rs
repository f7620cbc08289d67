//! Schemamap Schemas - schema metamodel, schema view and schema loader
//!
//! This crate provides the schema side of a Schemamap transformation:
//! - **Metamodel**: serde-backed `SchemaDefinition`, `ClassDefinition`,
//!   `SlotDefinition`, `EnumDefinition` and `TypeDefinition`
//! - **SchemaView**: inheritance-aware queries (induced slots, identifier
//!   slots, ancestor closure, range classification, CURIE handling)
//! - **Loader**: YAML/JSON parsing with local import resolution
//!
//! ## Quick Start
//!
//! ```rust
//! use schemamap_schemas::SchemaView;
//! use serde_json::json;
//!
//! let view = SchemaView::from_value(json!({
//!     "name": "personinfo",
//!     "classes": {
//!         "Person": {
//!             "attributes": {
//!                 "id": {"identifier": true},
//!                 "age_in_years": {"range": "integer"}
//!             }
//!         }
//!     }
//! })).unwrap();
//!
//! let age = view.induced_slot("age_in_years", "Person").unwrap();
//! assert_eq!(age.range.as_deref(), Some("integer"));
//! ```
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

pub mod builtins;
pub mod error;
pub mod loader;
pub mod merge;
pub mod model;
pub mod view;

// Re-export commonly used types for convenience
pub use builtins::{builtin, is_builtin, Primitive, BUILTIN_TYPES};
pub use error::{SchemaError, SchemaResult};
pub use loader::{LoaderError, LoaderResult, SchemaLoader};
pub use model::{
    canonicalize_schema_value, ClassDefinition, EnumDefinition, PermissibleValue,
    SchemaDefinition, SlotDefinition, TypeDefinition, UnitOfMeasure,
};
pub use view::{RangeKind, SchemaView};
