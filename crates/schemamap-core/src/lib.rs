//! Schemamap Core - Transformation engine for spec-driven data mapping
//!
//! This crate maps instances of a source schema to instances of a target
//! schema, driven by a declarative transformation specification.
//!
//! # Main Components
//!
//! - **Error Handling**: Error types using `thiserror` and `anyhow`
//! - **Expressions**: A restricted expression language with a permissive fallback
//! - **Units**: Unit parsing and conversion across unit systems
//! - **Specifications**: Data model, normalizer and default inference
//! - **Schema Mapper**: Derivation of the target schema
//! - **Object Transformer**: Recursive mapping of source objects, following
//!   references through an object index
//! - **Inverter**: Mechanical derivation of a reverse specification
//! - **Session**: A facade bundling all of the above
//!
//! # Example
//!
//! ```
//! use schemamap_core::{Result, Session, TransformationSpecification};
//! use schemamap_schemas::SchemaView;
//! use serde_json::json;
//!
//! fn example() -> Result<()> {
//!     let mut session = Session::new();
//!     session.set_source_schema(SchemaView::from_value(json!({
//!         "name": "personinfo",
//!         "classes": {"Person": {"attributes": {"height": {"range": "float", "unit": {"ucum_code": "m"}}}}}
//!     }))?);
//!     session.set_transformer_specification(TransformationSpecification::from_value(json!({
//!         "class_derivations": {"Individual": {
//!             "populated_from": "Person",
//!             "slot_derivations": {"height_in_cm": {
//!                 "populated_from": "height",
//!                 "unit_conversion": {"target_unit": "cm"}
//!             }}
//!         }}
//!     }))?);
//!
//!     let individual = session.transform(&json!({"height": 1.8}), Some("Person"))?;
//!     assert!((individual["height_in_cm"].as_f64().unwrap() - 180.0).abs() < 1e-9);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

pub mod config;
pub mod dynamic_object;
pub mod error;
pub mod expr;
pub mod inverter;
pub mod object_index;
pub mod schema_mapper;
pub mod session;
pub mod spec;
pub mod transformer;
pub mod units;

// Re-export main types for convenience
pub use config::TransformerOptions;
pub use error::{Error, Result, UnitError};
pub use expr::{Datum, Evaluator};
pub use inverter::{invert, Inverter};
pub use object_index::ObjectIndex;
pub use schema_mapper::{derive_schema, SchemaMapper};
pub use session::Session;
pub use spec::{
    ClassDerivation, EnumDerivation, Normalizer, PermissibleValueDerivation, SlotDerivation,
    TransformationSpecification,
};
pub use transformer::ObjectTransformer;
pub use units::{convert_units, UnitSystem};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::specification("no class derivation named 'Agent'");
        assert!(err.to_string().contains("Agent"));
        assert!(!err.is_expression_error());
    }
}
