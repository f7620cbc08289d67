//! Object transformation: mapping source instances to target instances
//!
//! An [`ObjectTransformer`] walks a source object along the class derivation
//! that populates from its class, computing every target slot in declaration
//! order. Each slot value comes from exactly one primary source (a pivot, a
//! literal, a unit conversion, an expression, a source slot or path, a set of
//! candidate slots, or the class name), and is then reshaped to the target
//! slot's cardinality and datatype.
//!
//! # Module Organization
//!
//! - [`object_transformer`] - The transformer and its slot algorithm
//! - [`bindings`] - Lazy evaluation environment over a source object
//! - [`resolution`] - Class derivation lookup and inheritance flattening
//! - [`collections`] - Cardinality, stringification and compact dicts
//! - [`coerce`] - Datatype coercion for primitive ranges
//! - [`pivot`] - MELT and UNMELT
//! - [`unit_conversion`] - Scalar and composite unit conversion
//! - [`aggregation`] - Aggregation operators over list values
//! - [`enums`] - Enum derivations
//! - [`value_mappings`] - Literal and expression value mappings
//!
//! # Example
//!
//! ```
//! use schemamap_core::{ObjectTransformer, TransformationSpecification, TransformerOptions};
//! use schemamap_schemas::SchemaView;
//! use serde_json::json;
//!
//! let source = SchemaView::from_value(json!({
//!     "name": "personinfo",
//!     "classes": {"Person": {"attributes": {
//!         "name": {"range": "string"},
//!         "age_in_years": {"range": "integer"}
//!     }}}
//! })).unwrap();
//! let spec = TransformationSpecification::from_value(json!({
//!     "class_derivations": {"Agent": {
//!         "populated_from": "Person",
//!         "slot_derivations": {
//!             "label": {"populated_from": "name"},
//!             "age": {"expr": "str({age_in_years}) + ' years'"}
//!         }
//!     }}
//! })).unwrap();
//!
//! let transformer = ObjectTransformer::new(spec, source, TransformerOptions::default()).unwrap();
//! let agent = transformer
//!     .map_object(&json!({"name": "Alice", "age_in_years": 33}), Some("Person"), None)
//!     .unwrap();
//! assert_eq!(agent, json!({"label": "Alice", "age": "33 years"}));
//! ```
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

pub mod aggregation;
pub mod bindings;
pub mod coerce;
pub mod collections;
pub mod enums;
pub mod object_transformer;
pub mod pivot;
pub mod resolution;
pub mod unit_conversion;
pub mod value_mappings;

#[cfg(test)]
mod tests;

pub use bindings::Bindings;
pub use coerce::Coercer;
pub use object_transformer::ObjectTransformer;
