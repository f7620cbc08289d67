//! Shared test support utilities for integration tests

#![allow(dead_code)]

use schemamap_core::TransformationSpecification;
use schemamap_schemas::SchemaView;
use serde_json::Value;

/// The person/organization schema used across scenarios
pub const PERSONINFO: &str = r#"
id: https://example.org/personinfo
name: personinfo
prefixes:
  ex: http://example.org/
default_range: string
classes:
  Container:
    tree_root: true
    attributes:
      persons:
        range: Person
        multivalued: true
        inlined_as_list: true
      organizations:
        range: Organization
        multivalued: true
        inlined_as_list: true
  NamedThing:
    attributes:
      id:
        identifier: true
      name:
        range: string
  Person:
    is_a: NamedThing
    attributes:
      age_in_years:
        range: integer
      height:
        range: float
        unit:
          ucum_code: m
      items:
        range: string
        multivalued: true
      items_str:
        range: string
      org_id: {}
      pets:
        range: Pet
        multivalued: true
        inlined: true
  Organization:
    is_a: NamedThing
  Pet:
    attributes:
      id:
        identifier: true
      species:
        range: string
  Observation:
    attributes:
      att:
        range: string
      val:
        range: float
"#;

/// Parse a YAML document into a JSON value
pub fn yaml(content: &str) -> Value {
    let parsed: serde_yaml::Value = serde_yaml::from_str(content).unwrap();
    serde_json::to_value(parsed).unwrap()
}

pub fn personinfo() -> SchemaView {
    SchemaView::from_value(yaml(PERSONINFO)).unwrap()
}

pub fn specification(content: &str) -> TransformationSpecification {
    TransformationSpecification::from_yaml_str(content).unwrap()
}
