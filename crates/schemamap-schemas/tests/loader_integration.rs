//! Integration tests for loading schemas from disk
//!
//! These tests cover the loose wire forms accepted by the loader, import
//! merging across files, and the inheritance-aware queries run on the result.

use pretty_assertions::assert_eq;
use schemamap_schemas::{LoaderError, Primitive, RangeKind, SchemaLoader};
use std::fs;
use tempfile::tempdir;

const PERSONINFO: &str = r#"
id: https://w3id.org/example/personinfo
name: personinfo
prefixes:
  personinfo: https://w3id.org/example/personinfo/
  schema: http://schema.org/
default_prefix: personinfo
imports:
  - linkml:types
  - shared
classes:
  - Person:
      is_a: NamedThing
      attributes:
        age_in_years:
          range: integer
        height:
          range: float
          unit:
            ucum_code: m
        aliases:
          multivalued: true
        employer:
          range: Organization
  - Organization:
      is_a: NamedThing
enums:
  FamilialRelationshipType:
    permissible_values:
      - SIBLING_OF
      - PARENT_OF
"#;

const SHARED: &str = r#"
name: shared
types:
  Name:
    typeof: string
classes:
  NamedThing:
    attributes:
      id:
        identifier: true
      name:
        range: Name
"#;

#[cfg(test)]
mod loading {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_loose_forms_are_canonicalized() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("personinfo.yaml"), PERSONINFO).unwrap();
        fs::write(dir.path().join("shared.yaml"), SHARED).unwrap();

        let view = SchemaLoader::new()
            .load_schema(&dir.path().join("personinfo.yaml"))
            .unwrap();

        let classes: Vec<_> = view.all_classes().keys().cloned().collect();
        assert_eq!(classes, vec!["Person", "Organization", "NamedThing"]);

        let relationship = view.get_enum("FamilialRelationshipType").unwrap();
        let pvs: Vec<_> = relationship.permissible_values.keys().cloned().collect();
        assert_eq!(pvs, vec!["SIBLING_OF", "PARENT_OF"]);
    }

    #[test]
    fn test_imported_elements_are_queryable() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("personinfo.yaml"), PERSONINFO).unwrap();
        fs::write(dir.path().join("shared.yaml"), SHARED).unwrap();

        let view = SchemaLoader::new()
            .load_schema(&dir.path().join("personinfo.yaml"))
            .unwrap();

        let name = view.induced_slot("name", "Person").unwrap();
        assert_eq!(view.range_kind(name.range.as_deref().unwrap()), RangeKind::Type(Primitive::String));

        let employer = view.induced_slot("employer", "Person").unwrap();
        assert_eq!(view.range_kind("Organization"), RangeKind::Class);
        assert!(!view.is_inlined(&employer));

        let height = view.induced_slot("height", "Person").unwrap();
        assert_eq!(height.unit.unwrap().preferred_code(), Some("m"));

        assert_eq!(
            view.get_identifier_slot("Organization", true).map(|s| s.name),
            Some("id".to_string())
        );
    }

    #[test]
    fn test_json_schema_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.json");
        fs::write(
            &path,
            r#"{"name": "tiny", "classes": {"Thing": {"attributes": {"x": {"range": "integer"}}}}}"#,
        )
        .unwrap();

        let view = SchemaLoader::new().load_schema(&path).unwrap();
        assert_eq!(view.class_slot_names("Thing"), vec!["x"]);
    }

    #[test]
    fn test_inheritance_cycle_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cyclic.yaml");
        fs::write(&path, "classes:\n  A:\n    is_a: B\n  B:\n    is_a: A\n").unwrap();

        let err = SchemaLoader::new().load_schema(&path).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidSchema { .. }));
    }
}
