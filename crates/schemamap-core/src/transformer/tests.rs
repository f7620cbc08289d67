//! Tests for the object transformer
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::ObjectTransformer;
use crate::config::TransformerOptions;
use crate::error::Error;
use crate::spec::TransformationSpecification;
use pretty_assertions::assert_eq;
use schemamap_schemas::SchemaView;
use serde_json::{json, Value};

fn personinfo() -> SchemaView {
    SchemaView::from_value(json!({
        "name": "personinfo",
        "prefixes": {"ex": "http://example.org/"},
        "classes": {
            "Container": {"attributes": {
                "persons": {"range": "Person", "multivalued": true, "inlined_as_list": true},
                "organizations": {"range": "Organization", "multivalued": true, "inlined_as_list": true}
            }},
            "NamedThing": {"attributes": {
                "id": {"identifier": true},
                "name": {"range": "string"}
            }},
            "Person": {"is_a": "NamedThing", "attributes": {
                "age_in_years": {"range": "integer"},
                "nickname": {"range": "string"},
                "alias": {"range": "string"},
                "aliases": {"range": "string", "multivalued": true},
                "aliases_str": {"range": "string"},
                "employer": {"range": "Organization"},
                "status": {"range": "PersonStatus"},
                "addresses": {"range": "Address", "multivalued": true, "inlined_as_list": true},
                "pets": {"range": "Pet", "multivalued": true, "inlined": true},
                "height": {"range": "float", "unit": {"ucum_code": "m"}},
                "weight": {"range": "float", "unit": {"ucum_code": "kg"}},
                "scores": {"range": "integer", "multivalued": true},
                "gender": {"range": "string"},
                "homepage": {"range": "uriorcurie"}
            }},
            "Organization": {"is_a": "NamedThing"},
            "Address": {"attributes": {"street": {"range": "string"}, "city": {"range": "string"}}},
            "Pet": {"attributes": {"id": {"identifier": true}, "species": {"range": "string"}}}
        },
        "enums": {"PersonStatus": {"permissible_values": ["ALIVE", "DEAD", "UNKNOWN"]}}
    }))
    .unwrap()
}

fn transformer(spec: Value) -> ObjectTransformer {
    transformer_with(spec, TransformerOptions::default())
}

fn transformer_with(spec: Value, options: TransformerOptions) -> ObjectTransformer {
    let spec = TransformationSpecification::from_value(spec).unwrap();
    ObjectTransformer::new(spec, personinfo(), options).unwrap()
}

fn agent_spec(slot_derivations: Value) -> Value {
    json!({
        "class_derivations": {
            "Agent": {"populated_from": "Person", "slot_derivations": slot_derivations}
        }
    })
}

#[test]
fn test_rename_and_expression() {
    let t = transformer(agent_spec(json!({
        "label": {"populated_from": "name"},
        "age": {"expr": "str({age_in_years}) + ' years'"},
        "id": null
    })));
    let agent = t
        .map_object(&json!({"id": "P1", "name": "Alice", "age_in_years": 33}), Some("Person"), None)
        .unwrap();
    assert_eq!(agent, json!({"label": "Alice", "age": "33 years", "id": "P1"}));

    // unset braced variables null the expression, and nulls are omitted
    let agent = t.map_object(&json!({"id": "P2", "name": "Bob"}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"label": "Bob", "id": "P2"}));
}

#[test]
fn test_source_type_inferred_from_single_derivation() {
    let t = transformer(agent_spec(json!({"label": {"populated_from": "name"}})));
    let agent = t.map_object(&json!({"name": "Alice"}), None, None).unwrap();
    assert_eq!(agent, json!({"label": "Alice"}));
    let agent = t.map_object(&json!({"name": "Alice"}), None, Some("Agent")).unwrap();
    assert_eq!(agent, json!({"label": "Alice"}));
}

#[test]
fn test_missing_derivation_is_an_error_at_top_level() {
    let t = transformer(agent_spec(json!({"label": {"populated_from": "name"}})));
    let err = t.map_object(&json!({"species": "cat"}), Some("Pet"), None).unwrap_err();
    assert!(matches!(err, Error::Specification { .. }));
}

#[test]
fn test_value_literal_and_type_designator() {
    let t = transformer(agent_spec(json!({
        "category": {"type_designator": true},
        "source": {"value": "personinfo"}
    })));
    let agent = t.map_object(&json!({"name": "Alice"}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"category": "Agent", "source": "personinfo"}));
}

#[test]
fn test_sources_must_be_unambiguous() {
    let t = transformer(agent_spec(json!({"display": {"sources": ["nickname", "alias"]}})));
    let agent = t.map_object(&json!({"alias": "Al"}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"display": "Al"}));

    let err = t
        .map_object(&json!({"nickname": "Ali", "alias": "Al"}), Some("Person"), None)
        .unwrap_err();
    match err {
        Error::Ambiguity { class_name, slot_name, candidates } => {
            assert_eq!(class_name, "Agent");
            assert_eq!(slot_name, "display");
            assert_eq!(candidates, vec!["nickname", "alias"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_hidden_slots_feed_later_expressions() {
    let t = transformer(agent_spec(json!({
        "first": {"expr": "{name}", "hide": true},
        "greeting": {"expr": "'Hello ' + first"}
    })));
    let agent = t.map_object(&json!({"name": "Alice"}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"greeting": "Hello Alice"}));
}

#[test]
fn test_mirror_source_copies_unmapped_slots() {
    let t = transformer(json!({
        "class_derivations": {
            "Agent": {"populated_from": "Person", "mirror_source": true, "slot_derivations": {
                "label": {"populated_from": "name"}
            }}
        }
    }));
    let agent = t
        .map_object(&json!({"id": "P1", "name": "Alice", "gender": "F"}), Some("Person"), None)
        .unwrap();
    assert_eq!(agent, json!({"label": "Alice", "id": "P1", "name": "Alice", "gender": "F"}));
}

#[test]
fn test_restricted_expression_errors_without_fallback() {
    let spec = agent_spec(json!({"shout": {"expr": "{name}.upper()"}}));
    let err = transformer(spec.clone())
        .map_object(&json!({"name": "alice"}), Some("Person"), None)
        .unwrap_err();
    assert!(err.is_expression_error());

    let t = transformer_with(spec, TransformerOptions::default().with_unrestricted_eval(true));
    let agent = t.map_object(&json!({"name": "alice"}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"shout": "ALICE"}));
}

#[test]
fn test_block_expression() {
    let spec = agent_spec(json!({
        "summary": {"expr": "parts = [src.name, str(src.age_in_years)]\ntarget = '/'.join(parts)"}
    }));
    let err = transformer(spec.clone())
        .map_object(&json!({"name": "Alice", "age_in_years": 3}), Some("Person"), None)
        .unwrap_err();
    assert!(err.is_expression_error());

    let t = transformer_with(spec, TransformerOptions::default().with_unrestricted_eval(true));
    let agent = t
        .map_object(&json!({"name": "Alice", "age_in_years": 3}), Some("Person"), None)
        .unwrap();
    assert_eq!(agent, json!({"summary": "Alice/3"}));
}

#[test]
fn test_nested_objects_use_class_derivations() {
    let t = transformer(json!({
        "class_derivations": {
            "Agent": {"populated_from": "Person", "slot_derivations": {
                "locations": {"populated_from": "addresses"}
            }},
            "Location": {"populated_from": "Address", "slot_derivations": {
                "town": {"populated_from": "city"}
            }}
        }
    }));
    let agent = t
        .map_object(
            &json!({"addresses": [{"street": "1 Main St", "city": "Springfield"}, {"city": "Shelbyville"}]}),
            Some("Person"),
            None,
        )
        .unwrap();
    assert_eq!(
        agent,
        json!({"locations": [{"town": "Springfield"}, {"town": "Shelbyville"}]})
    );
}

#[test]
fn test_inline_object_derivations() {
    let t = transformer(agent_spec(json!({
        "locations": {
            "populated_from": "addresses",
            "object_derivations": {
                "Location": {"populated_from": "Address", "slot_derivations": {"road": {"populated_from": "street"}}}
            }
        }
    })));
    let agent = t
        .map_object(&json!({"addresses": [{"street": "1 Main St"}]}), Some("Person"), None)
        .unwrap();
    assert_eq!(agent, json!({"locations": [{"road": "1 Main St"}]}));
}

#[test]
fn test_compact_dict_cardinality_is_preserved() {
    let t = transformer(json!({
        "class_derivations": {
            "Agent": {"populated_from": "Person", "slot_derivations": {"animals": {"populated_from": "pets"}}},
            "Animal": {"populated_from": "Pet", "slot_derivations": {"kind": {"populated_from": "species"}}}
        }
    }));
    let agent = t
        .map_object(
            &json!({"pets": {"p1": {"species": "cat"}, "p2": {"species": "dog"}}}),
            Some("Person"),
            None,
        )
        .unwrap();
    assert_eq!(agent, json!({"animals": {"p1": {"kind": "cat"}, "p2": {"kind": "dog"}}}));
}

#[test]
fn test_scalar_is_wrapped_for_multivalued_source() {
    let t = transformer(agent_spec(json!({"names": {"populated_from": "aliases"}})));
    let agent = t.map_object(&json!({"aliases": "Al"}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"names": ["Al"]}));
}

#[test]
fn test_dictionary_key_and_back() {
    let forward = transformer(agent_spec(json!({
        "pets": {"populated_from": "pets", "dictionary_key": "id", "cast_collection_as": "MultiValuedDict"}
    })));
    let list = json!([{"id": "p1", "species": "cat"}, {"id": "p2", "species": "dog"}]);
    let dict = forward
        .map_object(&json!({"pets": list.clone()}), Some("Person"), None)
        .unwrap();
    assert_eq!(dict, json!({"pets": {"p1": {"species": "cat"}, "p2": {"species": "dog"}}}));

    let back = transformer(agent_spec(json!({
        "pets": {"populated_from": "pets", "cast_collection_as": "MultiValuedList"}
    })));
    let restored = back.map_object(&dict, Some("Person"), None).unwrap();
    assert_eq!(restored, json!({"pets": list}));
}

#[test]
fn test_stringification_both_ways() {
    let joined = transformer(agent_spec(json!({
        "aliases_str": {"populated_from": "aliases", "stringification": {"delimiter": "|"}}
    })));
    let agent = joined
        .map_object(&json!({"aliases": ["a", "b", "c"]}), Some("Person"), None)
        .unwrap();
    assert_eq!(agent, json!({"aliases_str": "a|b|c"}));

    let split = transformer(agent_spec(json!({
        "aliases": {"populated_from": "aliases_str", "stringification": {"delimiter": "|", "reversed": true}}
    })));
    let agent = split.map_object(&json!({"aliases_str": "a|b"}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"aliases": ["a", "b"]}));
}

#[test]
fn test_single_valued_cast() {
    let t = transformer(agent_spec(json!({
        "alias": {"populated_from": "aliases", "cast_collection_as": "SingleValued"}
    })));
    let agent = t.map_object(&json!({"aliases": ["Al"]}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"alias": "Al"}));
    assert!(t.map_object(&json!({"aliases": ["Al", "Ali"]}), Some("Person"), None).is_err());
}

#[test]
fn test_unit_conversion_in_mapping() {
    let t = transformer(agent_spec(json!({
        "height_cm": {"populated_from": "height", "unit_conversion": {"target_unit": "cm"}},
        "mass": {
            "populated_from": "weight",
            "unit_conversion": {"target_unit": "g", "target_magnitude_slot": "value", "target_unit_slot": "unit"}
        }
    })));
    let agent = t
        .map_object(&json!({"height": 1.8, "weight": 70}), Some("Person"), None)
        .unwrap();
    assert!((agent["height_cm"].as_f64().unwrap() - 180.0).abs() < 1e-9);
    assert_eq!(agent["mass"]["unit"], json!("g"));
    assert!((agent["mass"]["value"].as_f64().unwrap() - 70000.0).abs() < 1e-6);
}

#[test]
fn test_enum_values_are_mapped() {
    let t = transformer(json!({
        "class_derivations": {
            "Agent": {"populated_from": "Person", "slot_derivations": {"vital_status": {"populated_from": "status"}}}
        },
        "enum_derivations": {
            "VitalStatus": {
                "populated_from": "PersonStatus",
                "permissible_value_derivations": {
                    "LIVING": {"populated_from": "ALIVE"},
                    "DECEASED": {"populated_from": "DEAD"}
                }
            }
        }
    }));
    let agent = t.map_object(&json!({"status": "DEAD"}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"vital_status": "DECEASED"}));
    assert_eq!(t.transform_enum(&json!("UNKNOWN"), "PersonStatus").unwrap(), Value::Null);
}

#[test]
fn test_value_mappings_and_aggregation() {
    let t = transformer(agent_spec(json!({
        "sex": {"populated_from": "gender", "value_mappings": {"F": "female", "M": "male"}},
        "total": {"populated_from": "scores", "aggregation_operation": {"operator": "SUM"}},
        "best": {"populated_from": "scores", "aggregation_operation": {"operator": "MAX"}},
        "band": {"expression_to_value_mappings": {"age_in_years < 18": "minor", "age_in_years >= 18": "adult"}}
    })));
    let agent = t
        .map_object(&json!({"gender": "F", "scores": [3, 9, 4], "age_in_years": 40}), Some("Person"), None)
        .unwrap();
    assert_eq!(agent, json!({"sex": "female", "total": 16, "best": 9, "band": "adult"}));
}

#[test]
fn test_melt_slot() {
    let t = transformer(agent_spec(json!({
        "measurements": {"pivot_operation": {
            "direction": "MELT",
            "source_slots": ["height", "weight"],
            "unit_slot": "unit"
        }}
    })));
    let agent = t
        .map_object(&json!({"height": 1.8, "weight": 75.0}), Some("Person"), None)
        .unwrap();
    assert_eq!(
        agent,
        json!({"measurements": [
            {"variable": "height", "value": 1.8, "unit": "m"},
            {"variable": "weight", "value": 75.0, "unit": "kg"}
        ]})
    );
}

#[test]
fn test_dot_path_requires_index() {
    let spec = json!({
        "class_derivations": {
            "FlatPerson": {"populated_from": "Person", "slot_derivations": {
                "employer_name": {"populated_from": "employer.name"}
            }}
        }
    });
    let container = json!({
        "persons": [{"id": "P1", "employer": "O1"}, {"id": "P2", "employer": "O9"}],
        "organizations": [{"id": "O1", "name": "Acme"}]
    });

    let mut t = transformer(spec.clone());
    let person = &container["persons"][0];
    assert_eq!(t.map_object(person, Some("Person"), None).unwrap(), json!({}));

    t.index(&container, "Container");
    assert_eq!(
        t.map_object(person, Some("Person"), None).unwrap(),
        json!({"employer_name": "Acme"})
    );
    // dangling references yield null unless strict
    assert_eq!(t.map_object(&container["persons"][1], Some("Person"), None).unwrap(), json!({}));

    let mut strict = transformer_with(spec, TransformerOptions::default().with_strict(true));
    assert!(strict.map_object(person, Some("Person"), None).is_err());
    strict.index(&container, "Container");
    assert!(strict.map_object(&container["persons"][1], Some("Person"), None).is_err());
}

#[test]
fn test_datatype_coercion() {
    let t = transformer(agent_spec(json!({
        "age": {"populated_from": "age_in_years", "range": "string"},
        "homepage": {"populated_from": "homepage"},
        "years": {"expr": "{age_in_years}", "range": "float"}
    })));
    let agent = t
        .map_object(&json!({"age_in_years": 33, "homepage": "ex:alice"}), Some("Person"), None)
        .unwrap();
    assert_eq!(agent, json!({"age": "33", "homepage": "http://example.org/alice", "years": 33.0}));

    let raw = transformer_with(
        agent_spec(json!({"age": {"populated_from": "age_in_years", "range": "string"}})),
        TransformerOptions::default().with_coerce_types(false),
    );
    let agent = raw.map_object(&json!({"age_in_years": 33}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"age": 33}));
}

#[test]
fn test_inherited_slot_derivations() {
    let t = transformer(json!({
        "class_derivations": {
            "Thing": {"populated_from": "NamedThing", "slot_derivations": {
                "identifier": {"populated_from": "id"},
                "label": {"populated_from": "name"}
            }},
            "Agent": {"populated_from": "Person", "is_a": "Thing", "slot_derivations": {
                "label": {"expr": "{name} + '!'"}
            }}
        }
    }));
    let agent = t
        .map_object(&json!({"id": "P1", "name": "Alice"}), Some("Person"), None)
        .unwrap();
    assert_eq!(agent, json!({"label": "Alice!", "identifier": "P1"}));
}

#[test]
fn test_source_schema_patches_are_applied_once() {
    let t = transformer(json!({
        "source_schema_patches": {"classes": {"Person": {"attributes": {"shoe_size": {"range": "integer"}}}}},
        "class_derivations": {"Agent": {"populated_from": "Person", "mirror_source": true}}
    }));
    assert!(t.source_schemaview().induced_slot("shoe_size", "Person").is_some());
    let agent = t.map_object(&json!({"shoe_size": 42}), Some("Person"), None).unwrap();
    assert_eq!(agent, json!({"shoe_size": 42}));
}

#[test]
fn test_primitive_source_type() {
    let t = transformer(agent_spec(json!({})));
    assert_eq!(t.map_object(&json!("42"), Some("string"), Some("integer")).unwrap(), json!(42));
    assert_eq!(t.map_object(&json!("42"), Some("string"), None).unwrap(), json!("42"));
}
