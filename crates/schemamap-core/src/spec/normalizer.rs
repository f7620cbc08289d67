//! Canonicalization of loosely written specification documents
//!
//! Authors may write derivation collections as lists, use the compact
//! `- Person: {...}` item form, leave entries empty (`Agent:`) or give value
//! mappings as `{key, value}` pairs. [`normalize_value`] rewrites all of these
//! into the canonical mapping form that deserializes directly into
//! [`TransformationSpecification`], and [`Normalizer`] then checks the
//! structural invariants.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::model::{CollectionType, TransformationSpecification};
use crate::error::{Error, Result};
use indexmap::IndexSet;
use schemamap_schemas::model::keyed_collection;
use schemamap_schemas::SchemaError;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Turns raw specification documents into validated specifications
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    strict: bool,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject slot derivations with more than one primary source
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Canonicalize, deserialize and validate a raw document
    pub fn normalize(&self, raw: Value) -> Result<TransformationSpecification> {
        let canonical = normalize_value(raw)?;
        let spec: TransformationSpecification = serde_json::from_value(canonical)
            .map_err(|e| Error::specification(format!("invalid specification: {}", e)))?;
        self.validate(&spec)?;
        debug!(
            class_derivations = spec.class_derivations.len(),
            enum_derivations = spec.enum_derivations.len(),
            "Normalized specification"
        );
        Ok(spec)
    }

    /// Check the structural invariants of a specification
    pub fn validate(&self, spec: &TransformationSpecification) -> Result<()> {
        for cd in spec.all_class_derivations() {
            for sd in cd.slot_derivations.values() {
                let primary = sd.primary_sources();
                if primary.len() > 1 {
                    let message = format!(
                        "slot derivation {}.{} sets more than one of {}",
                        cd.name,
                        sd.name,
                        primary.join(", ")
                    );
                    if self.strict {
                        return Err(Error::specification(message));
                    }
                    warn!("{}", message);
                }
                if sd.cast_collection_as == Some(CollectionType::MultiValuedDict)
                    && sd.dictionary_key.is_none()
                {
                    return Err(Error::specification(format!(
                        "slot derivation {}.{} casts to MultiValuedDict without a dictionary_key",
                        cd.name, sd.name
                    )));
                }
            }
        }
        check_inheritance(spec)
    }
}

/// Reject `is_a`/`mixins` cycles among class derivations
pub fn check_inheritance(spec: &TransformationSpecification) -> Result<()> {
    fn visit(
        name: &str,
        spec: &TransformationSpecification,
        path: &mut IndexSet<String>,
        done: &mut IndexSet<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if !path.insert(name.to_string()) {
            let cycle: Vec<&str> = path.iter().map(String::as_str).collect();
            return Err(Error::specification(format!(
                "class derivation inheritance cycle: {} -> {}",
                cycle.join(" -> "),
                name
            )));
        }
        if let Some(cd) = spec.class_derivations.get(name) {
            for parent in cd.parents() {
                visit(parent, spec, path, done)?;
            }
        }
        path.pop();
        done.insert(name.to_string());
        Ok(())
    }

    let mut done = IndexSet::new();
    for name in spec.class_derivations.keys() {
        visit(name, spec, &mut IndexSet::new(), &mut done)?;
    }
    Ok(())
}

/// Rewrite a raw specification document into canonical form
pub fn normalize_value(raw: Value) -> Result<Value> {
    let mut root = match raw {
        Value::Null => Map::new(),
        Value::Object(root) => root,
        other => {
            return Err(Error::specification(format!(
                "specification must be a mapping, found {}",
                kind(&other)
            )))
        }
    };

    if let Some(prefixes) = root.remove("prefixes") {
        root.insert("prefixes".to_string(), normalize_prefixes(prefixes)?);
    }
    normalize_collection(&mut root, "class_derivations", "name", normalize_class_derivation)?;
    normalize_collection(&mut root, "enum_derivations", "name", normalize_enum_derivation)?;
    normalize_collection(&mut root, "slot_derivations", "name", normalize_slot_derivation)?;
    normalize_collection(&mut root, "copy_directives", "element_name", |_| Ok(()))?;
    Ok(Value::Object(root))
}

fn normalize_collection(
    parent: &mut Map<String, Value>,
    field: &str,
    name_key: &str,
    normalize_item: fn(&mut Map<String, Value>) -> Result<()>,
) -> Result<()> {
    let Some(raw) = parent.remove(field) else {
        return Ok(());
    };
    let mut keyed = keyed_collection(raw, name_key, field).map_err(|e| match e {
        SchemaError::Malformed { message } => Error::specification(message),
        other => Error::specification(other.to_string()),
    })?;
    for (key, item) in keyed.iter_mut() {
        let Value::Object(item) = item else {
            continue;
        };
        match item.get(name_key).and_then(Value::as_str) {
            Some(name) if name != key.as_str() => {
                return Err(Error::specification(format!(
                    "{} entry '{}' declares a different {} '{}'",
                    field, key, name_key, name
                )))
            }
            _ => {}
        }
        normalize_item(item)?;
    }
    if !keyed.is_empty() {
        parent.insert(field.to_string(), Value::Object(keyed));
    }
    Ok(())
}

fn normalize_class_derivation(cd: &mut Map<String, Value>) -> Result<()> {
    scalar_to_list(cd, "sources");
    scalar_to_list(cd, "mixins");
    normalize_collection(cd, "slot_derivations", "name", normalize_slot_derivation)?;
    normalize_collection(cd, "joins", "alias", |_| Ok(()))?;
    normalize_collection(cd, "copy_directives", "element_name", |_| Ok(()))?;
    Ok(())
}

fn normalize_slot_derivation(sd: &mut Map<String, Value>) -> Result<()> {
    scalar_to_list(sd, "sources");
    normalize_collection(sd, "object_derivations", "name", normalize_class_derivation)?;
    for field in [
        "value_mappings",
        "expression_to_value_mappings",
        "expression_to_expression_mappings",
    ] {
        if let Some(raw) = sd.remove(field) {
            let mappings = normalize_mappings(raw, field)?;
            if !mappings.is_empty() {
                sd.insert(field.to_string(), Value::Object(mappings));
            }
        }
    }
    if let Some(Value::Object(stringification)) = sd.get_mut("stringification") {
        scalar_to_list(stringification, "over_slots");
    }
    Ok(())
}

fn normalize_enum_derivation(ed: &mut Map<String, Value>) -> Result<()> {
    scalar_to_list(ed, "sources");
    normalize_collection(ed, "permissible_value_derivations", "name", |pvd| {
        scalar_to_list(pvd, "sources");
        Ok(())
    })?;
    normalize_collection(ed, "copy_directives", "element_name", |_| Ok(()))?;
    Ok(())
}

/// Mappings may be `{k: v}`, `{k: {key: k, value: v}}` or `[{key: k, value: v}]`
fn normalize_mappings(raw: Value, field: &str) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    match raw {
        Value::Null => {}
        Value::Object(map) => {
            for (key, entry) in map {
                let value = match entry {
                    Value::Object(mut kv) if kv.contains_key("value") => {
                        kv.remove("value").unwrap_or(Value::Null)
                    }
                    other => other,
                };
                out.insert(key, value);
            }
        }
        Value::Array(items) => {
            for item in items {
                let key = item.get("key").and_then(scalar_key);
                match key {
                    Some(key) => {
                        let value = item.get("value").cloned().unwrap_or(Value::Null);
                        out.insert(key, value);
                    }
                    None => {
                        return Err(Error::specification(format!(
                            "{} entry without a key: {}",
                            field, item
                        )))
                    }
                }
            }
        }
        other => {
            return Err(Error::specification(format!(
                "{} must be a mapping or a list, found {}",
                field,
                kind(&other)
            )))
        }
    }
    Ok(out)
}

fn normalize_prefixes(raw: Value) -> Result<Value> {
    let mut out = Map::new();
    let mut add = |prefix: String, entry: &Value| match entry {
        Value::String(url) => {
            out.insert(prefix, Value::String(url.clone()));
        }
        other => {
            if let Some(url) = other.get("prefix_reference").and_then(Value::as_str) {
                out.insert(prefix, Value::String(url.to_string()));
            }
        }
    };
    match raw {
        Value::Null => {}
        Value::Object(map) => {
            for (prefix, entry) in map {
                add(prefix, &entry);
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Some(prefix) = item.get("prefix_prefix").and_then(Value::as_str) {
                    add(prefix.to_string(), &item);
                }
            }
        }
        other => {
            return Err(Error::specification(format!(
                "prefixes must be a mapping, found {}",
                kind(&other)
            )))
        }
    }
    Ok(Value::Object(out))
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_to_list(obj: &mut Map<String, Value>, field: &str) {
    match obj.get(field) {
        Some(Value::String(s)) => {
            let s = s.clone();
            obj.insert(field.to_string(), Value::Array(vec![Value::String(s)]));
        }
        Some(Value::Null) => {
            obj.remove(field);
        }
        _ => {}
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::model::ClassDerivation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_null_and_compact_entries() {
        let spec = Normalizer::new()
            .normalize(json!({
                "class_derivations": [
                    {"Agent": {"populated_from": "Person", "slot_derivations": {"label": {"populated_from": "name"}, "age": null}}},
                    {"name": "Org"}
                ]
            }))
            .unwrap();
        let agent = &spec.class_derivations["Agent"];
        assert_eq!(agent.name, "Agent");
        assert_eq!(agent.slot_derivations["age"].name, "age");
        assert_eq!(agent.slot_derivations["label"].populated_from.as_deref(), Some("name"));
        assert!(spec.class_derivations.contains_key("Org"));
    }

    #[test]
    fn test_mapping_null_values() {
        let spec = Normalizer::new()
            .normalize(json!({"class_derivations": {"Agent": null}}))
            .unwrap();
        assert_eq!(spec.class_derivations["Agent"], ClassDerivation::new("Agent"));
    }

    #[test]
    fn test_nested_object_derivations() {
        let spec = Normalizer::new()
            .normalize(json!({
                "class_derivations": {"Container": {"slot_derivations": {
                    "agents": {"populated_from": "persons", "object_derivations": [
                        {"Agent": {"slot_derivations": ["id"]}}
                    ]}
                }}}
            }))
            .unwrap();
        let nested = &spec.class_derivations["Container"].slot_derivations["agents"].object_derivations;
        assert_eq!(nested["Agent"].slot_derivations["id"].name, "id");
        assert_eq!(spec.all_class_derivations().len(), 2);
    }

    #[test]
    fn test_value_mapping_forms() {
        let spec = Normalizer::new()
            .normalize(json!({
                "class_derivations": {"A": {"slot_derivations": {
                    "s": {"value_mappings": {"M": {"key": "M", "value": "male"}, "F": "female"}},
                    "t": {"expression_to_value_mappings": [{"key": "x > 1", "value": "big"}]}
                }}}
            }))
            .unwrap();
        let slots = &spec.class_derivations["A"].slot_derivations;
        assert_eq!(slots["s"].value_mappings["M"], json!("male"));
        assert_eq!(slots["s"].value_mappings["F"], json!("female"));
        assert_eq!(slots["t"].expression_to_value_mappings["x > 1"], json!("big"));
    }

    #[test]
    fn test_invariant_violations() {
        let cycle = Normalizer::new().normalize(json!({
            "class_derivations": {"A": {"is_a": "B"}, "B": {"mixins": "A"}}
        }));
        assert!(matches!(cycle, Err(Error::Specification { .. })));

        let dict = Normalizer::new().normalize(json!({
            "class_derivations": {"A": {"slot_derivations": {"s": {"cast_collection_as": "MultiValuedDict"}}}}
        }));
        assert!(dict.is_err());

        let mismatch = Normalizer::new().normalize(json!({
            "class_derivations": {"A": {"name": "B"}}
        }));
        assert!(mismatch.is_err());
    }

    #[test]
    fn test_duplicate_class_derivations_rejected() {
        let err = Normalizer::new()
            .normalize(json!({
                "class_derivations": [
                    {"name": "Agent", "populated_from": "Person"},
                    {"name": "Agent", "populated_from": "Organization"}
                ]
            }))
            .unwrap_err();
        assert!(matches!(err, Error::Specification { .. }));
        assert!(err.to_string().contains("duplicate name 'Agent'"));
    }

    #[test]
    fn test_duplicate_slot_derivations_rejected() {
        let err = Normalizer::new()
            .normalize(json!({
                "class_derivations": {"Agent": {"slot_derivations": [
                    {"name": "label", "populated_from": "name"},
                    {"name": "label", "populated_from": "id"}
                ]}}
            }))
            .unwrap_err();
        assert!(matches!(err, Error::Specification { .. }));
        assert!(err.to_string().contains("duplicate name 'label' in slot_derivations"));
    }

    #[test]
    fn test_strict_primary_sources() {
        let raw = json!({
            "class_derivations": {"A": {"slot_derivations": {"s": {"populated_from": "x", "expr": "{y}"}}}}
        });
        assert!(Normalizer::new().normalize(raw.clone()).is_ok());
        assert!(Normalizer::new().strict(true).normalize(raw).is_err());
    }
}
