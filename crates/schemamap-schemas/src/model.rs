//! Schema metamodel: schemas, classes, slots, enums and types
//!
//! The structures mirror the subset of the schema language that the
//! transformation engine needs. Anything the engine does not interpret is
//! preserved in the `extra` maps so that derived schemas round-trip metadata
//! such as annotations, mappings and comments.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{SchemaError, SchemaResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn is_false(b: &bool) -> bool {
    !*b
}

/// A complete schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub prefixes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_range: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub classes: IndexMap<String, ClassDefinition>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub slots: IndexMap<String, SlotDefinition>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub enums: IndexMap<String, EnumDefinition>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub types: IndexMap<String, TypeDefinition>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// A class and its slots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_a: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, SlotDefinition>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub slot_usage: IndexMap<String, SlotDefinition>,
    #[serde(skip_serializing_if = "is_false")]
    pub tree_root: bool,
    #[serde(rename = "abstract", skip_serializing_if = "is_false")]
    pub abstract_: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub mixin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_uri: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ClassDefinition {
    /// Create an empty class with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A slot (attribute) definition
///
/// Boolean metaslots are optional so that slot usage and derivation
/// overrides can distinguish "unset" from "explicitly false".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multivalued: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inlined: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inlined_as_list: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designates_type: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitOfMeasure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_a: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_uri: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl SlotDefinition {
    /// Create an empty slot with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_multivalued(&self) -> bool {
        self.multivalued.unwrap_or(false)
    }

    pub fn is_identifier(&self) -> bool {
        self.identifier.unwrap_or(false)
    }

    pub fn is_key(&self) -> bool {
        self.key.unwrap_or(false)
    }

    /// Fill every unset field of `self` from `other`
    pub fn fill_from(&mut self, other: &SlotDefinition) {
        macro_rules! fill {
            ($($field:ident),*) => {
                $(if self.$field.is_none() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        fill!(
            description,
            range,
            multivalued,
            inlined,
            inlined_as_list,
            identifier,
            key,
            required,
            designates_type,
            unit,
            slot_uri
        );
        for (k, v) in &other.extra {
            self.extra.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    /// Overwrite fields of `self` with every field set in `other`
    pub fn apply_usage(&mut self, usage: &SlotDefinition) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if usage.$field.is_some() {
                    self.$field = usage.$field.clone();
                })*
            };
        }
        set!(
            description,
            range,
            multivalued,
            inlined,
            inlined_as_list,
            identifier,
            key,
            required,
            designates_type,
            unit,
            slot_uri
        );
        for (k, v) in &usage.extra {
            self.extra.insert(k.clone(), v.clone());
        }
    }
}

/// Unit metadata attached to a slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitOfMeasure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptive_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ucum_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iec61360code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exact_mappings: Vec<String>,
}

impl UnitOfMeasure {
    /// A unit carrying only a UCUM code
    pub fn ucum(code: impl Into<String>) -> Self {
        Self {
            ucum_code: Some(code.into()),
            ..Default::default()
        }
    }

    /// The most specific unit code available, in lookup preference order
    pub fn preferred_code(&self) -> Option<&str> {
        self.ucum_code
            .as_deref()
            .or(self.iec61360code.as_deref())
            .or(self.symbol.as_deref())
            .or(self.abbreviation.as_deref())
            .or(self.descriptive_name.as_deref())
    }
}

/// An enumeration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_uri: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub permissible_values: IndexMap<String, PermissibleValue>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl EnumDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A single permissible value of an enumeration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissibleValue {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl PermissibleValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A user-declared type, usually a restriction of a built-in type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(rename = "typeof", skip_serializing_if = "Option::is_none")]
    pub typeof_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl SchemaDefinition {
    /// Build a schema from a loosely-shaped JSON value
    ///
    /// See [`canonicalize_schema_value`] for the accepted loose forms.
    pub fn from_value(value: Value) -> SchemaResult<Self> {
        let canonical = canonicalize_schema_value(value)?;
        Ok(serde_json::from_value(canonical)?)
    }

    /// Serialize back to a JSON value
    pub fn to_value(&self) -> SchemaResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Canonicalize the loose wire forms of a schema document
///
/// - element collections given as lists become maps keyed by name
/// - `None` entries become empty definitions and receive their key as name
/// - prefixes given as `{prefix_prefix, prefix_reference}` become plain URLs
/// - permissible values given as a list of strings become a keyed map
/// - scalar `imports`, `mixins` and `slots` become one-element lists
pub fn canonicalize_schema_value(value: Value) -> SchemaResult<Value> {
    let mut obj = match value {
        Value::Null => Map::new(),
        Value::Object(obj) => obj,
        other => {
            return Err(SchemaError::malformed(format!(
                "schema root must be a mapping, found {}",
                type_name(&other)
            )))
        }
    };

    if let Some(prefixes) = obj.remove("prefixes") {
        obj.insert("prefixes".to_string(), canonicalize_prefixes(prefixes)?);
    }
    scalar_to_list(&mut obj, "imports");

    for (collection, name_key) in [
        ("classes", "name"),
        ("slots", "name"),
        ("enums", "name"),
        ("types", "name"),
    ] {
        if let Some(raw) = obj.remove(collection) {
            let mut keyed = keyed_collection(raw, name_key, collection)?;
            for (_, element) in keyed.iter_mut() {
                if let Value::Object(element) = element {
                    match collection {
                        "classes" => canonicalize_class(element)?,
                        "enums" => canonicalize_enum(element)?,
                        "slots" => scalar_to_list(element, "mixins"),
                        _ => {}
                    }
                }
            }
            obj.insert(collection.to_string(), Value::Object(keyed));
        }
    }

    Ok(Value::Object(obj))
}

fn canonicalize_class(class: &mut Map<String, Value>) -> SchemaResult<()> {
    scalar_to_list(class, "mixins");
    scalar_to_list(class, "slots");
    for collection in ["attributes", "slot_usage"] {
        if let Some(raw) = class.remove(collection) {
            let mut keyed = keyed_collection(raw, "name", collection)?;
            for (_, slot) in keyed.iter_mut() {
                if let Value::Object(slot) = slot {
                    scalar_to_list(slot, "mixins");
                }
            }
            class.insert(collection.to_string(), Value::Object(keyed));
        }
    }
    Ok(())
}

fn canonicalize_enum(enum_def: &mut Map<String, Value>) -> SchemaResult<()> {
    if let Some(raw) = enum_def.remove("permissible_values") {
        let keyed = keyed_collection(raw, "text", "permissible_values")?;
        enum_def.insert("permissible_values".to_string(), Value::Object(keyed));
    }
    Ok(())
}

fn canonicalize_prefixes(raw: Value) -> SchemaResult<Value> {
    let mut out = Map::new();
    match raw {
        Value::Null => {}
        Value::Object(map) => {
            for (prefix, expansion) in map {
                match expansion {
                    Value::String(url) => {
                        out.insert(prefix, Value::String(url));
                    }
                    Value::Object(inner) => {
                        if let Some(url) = inner.get("prefix_reference").and_then(Value::as_str) {
                            out.insert(prefix, Value::String(url.to_string()));
                        }
                    }
                    other => {
                        return Err(SchemaError::malformed(format!(
                            "prefix '{}' must map to a URL, found {}",
                            prefix,
                            type_name(&other)
                        )))
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let prefix = item.get("prefix_prefix").and_then(Value::as_str);
                let url = item.get("prefix_reference").and_then(Value::as_str);
                if let (Some(prefix), Some(url)) = (prefix, url) {
                    out.insert(prefix.to_string(), Value::String(url.to_string()));
                }
            }
        }
        other => {
            return Err(SchemaError::malformed(format!(
                "prefixes must be a mapping, found {}",
                type_name(&other)
            )))
        }
    }
    Ok(Value::Object(out))
}

/// Turn a list-or-map element collection into a map keyed by `name_key`,
/// injecting the key into each element.
pub fn keyed_collection(raw: Value, name_key: &str, what: &str) -> SchemaResult<Map<String, Value>> {
    let mut out = Map::new();
    match raw {
        Value::Null => {}
        Value::Object(map) => {
            for (key, element) in map {
                let element = keyed_element(element, name_key, &key, what)?;
                out.insert(key, element);
            }
        }
        Value::Array(items) => {
            for item in items {
                let item = unwrap_compact_item(item, name_key);
                let key = match &item {
                    Value::String(s) => s.clone(),
                    Value::Object(o) => match o.get(name_key).and_then(Value::as_str) {
                        Some(name) => name.to_string(),
                        None => {
                            return Err(SchemaError::malformed(format!(
                                "{} entry without '{}': {}",
                                what, name_key, item
                            )))
                        }
                    },
                    other => {
                        return Err(SchemaError::malformed(format!(
                            "{} entry must be a mapping or a name, found {}",
                            what,
                            type_name(other)
                        )))
                    }
                };
                let element = match item {
                    Value::String(_) => Value::Null,
                    other => other,
                };
                let element = keyed_element(element, name_key, &key, what)?;
                if out.insert(key.clone(), element).is_some() {
                    return Err(SchemaError::malformed(format!(
                        "duplicate {} '{}' in {}",
                        name_key, key, what
                    )));
                }
            }
        }
        other => {
            return Err(SchemaError::malformed(format!(
                "{} must be a mapping or a list, found {}",
                what,
                type_name(&other)
            )))
        }
    }
    Ok(out)
}

/// Unwrap the compact list form `- Person: {...}` into `{name: Person, ...}`
fn unwrap_compact_item(item: Value, name_key: &str) -> Value {
    match item {
        Value::Object(obj) if obj.len() == 1 && !obj.contains_key(name_key) => {
            let is_compact = obj
                .values()
                .next()
                .map(|v| v.is_object() || v.is_null())
                .unwrap_or(false);
            if !is_compact {
                return Value::Object(obj);
            }
            let Some((key, inner)) = obj.into_iter().next() else {
                return Value::Null;
            };
            let mut unwrapped = match inner {
                Value::Object(inner) => inner,
                _ => Map::new(),
            };
            unwrapped.insert(name_key.to_string(), Value::String(key));
            Value::Object(unwrapped)
        }
        other => other,
    }
}

fn keyed_element(element: Value, name_key: &str, key: &str, what: &str) -> SchemaResult<Value> {
    let mut obj = match element {
        Value::Null => Map::new(),
        Value::Object(obj) => obj,
        // `description`-only shorthand used by permissible values
        Value::String(s) if name_key == "text" => {
            let mut obj = Map::new();
            obj.insert("description".to_string(), Value::String(s));
            obj
        }
        other => {
            return Err(SchemaError::malformed(format!(
                "{} '{}' must be a mapping, found {}",
                what,
                key,
                type_name(&other)
            )))
        }
    };
    obj.entry(name_key.to_string())
        .or_insert_with(|| Value::String(key.to_string()));
    Ok(Value::Object(obj))
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

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
