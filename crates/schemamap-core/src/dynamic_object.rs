//! Schema-aware attribute access over nested JSON objects
//!
//! A [`DynamicObject`] pairs a JSON mapping with the class it instantiates, so
//! that reading an attribute can look at the induced slot and decide whether
//! the value is a nested object, a collection of objects or a plain value.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use indexmap::IndexMap;
use schemamap_schemas::{RangeKind, SchemaView, SlotDefinition};
use serde_json::Value;

/// A JSON object viewed as an instance of a schema class
#[derive(Debug, Clone, Copy)]
pub struct DynamicObject<'a> {
    value: &'a Value,
    class_name: &'a str,
    view: &'a SchemaView,
}

/// The result of reading an attribute of a [`DynamicObject`]
#[derive(Debug, Clone)]
pub enum DynValue<'a> {
    /// Primitive, enum or reference value, returned as-is
    Scalar(&'a Value),
    /// An inlined object of a class range
    Object(DynamicObject<'a>),
    /// A multivalued slot given as a list
    List(Vec<DynValue<'a>>),
    /// A multivalued slot given as a compact dict keyed by identifier
    Dict(IndexMap<String, DynValue<'a>>),
}

impl<'a> DynamicObject<'a> {
    pub fn new(value: &'a Value, class_name: &'a str, view: &'a SchemaView) -> Self {
        Self {
            value,
            class_name,
            view,
        }
    }

    pub fn class_name(&self) -> &'a str {
        self.class_name
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn view(&self) -> &'a SchemaView {
        self.view
    }

    /// Names of the attributes present on the underlying object
    pub fn keys(&self) -> impl Iterator<Item = &'a str> {
        self.value
            .as_object()
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    /// Read an attribute; absent attributes yield `None`
    pub fn get(&self, attr: &str) -> Option<DynValue<'a>> {
        let raw = self.value.get(attr)?;
        if raw.is_null() {
            return None;
        }
        let slot = self.view.induced_slot(attr, self.class_name);
        Some(self.wrap(raw, slot.as_ref()))
    }

    fn wrap(&self, raw: &'a Value, slot: Option<&SlotDefinition>) -> DynValue<'a> {
        let Some(slot) = slot else {
            return DynValue::Scalar(raw);
        };
        let Some(range) = self.class_range(slot) else {
            return DynValue::Scalar(raw);
        };

        match raw {
            Value::Array(items) => DynValue::List(
                items
                    .iter()
                    .map(|item| self.wrap_single(item, range))
                    .collect(),
            ),
            Value::Object(map) if slot.is_multivalued() => DynValue::Dict(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.wrap_single(item, range)))
                    .collect(),
            ),
            other => self.wrap_single(other, range),
        }
    }

    fn wrap_single(&self, raw: &'a Value, range: &'a str) -> DynValue<'a> {
        match raw {
            Value::Object(_) => DynValue::Object(DynamicObject::new(raw, range, self.view)),
            other => DynValue::Scalar(other),
        }
    }

    /// The class name of a slot's range, when it is a class of this schema
    fn class_range(&self, slot: &SlotDefinition) -> Option<&'a str> {
        let range = slot.range.as_deref()?;
        if self.view.range_kind(range) != RangeKind::Class {
            return None;
        }
        self.view
            .all_classes()
            .get_key_value(range)
            .map(|(name, _)| name.as_str())
    }
}

impl<'a> DynValue<'a> {
    /// The JSON this value was read from
    pub fn to_json(&self) -> Value {
        match self {
            DynValue::Scalar(value) => (*value).clone(),
            DynValue::Object(object) => object.value().clone(),
            DynValue::List(items) => Value::Array(items.iter().map(DynValue::to_json).collect()),
            DynValue::Dict(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), item.to_json()))
                    .collect(),
            ),
        }
    }
}
