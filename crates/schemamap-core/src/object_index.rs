//! Index of identified objects for following foreign-key references
//!
//! The index maps `(class, identifier)` pairs to the objects found while
//! walking a container. Objects are handed to the evaluator as [`Proxy`]
//! values: reading a class-ranged attribute that holds an identifier looks the
//! identifier up and yields a proxy for the referenced object, or a stub when
//! the reference dangles.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::dynamic_object::{DynValue, DynamicObject};
use crate::expr::{Datum, Proxy};
use schemamap_schemas::{RangeKind, SchemaView};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

type IndexKey = (String, String);

/// `(class, identifier) → object` table with lazy proxies
#[derive(Debug)]
pub struct ObjectIndex {
    view: Arc<SchemaView>,
    objects: HashMap<IndexKey, Arc<Value>>,
    proxy_object_cache: RefCell<HashMap<IndexKey, Proxy>>,
    source_object_cache: RefCell<HashMap<(String, String, String), Datum>>,
}

/// String form of an identifier value
pub fn identifier_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl ObjectIndex {
    /// An empty index over a schema
    pub fn new(view: Arc<SchemaView>) -> Self {
        Self {
            view,
            objects: HashMap::new(),
            proxy_object_cache: RefCell::new(HashMap::new()),
            source_object_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Build an index by walking `root` as an instance of `class_name`
    pub fn build(view: Arc<SchemaView>, root: &Value, class_name: &str) -> Self {
        let mut index = Self::new(view);
        index.index(root, class_name);
        index
    }

    pub fn view(&self) -> &SchemaView {
        &self.view
    }

    /// Number of `(class, id)` entries, ancestors included
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Add every identified object reachable from `root`
    pub fn index(&mut self, root: &Value, class_name: &str) {
        let view = Arc::clone(&self.view);
        let before = self.objects.len();
        let root = DynamicObject::new(root, class_name, &view);
        walk(&mut self.objects, &view, root, None);
        self.clear_proxy_object_cache();
        debug!(
            class_name,
            added = self.objects.len() - before,
            total = self.objects.len(),
            "Indexed objects"
        );
    }

    /// Drop cached proxies and resolved paths
    pub fn clear_proxy_object_cache(&self) {
        self.proxy_object_cache.borrow_mut().clear();
        self.source_object_cache.borrow_mut().clear();
    }

    /// The indexed object of a class with the given identifier
    pub fn lookup(&self, class_name: &str, id: &Value) -> Option<Arc<Value>> {
        let id = identifier_key(id)?;
        self.objects
            .get(&(class_name.to_string(), id))
            .cloned()
    }

    /// Wrap an object in a proxy
    ///
    /// Objects with an identifier are cached per `(class, id)` until the cache
    /// is cleared; objects without one are always wrapped afresh.
    pub fn bless(&self, value: &Value, class_name: &str) -> Proxy {
        let key = self.cache_key(value, class_name);
        if let Some(key) = &key {
            if let Some(proxy) = self.proxy_object_cache.borrow().get(key) {
                return proxy.clone();
            }
        }
        let proxy = Proxy::Resolved {
            class_name: class_name.to_string(),
            object: Arc::new(value.clone()),
        };
        if let Some(key) = key {
            self.proxy_object_cache.borrow_mut().insert(key, proxy.clone());
        }
        proxy
    }

    fn cache_key(&self, value: &Value, class_name: &str) -> Option<IndexKey> {
        let id_slot = self.view.get_identifier_slot(class_name, true)?;
        let id = value.get(&id_slot.name).and_then(identifier_key)?;
        Some((class_name.to_string(), id))
    }

    /// Proxy for a reference: the indexed object, or a stub when it dangles
    pub fn dereference(&self, class_name: &str, id: &Value) -> Proxy {
        match self.lookup(class_name, id) {
            Some(object) => self.bless(&object, class_name),
            None => {
                trace!(class_name, id = %id, "Dangling reference");
                Proxy::Stub {
                    class_name: class_name.to_string(),
                    id: id.clone(),
                }
            }
        }
    }

    /// Read an attribute of a proxy, following references through the index
    pub fn resolve_attribute(&self, proxy: &Proxy, attr: &str) -> Datum {
        match proxy {
            Proxy::Stub { class_name, id } => {
                let is_id = self
                    .view
                    .get_identifier_slot(class_name, true)
                    .is_some_and(|slot| slot.name == attr);
                if is_id {
                    Datum::from_json(id)
                } else {
                    Datum::Null
                }
            }
            Proxy::Resolved { class_name, object } => match object.get(attr) {
                Some(raw) => self.resolve_value(raw, attr, class_name),
                None => Datum::Null,
            },
        }
    }

    /// Interpret the raw value of `attr` on an instance of `class_name`
    pub fn resolve_value(&self, raw: &Value, attr: &str, class_name: &str) -> Datum {
        let Some(slot) = self.view.induced_slot(attr, class_name) else {
            return Datum::from_json(raw);
        };
        let range = match slot.range.as_deref() {
            Some(range) if self.view.range_kind(range) == RangeKind::Class => range,
            _ => return Datum::from_json(raw),
        };
        match raw {
            Value::Array(items) => {
                Datum::List(items.iter().map(|item| self.resolve_single(item, range)).collect())
            }
            Value::Object(map) if slot.is_multivalued() => {
                let id_slot = self.view.get_identifier_slot(range, true);
                Datum::Map(
                    map.iter()
                        .map(|(key, item)| {
                            let resolved = match (item, &id_slot) {
                                (Value::Object(inner), Some(id_slot)) => {
                                    let mut inner = inner.clone();
                                    inner
                                        .entry(id_slot.name.clone())
                                        .or_insert_with(|| Value::String(key.clone()));
                                    Datum::Object(self.bless(&Value::Object(inner), range))
                                }
                                _ => self.resolve_single(item, range),
                            };
                            (key.clone(), resolved)
                        })
                        .collect(),
                )
            }
            other => self.resolve_single(other, range),
        }
    }

    fn resolve_single(&self, raw: &Value, range: &str) -> Datum {
        match raw {
            Value::Null => Datum::Null,
            Value::Object(_) => Datum::Object(self.bless(raw, range)),
            Value::String(_) | Value::Number(_) if !self.objects.is_empty() => {
                Datum::Object(self.dereference(range, raw))
            }
            other => Datum::from_json(other),
        }
    }

    /// Follow a dot-path such as `employer.name` from a proxy
    pub fn eval_path(&self, proxy: &Proxy, path: &str) -> Datum {
        let cache_key = match proxy {
            Proxy::Resolved { class_name, object } => self
                .cache_key(object, class_name)
                .map(|(class_name, id)| (class_name, id, path.to_string())),
            Proxy::Stub { .. } => None,
        };
        if let Some(key) = &cache_key {
            if let Some(cached) = self.source_object_cache.borrow().get(key) {
                return cached.clone();
            }
        }

        let mut current = Datum::Object(proxy.clone());
        for segment in path.split('.') {
            current = self.step(current, segment);
        }

        if let Some(key) = cache_key {
            self.source_object_cache
                .borrow_mut()
                .insert(key, current.clone());
        }
        current
    }

    fn step(&self, current: Datum, segment: &str) -> Datum {
        match current {
            Datum::Object(proxy) => self.resolve_attribute(&proxy, segment),
            Datum::List(items) => Datum::List(
                items
                    .into_iter()
                    .map(|item| self.step(item, segment))
                    .collect(),
            ),
            Datum::Map(mut map) => map.swap_remove(segment).unwrap_or(Datum::Null),
            _ => Datum::Null,
        }
    }
}

fn walk(
    objects: &mut HashMap<IndexKey, Arc<Value>>,
    view: &SchemaView,
    object: DynamicObject<'_>,
    key_hint: Option<&str>,
) {
    let class_name = object.class_name();
    if let Some(id_slot) = view.get_identifier_slot(class_name, true) {
        let id = object
            .value()
            .get(&id_slot.name)
            .and_then(identifier_key)
            .or_else(|| key_hint.map(str::to_string));
        if let Some(id) = id {
            let mut stored = object.value().clone();
            if let Value::Object(map) = &mut stored {
                map.entry(id_slot.name.clone())
                    .or_insert_with(|| Value::String(id.clone()));
            }
            let stored = Arc::new(stored);
            for ancestor in view.class_ancestors(class_name) {
                objects
                    .entry((ancestor, id.clone()))
                    .or_insert_with(|| Arc::clone(&stored));
            }
        }
    }

    for attr in object.keys() {
        match object.get(attr) {
            Some(DynValue::Object(child)) => walk(objects, view, child, None),
            Some(DynValue::List(items)) => {
                for item in items {
                    if let DynValue::Object(child) = item {
                        walk(objects, view, child, None);
                    }
                }
            }
            Some(DynValue::Dict(entries)) => {
                for (key, item) in entries {
                    if let DynValue::Object(child) = item {
                        walk(objects, view, child, Some(key.as_str()));
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> Arc<SchemaView> {
        Arc::new(
            SchemaView::from_value(json!({
                "name": "org",
                "classes": {
                    "Container": {"attributes": {
                        "persons": {"range": "Person", "multivalued": true, "inlined_as_list": true},
                        "organizations": {"range": "Organization", "multivalued": true, "inlined": true}
                    }},
                    "NamedThing": {"attributes": {"id": {"identifier": true}, "name": {}}},
                    "Person": {"is_a": "NamedThing", "attributes": {
                        "employer": {"range": "Organization"}
                    }},
                    "Organization": {"is_a": "NamedThing"}
                }
            }))
            .unwrap(),
        )
    }

    fn container() -> Value {
        json!({
            "persons": [
                {"id": "P1", "name": "Ann", "employer": "O1"},
                {"id": "P2", "name": "Bob", "employer": "O9"}
            ],
            "organizations": {"O1": {"name": "Acme"}}
        })
    }

    #[test]
    fn test_index_includes_ancestors_and_dict_keys() {
        let index = ObjectIndex::build(view(), &container(), "Container");
        assert!(index.lookup("Person", &json!("P1")).is_some());
        assert!(index.lookup("NamedThing", &json!("P1")).is_some());
        let acme = index.lookup("Organization", &json!("O1")).unwrap();
        assert_eq!(acme["id"], json!("O1"));
        assert!(index.lookup("Organization", &json!("P1")).is_none());
    }

    #[test]
    fn test_dot_path_follows_references() {
        let index = ObjectIndex::build(view(), &container(), "Container");
        let ann = index.lookup("Person", &json!("P1")).unwrap();
        let proxy = index.bless(&ann, "Person");
        assert_eq!(index.eval_path(&proxy, "employer.name"), Datum::from("Acme"));
        assert_eq!(index.eval_path(&proxy, "employer.id"), Datum::from("O1"));
    }

    #[test]
    fn test_dangling_reference_yields_stub() {
        let index = ObjectIndex::build(view(), &container(), "Container");
        let bob = index.lookup("Person", &json!("P2")).unwrap();
        let proxy = index.bless(&bob, "Person");
        match index.resolve_attribute(&proxy, "employer") {
            Datum::Object(Proxy::Stub { id, .. }) => assert_eq!(id, json!("O9")),
            other => panic!("expected stub, got {:?}", other),
        }
        assert_eq!(index.eval_path(&proxy, "employer.name"), Datum::Null);
        assert_eq!(index.eval_path(&proxy, "employer.id"), Datum::from("O9"));
    }

    #[test]
    fn test_bless_cache_is_cleared() {
        let index = ObjectIndex::new(view());
        let first = index.bless(&json!({"id": "P1", "name": "Ann"}), "Person");
        let cached = index.bless(&json!({"id": "P1", "name": "Changed"}), "Person");
        assert_eq!(first, cached);

        index.clear_proxy_object_cache();
        let fresh = index.bless(&json!({"id": "P1", "name": "Changed"}), "Person");
        assert_eq!(fresh.to_json()["name"], json!("Changed"));
    }

    #[test]
    fn test_unindexed_references_stay_scalar() {
        let index = ObjectIndex::new(view());
        let proxy = index.bless(&json!({"id": "P1", "employer": "O1"}), "Person");
        assert_eq!(index.resolve_attribute(&proxy, "employer"), Datum::from("O1"));
    }
}
