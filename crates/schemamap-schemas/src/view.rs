//! Schema view: inheritance-aware read access to a schema
//!
//! The view answers the questions the transformation engine asks of a schema:
//! which slots does a class have once `is_a`, `mixins` and `slot_usage` are
//! resolved, what is the identifier of a class, what kind of thing does a range
//! name denote. Everything is computed on demand against the owned
//! [`SchemaDefinition`]; classes reference each other by name only, so cyclic
//! class graphs need no special handling beyond visited sets.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::builtins::{self, Primitive};
use crate::error::{SchemaError, SchemaResult};
use crate::merge::merge_override;
use crate::model::{
    canonicalize_schema_value, ClassDefinition, EnumDefinition, SchemaDefinition, SlotDefinition,
    TypeDefinition,
};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// What a range name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Class,
    Enum,
    Type(Primitive),
    Unknown,
}

/// Read access to a schema with induced-slot resolution
#[derive(Debug, Clone, Default)]
pub struct SchemaView {
    schema: SchemaDefinition,
}

impl SchemaView {
    pub fn new(schema: SchemaDefinition) -> Self {
        Self { schema }
    }

    /// Build a view from a loose JSON/YAML schema document
    pub fn from_value(value: Value) -> SchemaResult<Self> {
        Ok(Self::new(SchemaDefinition::from_value(value)?))
    }

    /// The underlying schema
    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn into_schema(self) -> SchemaDefinition {
        self.schema
    }

    pub fn all_classes(&self) -> &IndexMap<String, ClassDefinition> {
        &self.schema.classes
    }

    pub fn all_enums(&self) -> &IndexMap<String, EnumDefinition> {
        &self.schema.enums
    }

    /// Top-level slots followed by every class attribute not already listed
    pub fn all_slots(&self) -> IndexMap<String, SlotDefinition> {
        let mut slots = self.schema.slots.clone();
        for class in self.schema.classes.values() {
            for (name, attribute) in &class.attributes {
                slots.entry(name.clone()).or_insert_with(|| attribute.clone());
            }
        }
        slots
    }

    /// User types followed by the built-in types
    pub fn all_types(&self) -> IndexMap<String, TypeDefinition> {
        let mut types = self.schema.types.clone();
        for (name, _) in builtins::BUILTIN_TYPES {
            types
                .entry(name.to_string())
                .or_insert_with(|| TypeDefinition {
                    name: name.to_string(),
                    ..Default::default()
                });
        }
        types
    }

    pub fn get_class(&self, name: &str) -> Option<&ClassDefinition> {
        self.schema.classes.get(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumDefinition> {
        self.schema.enums.get(name)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.schema.types.get(name)
    }

    /// A top-level slot, or the first class attribute with this name
    pub fn get_slot(&self, name: &str) -> Option<SlotDefinition> {
        if let Some(slot) = self.schema.slots.get(name) {
            return Some(slot.clone());
        }
        self.schema
            .classes
            .values()
            .find_map(|class| class.attributes.get(name).cloned())
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.schema.classes.contains_key(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.schema.enums.contains_key(name)
    }

    /// Classify a range name
    pub fn range_kind(&self, range: &str) -> RangeKind {
        if self.is_class(range) {
            RangeKind::Class
        } else if self.is_enum(range) {
            RangeKind::Enum
        } else if let Some(primitive) = self.primitive_of(range) {
            RangeKind::Type(primitive)
        } else {
            RangeKind::Unknown
        }
    }

    /// Resolve a type name (user or built-in) to its primitive
    pub fn primitive_of(&self, type_name: &str) -> Option<Primitive> {
        let mut current = type_name.to_string();
        let mut seen = IndexSet::new();
        loop {
            if !seen.insert(current.clone()) {
                return None;
            }
            if let Some(user_type) = self.schema.types.get(&current) {
                match user_type.typeof_.as_ref().or(user_type.base.as_ref()) {
                    Some(parent) => {
                        current = parent.clone();
                        continue;
                    }
                    None => return builtins::builtin(&current),
                }
            }
            return builtins::builtin(&current);
        }
    }

    /// Direct parents of a class: `is_a` first, then mixins
    pub fn class_parents(&self, class_name: &str) -> Vec<String> {
        let Some(class) = self.get_class(class_name) else {
            return Vec::new();
        };
        class
            .is_a
            .iter()
            .chain(class.mixins.iter())
            .cloned()
            .collect()
    }

    /// The class itself followed by all of its ancestors, nearest first
    pub fn class_ancestors(&self, class_name: &str) -> Vec<String> {
        let mut visited = IndexSet::new();
        self.collect_ancestors(class_name, &mut visited);
        visited.into_iter().collect()
    }

    fn collect_ancestors(&self, class_name: &str, visited: &mut IndexSet<String>) {
        if !visited.insert(class_name.to_string()) {
            return;
        }
        for parent in self.class_parents(class_name) {
            self.collect_ancestors(&parent, visited);
        }
    }

    /// All classes that have `class_name` among their ancestors, itself included
    pub fn class_descendants(&self, class_name: &str) -> Vec<String> {
        self.schema
            .classes
            .keys()
            .filter(|candidate| {
                self.class_ancestors(candidate)
                    .iter()
                    .any(|ancestor| ancestor == class_name)
            })
            .cloned()
            .collect()
    }

    /// Report the first class whose `is_a`/`mixins` chain loops back to itself
    pub fn check_inheritance(&self) -> SchemaResult<()> {
        for class_name in self.schema.classes.keys() {
            let mut stack = Vec::new();
            if self.has_cycle(class_name, &mut stack) {
                return Err(SchemaError::CyclicInheritance {
                    class_name: class_name.clone(),
                });
            }
        }
        Ok(())
    }

    fn has_cycle(&self, class_name: &str, stack: &mut Vec<String>) -> bool {
        if stack.iter().any(|c| c == class_name) {
            return true;
        }
        stack.push(class_name.to_string());
        let cyclic = self
            .class_parents(class_name)
            .iter()
            .any(|parent| self.has_cycle(parent, stack));
        stack.pop();
        cyclic
    }

    /// Names of the slots a class has once inheritance is applied
    pub fn class_slot_names(&self, class_name: &str) -> Vec<String> {
        let mut names = IndexSet::new();
        for ancestor in self.class_ancestors(class_name) {
            if let Some(class) = self.get_class(&ancestor) {
                names.extend(class.slots.iter().cloned());
                names.extend(class.attributes.keys().cloned());
            }
        }
        names.into_iter().collect()
    }

    /// The effective slot definitions of a class
    pub fn class_induced_slots(&self, class_name: &str) -> Vec<SlotDefinition> {
        self.class_slot_names(class_name)
            .iter()
            .filter_map(|slot_name| self.induced_slot(slot_name, class_name))
            .collect()
    }

    /// The effective definition of `slot_name` in the context of `class_name`
    ///
    /// The base definition is the nearest class attribute, else the top-level
    /// slot. Slot-level `is_a`/`mixins` fill unset fields, then `slot_usage` is
    /// applied from the farthest ancestor to the class itself. An unset range
    /// falls back to the schema `default_range`, then `string`.
    pub fn induced_slot(&self, slot_name: &str, class_name: &str) -> Option<SlotDefinition> {
        let ancestors = self.class_ancestors(class_name);
        let mut induced = ancestors
            .iter()
            .filter_map(|ancestor| self.get_class(ancestor))
            .find_map(|class| class.attributes.get(slot_name).cloned())
            .or_else(|| self.schema.slots.get(slot_name).cloned())
            .or_else(|| {
                if self.is_class(class_name) {
                    None
                } else {
                    self.get_slot(slot_name)
                }
            })?;

        for parent in self.slot_ancestors(&induced).iter().skip(1) {
            if let Some(parent_def) = self.schema.slots.get(parent) {
                induced.fill_from(parent_def);
            }
        }

        for ancestor in ancestors.iter().rev() {
            if let Some(usage) = self
                .get_class(ancestor)
                .and_then(|class| class.slot_usage.get(slot_name))
            {
                induced.apply_usage(usage);
            }
        }

        induced.name = slot_name.to_string();
        if induced.range.is_none() {
            induced.range = Some(self.default_range());
        }
        Some(induced)
    }

    fn slot_ancestors(&self, slot: &SlotDefinition) -> Vec<String> {
        let mut visited = IndexSet::new();
        visited.insert(slot.name.clone());
        let mut queue: Vec<String> = slot.is_a.iter().chain(slot.mixins.iter()).cloned().collect();
        while let Some(next) = queue.pop() {
            if visited.insert(next.clone()) {
                if let Some(def) = self.schema.slots.get(&next) {
                    queue.extend(def.is_a.iter().chain(def.mixins.iter()).cloned());
                }
            }
        }
        visited.into_iter().collect()
    }

    /// The schema default range, `string` when unset
    pub fn default_range(&self) -> String {
        self.schema
            .default_range
            .clone()
            .unwrap_or_else(|| "string".to_string())
    }

    /// The identifier slot of a class, falling back to a key slot when `use_key`
    pub fn get_identifier_slot(&self, class_name: &str, use_key: bool) -> Option<SlotDefinition> {
        let slots = self.class_induced_slots(class_name);
        if let Some(identifier) = slots.iter().find(|s| s.is_identifier()) {
            return Some(identifier.clone());
        }
        if use_key {
            return slots.into_iter().find(|s| s.is_key());
        }
        None
    }

    /// Whether values of this slot are nested objects rather than references
    pub fn is_inlined(&self, slot: &SlotDefinition) -> bool {
        if slot.inlined == Some(true) || slot.inlined_as_list == Some(true) {
            return true;
        }
        if slot.inlined == Some(false) {
            return false;
        }
        match slot.range.as_deref() {
            Some(range) if self.is_class(range) => {
                self.get_identifier_slot(range, true).is_none()
            }
            _ => false,
        }
    }

    /// Expand `prefix:local` using the schema prefixes
    pub fn expand_curie(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        self.schema
            .prefixes
            .get(prefix)
            .map(|base| format!("{}{}", base, local))
    }

    /// Compress a URI to a CURIE using the longest matching prefix expansion
    pub fn compress_uri(&self, uri: &str) -> Option<String> {
        self.schema
            .prefixes
            .iter()
            .filter(|(_, base)| !base.is_empty() && uri.starts_with(base.as_str()))
            .max_by_key(|(_, base)| base.len())
            .map(|(prefix, base)| format!("{}:{}", prefix, &uri[base.len()..]))
    }

    /// Merge a partial schema into this one; the patch wins on conflicts
    pub fn merge_patch(&mut self, patch: &Value) -> SchemaResult<()> {
        if patch.is_null() {
            return Ok(());
        }
        let patch = canonicalize_schema_value(patch.clone())?;
        let mut current = self.schema.to_value()?;
        merge_override(&mut current, &patch);
        self.schema = serde_json::from_value(current)?;
        tracing::debug!(
            schema = self.schema.name.as_deref().unwrap_or("<unnamed>"),
            "Applied schema patch"
        );
        Ok(())
    }

    /// Merge the elements of an imported schema; existing elements win
    pub fn absorb_import(&mut self, imported: SchemaDefinition) {
        for (k, v) in imported.prefixes {
            self.schema.prefixes.entry(k).or_insert(v);
        }
        for (k, v) in imported.classes {
            self.schema.classes.entry(k).or_insert(v);
        }
        for (k, v) in imported.slots {
            self.schema.slots.entry(k).or_insert(v);
        }
        for (k, v) in imported.enums {
            self.schema.enums.entry(k).or_insert(v);
        }
        for (k, v) in imported.types {
            self.schema.types.entry(k).or_insert(v);
        }
        if self.schema.default_range.is_none() {
            self.schema.default_range = imported.default_range;
        }
    }

    /// Require a class to exist
    pub fn require_class(&self, name: &str) -> SchemaResult<&ClassDefinition> {
        self.get_class(name)
            .ok_or_else(|| SchemaError::unknown("class", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> SchemaView {
        SchemaView::from_value(json!({
            "name": "test",
            "prefixes": {"ex": "https://example.org/", "exv": "https://example.org/vocab/"},
            "slots": {
                "id": {"identifier": true},
                "name": {"range": "string"},
                "aliases": {"multivalued": true}
            },
            "types": {"Age": {"typeof": "integer"}},
            "classes": {
                "Thing": {"slots": ["id", "name"]},
                "Person": {
                    "is_a": "Thing",
                    "slots": ["aliases"],
                    "attributes": {"age": {"range": "Age"}},
                    "slot_usage": {"name": {"required": true}}
                },
                "Note": {"attributes": {"text": null}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_induced_slots_include_inherited() {
        let view = view();
        let names = view.class_slot_names("Person");
        assert_eq!(names, vec!["aliases", "age", "id", "name"]);
        let name = view.induced_slot("name", "Person").unwrap();
        assert_eq!(name.required, Some(true));
        assert!(view.induced_slot("name", "Thing").unwrap().required.is_none());
    }

    #[test]
    fn test_default_range_applied() {
        let view = view();
        let text = view.induced_slot("text", "Note").unwrap();
        assert_eq!(text.range.as_deref(), Some("string"));
    }

    #[test]
    fn test_identifier_inherited() {
        let view = view();
        let id = view.get_identifier_slot("Person", true).unwrap();
        assert_eq!(id.name, "id");
        assert!(view.get_identifier_slot("Note", true).is_none());
    }

    #[test]
    fn test_range_kinds() {
        let view = view();
        assert_eq!(view.range_kind("Person"), RangeKind::Class);
        assert_eq!(view.range_kind("Age"), RangeKind::Type(Primitive::Integer));
        assert_eq!(view.range_kind("Nope"), RangeKind::Unknown);
    }

    #[test]
    fn test_curie_round_trip() {
        let view = view();
        assert_eq!(
            view.expand_curie("exv:color").as_deref(),
            Some("https://example.org/vocab/color")
        );
        assert_eq!(
            view.compress_uri("https://example.org/vocab/color").as_deref(),
            Some("exv:color")
        );
        assert_eq!(view.expand_curie("http://example.org/x"), None);
    }

    #[test]
    fn test_merge_patch_sets_range() {
        let mut view = view();
        view.merge_patch(&json!({"classes": {"Note": {"attributes": {"author": {"range": "Person"}}}}}))
            .unwrap();
        let author = view.induced_slot("author", "Note").unwrap();
        assert_eq!(author.range.as_deref(), Some("Person"));
        assert!(view.induced_slot("text", "Note").is_some());
    }

    #[test]
    fn test_cycle_detection() {
        let view = SchemaView::from_value(json!({
            "classes": {"A": {"is_a": "B"}, "B": {"is_a": "A"}}
        }))
        .unwrap();
        assert!(matches!(
            view.check_inheritance(),
            Err(SchemaError::CyclicInheritance { .. })
        ));
        assert_eq!(view.class_ancestors("A"), vec!["A", "B"]);
    }

    #[test]
    fn test_descendants() {
        let view = view();
        assert_eq!(view.class_descendants("Thing"), vec!["Thing", "Person"]);
    }
}
