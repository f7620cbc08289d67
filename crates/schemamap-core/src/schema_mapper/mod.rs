//! Derivation of the target schema from a source schema and a specification
//!
//! Every class derivation yields one target class: a copy of its source class
//! stripped of slots, refilled from the slot derivations. Enum derivations
//! yield enums the same way. Inheritance is rewired last, once every target
//! class exists, by mapping each source parent to the single target class
//! derived from it.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

pub mod copy;
pub mod slots;

pub use slots::{derive_slot, source_slot};

use crate::error::{Error, Result};
use crate::spec::{ClassDerivation, EnumDerivation, TransformationSpecification};
use indexmap::{IndexMap, IndexSet};
use schemamap_schemas::merge::{merge_fill, merge_override};
use schemamap_schemas::{
    ClassDefinition, EnumDefinition, PermissibleValue, SchemaDefinition, SchemaView,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Derives target schemas against one source schema
#[derive(Debug)]
pub struct SchemaMapper<'a> {
    source: &'a SchemaView,
    source_to_target_classes: IndexMap<String, Vec<String>>,
}

impl<'a> SchemaMapper<'a> {
    pub fn new(source: &'a SchemaView) -> Self {
        Self {
            source,
            source_to_target_classes: IndexMap::new(),
        }
    }

    /// Source class name to the target classes derived from it, as recorded
    /// by the last call to [`derive_schema`](Self::derive_schema)
    pub fn source_to_target_classes(&self) -> &IndexMap<String, Vec<String>> {
        &self.source_to_target_classes
    }

    /// Derive the target schema
    pub fn derive_schema(
        &mut self,
        spec: &TransformationSpecification,
        target_id: Option<&str>,
        target_name: Option<&str>,
    ) -> Result<SchemaDefinition> {
        self.source_to_target_classes.clear();
        let mut target = self.schema_shell(spec, target_id, target_name);
        copy::apply_schema_directives(&spec.copy_directives, self.source, &mut target)?;

        let mut explicit_parents = IndexSet::new();
        let mut dictionary_keys = Vec::new();
        for cd in spec.all_class_derivations() {
            if self.is_derived(&cd.name) {
                debug!(class = %cd.name, "Class derived more than once; keeping the first");
                continue;
            }
            let class = self.derive_class(cd, &mut dictionary_keys)?;
            if cd.is_a.is_some() || !cd.mixins.is_empty() {
                explicit_parents.insert(cd.name.clone());
            }
            self.source_to_target_classes
                .entry(cd.source_class().to_string())
                .or_default()
                .push(cd.name.clone());
            target.classes.insert(cd.name.clone(), class);
        }

        for ed in spec.enum_derivations.values() {
            target.enums.insert(ed.name.clone(), self.derive_enum(ed));
        }

        self.rewire_parents(&mut target, &explicit_parents)?;

        for (class_name, key) in dictionary_keys {
            match target
                .classes
                .get_mut(&class_name)
                .and_then(|class| class.attributes.get_mut(&key))
            {
                Some(slot) => {
                    if slot.identifier != Some(true) {
                        slot.key = Some(true);
                    }
                }
                None => debug!(class = %class_name, key = %key, "Dictionary key slot not among target attributes"),
            }
        }

        debug!(
            classes = target.classes.len(),
            enums = target.enums.len(),
            "Derived target schema"
        );
        Ok(target)
    }

    fn schema_shell(
        &self,
        spec: &TransformationSpecification,
        target_id: Option<&str>,
        target_name: Option<&str>,
    ) -> SchemaDefinition {
        let src = self.source.schema();
        let base_name = src.name.clone().unwrap_or_else(|| "source".to_string());
        let mut prefixes = src.prefixes.clone();
        for (prefix, url) in &spec.prefixes {
            prefixes.insert(prefix.clone(), url.clone());
        }
        SchemaDefinition {
            id: target_id
                .map(str::to_string)
                .or_else(|| spec.target_schema.clone())
                .or_else(|| src.id.as_ref().map(|id| format!("{}-derived", id))),
            name: Some(
                target_name
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}-derived", base_name)),
            ),
            description: spec.description.clone(),
            prefixes,
            default_prefix: src.default_prefix.clone(),
            default_range: src.default_range.clone(),
            imports: src.imports.clone(),
            ..Default::default()
        }
    }

    fn derive_class(
        &self,
        cd: &ClassDerivation,
        dictionary_keys: &mut Vec<(String, String)>,
    ) -> Result<ClassDefinition> {
        let source_class = cd.source_class();
        let mut class = match self.source.get_class(source_class) {
            Some(class) => class.clone(),
            None => {
                warn!(
                    target_class = %cd.name,
                    source_class,
                    "Source class not found; deriving an empty class"
                );
                ClassDefinition::new(&cd.name)
            }
        };
        class.name = cd.name.clone();
        class.slots.clear();
        class.attributes.clear();
        class.slot_usage.clear();

        copy::apply_class_directives(&cd.copy_directives, self.source, source_class, &mut class)?;

        for sd in cd.slot_derivations.values() {
            if sd.hide {
                continue;
            }
            let slot = derive_slot(sd, self.source, source_class)?;
            if let (Some(key), Some(range)) = (&sd.dictionary_key, &slot.range) {
                dictionary_keys.push((range.clone(), key.clone()));
            }
            class.attributes.insert(sd.name.clone(), slot);
        }

        if cd.mirror_source {
            for slot in self.source.class_induced_slots(source_class) {
                if !class.attributes.contains_key(&slot.name) {
                    class.attributes.insert(slot.name.clone(), slot);
                }
            }
        }

        if let Some(is_a) = &cd.is_a {
            class.is_a = Some(is_a.clone());
        }
        if !cd.mixins.is_empty() {
            class.mixins = cd.mixins.clone();
        }
        if cd.is_a.is_some() && cd.mixins.is_empty() {
            class.mixins.clear();
        }
        if !cd.joins.is_empty() {
            debug!(class = %cd.name, joins = cd.joins.len(), "Joins are not reflected in the derived schema");
        }

        if let Some(fragment) = &cd.target_definition {
            class = merge_class(class, fragment, merge_fill)?;
        }
        if let Some(fragment) = &cd.overrides {
            class = merge_class(class, fragment, merge_override)?;
        }
        Ok(class)
    }

    fn derive_enum(&self, ed: &EnumDerivation) -> EnumDefinition {
        let source_enum = self.source.get_enum(ed.source_enum());
        let mut enum_def = source_enum.cloned().unwrap_or_default();
        enum_def.name = ed.name.clone();
        enum_def.permissible_values.clear();
        if ed.description.is_some() {
            enum_def.description = ed.description.clone();
        }

        let source_pvs = |name: &str| {
            self.source
                .get_enum(name)
                .map(|e| e.permissible_values.clone())
                .unwrap_or_default()
        };

        if ed.permissible_value_derivations.is_empty() {
            if source_enum.is_none() && ed.sources.is_empty() {
                warn!(target_enum = %ed.name, source_enum = ed.source_enum(), "Source enum not found");
            }
            for name in std::iter::once(ed.source_enum()).chain(ed.sources.iter().map(String::as_str)) {
                for (text, pv) in source_pvs(name) {
                    enum_def.permissible_values.entry(text).or_insert(pv);
                }
            }
            return enum_def;
        }

        let mut mapped = IndexSet::new();
        let all_source = source_pvs(ed.source_enum());
        for pvd in ed.permissible_value_derivations.values() {
            let origins = pvd.source_values();
            mapped.extend(origins.iter().map(|s| s.to_string()));
            if pvd.hide {
                continue;
            }
            let mut pv = origins
                .first()
                .and_then(|origin| all_source.get(*origin).cloned())
                .unwrap_or_else(|| PermissibleValue::new(&pvd.name));
            pv.text = pvd.name.clone();
            if pvd.description.is_some() {
                pv.description = pvd.description.clone();
            }
            enum_def.permissible_values.insert(pvd.name.clone(), pv);
        }
        if ed.mirror_source {
            for (text, pv) in all_source {
                if !mapped.contains(&text) {
                    enum_def.permissible_values.entry(text).or_insert(pv);
                }
            }
        }
        enum_def
    }

    fn rewire_parents(
        &self,
        target: &mut SchemaDefinition,
        explicit_parents: &IndexSet<String>,
    ) -> Result<()> {
        let names: Vec<String> = target.classes.keys().cloned().collect();
        for name in names {
            if explicit_parents.contains(&name) || !self.is_derived(&name) {
                continue;
            }
            let Some(class) = target.classes.get(&name) else {
                continue;
            };
            let is_a = match &class.is_a {
                Some(parent) => self.mapped_ancestor(parent, &name)?,
                None => None,
            };
            let mut mixins = Vec::new();
            for mixin in &class.mixins {
                if let Some(mapped) = self.mapped_ancestor(mixin, &name)? {
                    mixins.push(mapped);
                }
            }
            if let Some(class) = target.classes.get_mut(&name) {
                class.is_a = is_a;
                class.mixins = mixins;
            }
        }
        Ok(())
    }

    fn is_derived(&self, target_class: &str) -> bool {
        self.source_to_target_classes
            .values()
            .any(|targets| targets.iter().any(|t| t == target_class))
    }

    /// The target class standing in for source class `parent`, walking up
    /// the source hierarchy past parents that were not derived
    fn mapped_ancestor(&self, parent: &str, child: &str) -> Result<Option<String>> {
        let mut current = Some(parent.to_string());
        let mut seen = IndexSet::new();
        while let Some(parent) = current {
            if !seen.insert(parent.clone()) {
                break;
            }
            match self.source_to_target_classes.get(&parent).map(Vec::as_slice) {
                Some([single]) => return Ok(Some(single.clone())),
                Some(many) if many.len() > 1 => {
                    return Err(Error::specification(format!(
                        "cannot rewire parent of '{}': source class '{}' is derived into {}",
                        child,
                        parent,
                        many.join(", ")
                    )))
                }
                _ => {}
            }
            current = self.source.get_class(&parent).and_then(|c| c.is_a.clone());
        }
        Ok(None)
    }
}

fn merge_class(class: ClassDefinition, fragment: &Value, merge: fn(&mut Value, &Value)) -> Result<ClassDefinition> {
    let fragment = match fragment {
        Value::Object(map) if map.contains_key("attributes") || map.contains_key("slot_usage") => {
            // canonicalize nested attribute collections the way schemas are
            let mut classes = serde_json::Map::new();
            classes.insert(class.name.clone(), fragment.clone());
            let mut wrapped = serde_json::Map::new();
            wrapped.insert("classes".to_string(), Value::Object(classes));
            let canonical = schemamap_schemas::canonicalize_schema_value(Value::Object(wrapped))?;
            canonical["classes"][class.name.as_str()].clone()
        }
        other => other.clone(),
    };
    let mut current = serde_json::to_value(&class)?;
    merge(&mut current, &fragment);
    Ok(serde_json::from_value(current)?)
}

/// Convenience entry point for one-off derivations
pub fn derive_schema(
    spec: &TransformationSpecification,
    source: &SchemaView,
    target_id: Option<&str>,
    target_name: Option<&str>,
) -> Result<SchemaDefinition> {
    SchemaMapper::new(source).derive_schema(spec, target_id, target_name)
}
