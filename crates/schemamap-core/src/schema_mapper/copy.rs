//! Copy directives: bulk copying of source schema elements
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::Result;
use crate::spec::CopyDirective;
use indexmap::IndexMap;
use schemamap_schemas::merge::merge_override;
use schemamap_schemas::{ClassDefinition, SchemaDefinition, SchemaView, SlotDefinition};
use serde_json::Value;
use tracing::warn;

/// Wildcard element name for schema-wide directives
pub const ALL_ELEMENTS: &str = "*";

/// Apply schema-level directives, in declaration order
pub fn apply_schema_directives(
    directives: &IndexMap<String, CopyDirective>,
    source: &SchemaView,
    target: &mut SchemaDefinition,
) -> Result<()> {
    for directive in directives.values() {
        apply_schema_directive(directive, source, target)?;
    }
    Ok(())
}

fn apply_schema_directive(
    directive: &CopyDirective,
    source: &SchemaView,
    target: &mut SchemaDefinition,
) -> Result<()> {
    let name = directive.element_name.as_str();
    let whole_schema = name == ALL_ELEMENTS || source.schema().name.as_deref() == Some(name);

    if !whole_schema {
        // a single element: copy_all or include copies it as-is
        if directive.copy_all || !directive.include.is_empty() {
            if !copy_element(name, source, target) {
                warn!(element = name, "Copy directive names an unknown source element");
            }
        }
        return add_fragment(directive, target);
    }

    let src = source.schema();
    if directive.copy_all {
        for name in src.classes.keys().chain(src.enums.keys()) {
            copy_element(name, source, target);
        }
        for (name, slot) in &src.slots {
            target.slots.entry(name.clone()).or_insert_with(|| slot.clone());
        }
        for (name, ty) in &src.types {
            target.types.entry(name.clone()).or_insert_with(|| ty.clone());
        }
    }
    for name in &directive.exclude {
        target.classes.shift_remove(name);
        target.enums.shift_remove(name);
        target.slots.shift_remove(name);
        target.types.shift_remove(name);
    }
    if directive.exclude_all {
        target.classes.clear();
        target.enums.clear();
        target.slots.clear();
        target.types.clear();
    }
    for name in &directive.include {
        if !copy_element(name, source, target) {
            warn!(element = %name, "Copy directive includes an unknown source element");
        }
    }
    add_fragment(directive, target)
}

fn copy_element(name: &str, source: &SchemaView, target: &mut SchemaDefinition) -> bool {
    let src = source.schema();
    if let Some(class) = src.classes.get(name) {
        target.classes.insert(name.to_string(), class.clone());
    } else if let Some(enum_def) = src.enums.get(name) {
        target.enums.insert(name.to_string(), enum_def.clone());
    } else if let Some(slot) = src.slots.get(name) {
        target.slots.insert(name.to_string(), slot.clone());
    } else if let Some(ty) = src.types.get(name) {
        target.types.insert(name.to_string(), ty.clone());
    } else {
        return false;
    }
    true
}

fn add_fragment(directive: &CopyDirective, target: &mut SchemaDefinition) -> Result<()> {
    let Some(fragment) = &directive.add else {
        return Ok(());
    };
    let fragment = schemamap_schemas::canonicalize_schema_value(fragment.clone())?;
    let mut current = target.to_value()?;
    merge_override(&mut current, &fragment);
    *target = serde_json::from_value(current)?;
    Ok(())
}

/// Apply class-level directives over the induced slots of `source_class`
pub fn apply_class_directives(
    directives: &IndexMap<String, CopyDirective>,
    source: &SchemaView,
    source_class: &str,
    target: &mut ClassDefinition,
) -> Result<()> {
    for directive in directives.values() {
        let induced: IndexMap<String, SlotDefinition> = source
            .class_induced_slots(source_class)
            .into_iter()
            .map(|slot| (slot.name.clone(), slot))
            .collect();

        if directive.copy_all {
            for (name, slot) in &induced {
                target
                    .attributes
                    .entry(name.clone())
                    .or_insert_with(|| slot.clone());
            }
        }
        for name in &directive.exclude {
            target.attributes.shift_remove(name);
        }
        if directive.exclude_all {
            target.attributes.clear();
        }
        for name in &directive.include {
            match induced.get(name) {
                Some(slot) => {
                    target.attributes.insert(name.clone(), slot.clone());
                }
                None => warn!(class = source_class, slot = %name, "Copy directive includes an unknown slot"),
            }
        }
        if let Some(Value::Object(added)) = &directive.add {
            for (name, raw) in added {
                let mut raw = if raw.is_null() { Value::Object(Default::default()) } else { raw.clone() };
                if let Value::Object(map) = &mut raw {
                    map.entry("name").or_insert_with(|| Value::String(name.clone()));
                }
                let slot: SlotDefinition = serde_json::from_value(raw)?;
                target.attributes.insert(name.clone(), slot);
            }
        }
    }
    Ok(())
}
