//! Derivation of target slot definitions
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::Result;
use crate::spec::{CollectionType, PivotDirection, SlotDerivation};
use crate::units::UnitSystem;
use schemamap_schemas::merge::{merge_fill, merge_override};
use schemamap_schemas::{RangeKind, SchemaView, SlotDefinition, UnitOfMeasure};
use serde_json::Value;

/// The source slot a slot derivation reads, if it reads one
///
/// Dot-paths are followed through class ranges to the slot of the last
/// segment.
pub fn source_slot(sd: &SlotDerivation, source: &SchemaView, source_class: &str) -> Option<SlotDefinition> {
    if let Some(path) = sd.populated_from.as_deref() {
        return resolve_path_slot(path, source, source_class);
    }
    if let Some(first) = sd.sources.first() {
        return source.induced_slot(first, source_class);
    }
    if sd.expr.is_none() && sd.value.is_none() && !sd.type_designator {
        return source.induced_slot(&sd.name, source_class);
    }
    None
}

fn resolve_path_slot(path: &str, source: &SchemaView, source_class: &str) -> Option<SlotDefinition> {
    let mut class_name = source_class.to_string();
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let slot = source.induced_slot(segment, &class_name)?;
        if segments.peek().is_none() {
            return Some(slot);
        }
        match slot.range.as_deref() {
            Some(range) if source.range_kind(range) == RangeKind::Class => class_name = range.to_string(),
            _ => return None,
        }
    }
    None
}

/// Build the target definition of one derived slot
pub fn derive_slot(sd: &SlotDerivation, source: &SchemaView, source_class: &str) -> Result<SlotDefinition> {
    let mut slot = match source_slot(sd, source, source_class) {
        Some(mut slot) => {
            // a renamed slot no longer inherits from the source slot hierarchy
            slot.is_a = None;
            slot.mixins.clear();
            slot
        }
        None => SlotDefinition::new(&sd.name),
    };
    slot.name = sd.name.clone();

    if let Some(range) = &sd.range {
        slot.range = Some(range.clone());
    }
    if let Some(fragment) = &sd.target_definition {
        slot = merge_into(slot, fragment, merge_fill)?;
    }
    if let Some(uc) = &sd.unit_conversion {
        if let Some(target_unit) = &uc.target_unit {
            slot.unit = Some(match uc.target_unit_scheme {
                None | Some(UnitSystem::Ucum) => UnitOfMeasure::ucum(target_unit),
                Some(_) => UnitOfMeasure {
                    symbol: Some(target_unit.clone()),
                    ..Default::default()
                },
            });
        }
        if uc.has_composite_source() && !uc.has_composite_target() {
            slot.range = Some("float".to_string());
        }
    }
    if let Some(stringification) = &sd.stringification {
        if stringification.reversed {
            slot.multivalued = Some(true);
        } else {
            slot.multivalued = Some(false);
            slot.inlined = None;
            slot.inlined_as_list = None;
            slot.range = Some("string".to_string());
        }
    }
    if sd.aggregation_operation.is_some() {
        slot.multivalued = Some(false);
    }
    if let Some(pivot) = &sd.pivot_operation {
        if pivot.direction == PivotDirection::Melt {
            slot.multivalued = Some(true);
            slot.inlined_as_list = Some(true);
        }
    }
    if sd.dictionary_key.is_some() {
        slot.multivalued = Some(true);
        slot.inlined = Some(true);
        slot.inlined_as_list = Some(false);
    }
    if let Some(cast) = sd.cast_collection_as {
        apply_cast(&mut slot, cast);
    }
    if sd.type_designator {
        slot.designates_type = Some(true);
        slot.range = Some("string".to_string());
    }
    if let Some(fragment) = &sd.overrides {
        slot = merge_into(slot, fragment, merge_override)?;
    }
    Ok(slot)
}

fn apply_cast(slot: &mut SlotDefinition, cast: CollectionType) {
    match cast {
        CollectionType::SingleValued => {
            slot.multivalued = Some(false);
            slot.inlined_as_list = None;
        }
        CollectionType::MultiValued => slot.multivalued = Some(true),
        CollectionType::MultiValuedList => {
            slot.multivalued = Some(true);
            slot.inlined_as_list = Some(true);
        }
        CollectionType::MultiValuedDict => {
            slot.multivalued = Some(true);
            slot.inlined = Some(true);
            slot.inlined_as_list = Some(false);
        }
    }
}

fn merge_into(slot: SlotDefinition, fragment: &Value, merge: fn(&mut Value, &Value)) -> Result<SlotDefinition> {
    let mut current = serde_json::to_value(&slot)?;
    merge(&mut current, fragment);
    Ok(serde_json::from_value(current)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> SchemaView {
        SchemaView::from_value(json!({
            "name": "src",
            "classes": {
                "Person": {"attributes": {
                    "name": {"description": "full name"},
                    "aliases": {"multivalued": true},
                    "height": {"range": "float", "unit": {"ucum_code": "m"}},
                    "employer": {"range": "Organization"}
                }},
                "Organization": {"attributes": {"id": {"identifier": true}, "name": {}}}
            }
        }))
        .unwrap()
    }

    fn derive(raw: Value) -> SlotDefinition {
        let sd: SlotDerivation = serde_json::from_value(raw).unwrap();
        derive_slot(&sd, &source(), "Person").unwrap()
    }

    #[test]
    fn test_renamed_slot_keeps_metadata() {
        let slot = derive(json!({"name": "label", "populated_from": "name"}));
        assert_eq!(slot.name, "label");
        assert_eq!(slot.description.as_deref(), Some("full name"));
    }

    #[test]
    fn test_stringification_and_units() {
        let joined = derive(json!({"name": "aliases_str", "populated_from": "aliases", "stringification": {"delimiter": "|"}}));
        assert_eq!(joined.multivalued, Some(false));
        assert_eq!(joined.range.as_deref(), Some("string"));

        let height = derive(json!({"name": "height_cm", "populated_from": "height", "unit_conversion": {"target_unit": "cm"}}));
        assert_eq!(height.unit.unwrap().ucum_code.as_deref(), Some("cm"));
    }

    #[test]
    fn test_dot_path_and_overrides() {
        let slot = derive(json!({
            "name": "org_name",
            "populated_from": "employer.name",
            "overrides": {"required": true}
        }));
        assert_eq!(slot.range.as_deref(), Some("string"));
        assert_eq!(slot.required, Some(true));
    }

    #[test]
    fn test_collection_casts() {
        let dict = derive(json!({"name": "aliases", "cast_collection_as": "MultiValuedDict", "dictionary_key": "id"}));
        assert_eq!((dict.inlined, dict.inlined_as_list), (Some(true), Some(false)));
        let single = derive(json!({"name": "aliases", "cast_collection_as": "SingleValued"}));
        assert_eq!(single.multivalued, Some(false));
    }
}
