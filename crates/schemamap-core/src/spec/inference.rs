//! Filling defaulted values of a specification from the source schema
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::model::{ClassDerivation, SlotDerivation, TransformationSpecification};
use indexmap::IndexMap;
use schemamap_schemas::{RangeKind, SchemaView};
use tracing::trace;

/// Fill defaults in place
///
/// - class derivations without `populated_from` populate from their name
/// - slot derivations without any primary source populate from their name
/// - slot derivations without `range` whose source slot ranges over a class
///   (or enum) that some derivation populates from get that derivation's name
pub fn induce_missing_values(spec: &mut TransformationSpecification, source: &SchemaView) {
    let class_targets = first_targets(
        spec.all_class_derivations()
            .into_iter()
            .map(|cd| (cd.source_class().to_string(), cd.name.clone())),
    );
    let enum_targets = first_targets(
        spec.enum_derivations
            .values()
            .map(|ed| (ed.source_enum().to_string(), ed.name.clone())),
    );
    let targets = Targets {
        classes: &class_targets,
        enums: &enum_targets,
    };

    for cd in spec.class_derivations.values_mut() {
        induce_class(cd, source, &targets);
    }
    for ed in spec.enum_derivations.values_mut() {
        if ed.populated_from.is_none() {
            ed.populated_from = Some(ed.name.clone());
        }
    }
}

struct Targets<'a> {
    classes: &'a IndexMap<String, String>,
    enums: &'a IndexMap<String, String>,
}

fn first_targets(pairs: impl Iterator<Item = (String, String)>) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for (source, target) in pairs {
        out.entry(source).or_insert(target);
    }
    out
}

fn induce_class(cd: &mut ClassDerivation, source: &SchemaView, targets: &Targets<'_>) {
    if cd.populated_from.is_none() {
        cd.populated_from = Some(cd.name.clone());
    }
    let source_class = cd.source_class().to_string();
    for sd in cd.slot_derivations.values_mut() {
        induce_slot(sd, &source_class, source, targets);
        for nested in sd.object_derivations.values_mut() {
            induce_class(nested, source, targets);
        }
    }
}

fn induce_slot(sd: &mut SlotDerivation, source_class: &str, source: &SchemaView, targets: &Targets<'_>) {
    let has_primary = !sd.primary_sources().is_empty();
    if !has_primary && !sd.type_designator && sd.pivot_operation.is_none() {
        sd.populated_from = Some(sd.name.clone());
    }
    if sd.range.is_some() || sd.is_dot_path() {
        return;
    }
    let Some(slot_name) = sd.populated_from.as_deref() else {
        return;
    };
    let Some(range) = source
        .induced_slot(slot_name, source_class)
        .and_then(|slot| slot.range)
    else {
        return;
    };
    let target = match source.range_kind(&range) {
        RangeKind::Class => targets.classes.get(&range),
        RangeKind::Enum => targets.enums.get(&range),
        _ => None,
    };
    if let Some(target) = target {
        trace!(slot = %sd.name, source_range = %range, target_range = %target, "Induced range");
        sd.range = Some(target.clone());
    }
}
