//! Mechanical inversion of transformation specifications
//!
//! The inverse of a derivation maps target instances back to source
//! instances: every class derivation becomes a derivation of its source class
//! populated from the target class, and every slot derivation swaps its name
//! with the slot it reads. Only derivations that read exactly one source slot
//! without losing information can be inverted. Expressions other than a bare
//! slot name, literal values, aggregations, dot-paths and candidate lists are
//! non-invertible; in strict mode they fail the inversion, otherwise they are
//! skipped with a warning.
//!
//! # Example
//!
//! ```
//! use schemamap_core::{Inverter, TransformationSpecification};
//! use schemamap_schemas::SchemaView;
//! use serde_json::json;
//!
//! let source = SchemaView::from_value(json!({
//!     "name": "personinfo",
//!     "classes": {"Person": {"attributes": {"name": {"range": "string"}}}}
//! })).unwrap();
//! let spec = TransformationSpecification::from_value(json!({
//!     "class_derivations": {"Agent": {
//!         "populated_from": "Person",
//!         "slot_derivations": {"label": {"populated_from": "name"}}
//!     }}
//! })).unwrap();
//!
//! let inverse = Inverter::new(&source).invert(&spec).unwrap();
//! let person = &inverse.class_derivations["Person"];
//! assert_eq!(person.populated_from.as_deref(), Some("Agent"));
//! assert_eq!(person.slot_derivations["name"].populated_from.as_deref(), Some("label"));
//! ```
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::expr::Datum;
use crate::spec::{
    ClassDerivation, CollectionType, EnumDerivation, PermissibleValueDerivation, PivotDirection,
    SlotDerivation, StringificationConfiguration, TransformationSpecification,
    UnitConversionConfiguration,
};
use indexmap::IndexMap;
use regex::Regex;
use schemamap_schemas::{RangeKind, SchemaView, SlotDefinition};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn bare_identifier(expr: &str) -> Option<&str> {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let re = IDENTIFIER.get_or_init(|| Regex::new(r"^\s*\{?\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}?\s*$").unwrap());
    let captures = re.captures(expr)?;
    let name = captures.get(1)?.as_str();
    // braces must be balanced
    let trimmed = expr.trim();
    if trimmed.starts_with('{') != trimmed.ends_with('}') {
        return None;
    }
    Some(name)
}

/// Produces reverse specifications against the forward source schema
#[derive(Debug, Clone)]
pub struct Inverter<'a> {
    source: &'a SchemaView,
    strict: bool,
}

impl<'a> Inverter<'a> {
    /// Non-strict inverter; non-invertible derivations are skipped
    pub fn new(source: &'a SchemaView) -> Self {
        Self {
            source,
            strict: false,
        }
    }

    /// Fail on the first non-invertible derivation instead of skipping it
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Invert a specification
    pub fn invert(&self, spec: &TransformationSpecification) -> Result<TransformationSpecification> {
        let parents: IndexMap<&str, &str> = spec
            .all_class_derivations()
            .into_iter()
            .map(|cd| (cd.name.as_str(), cd.source_class()))
            .collect();

        let mut class_derivations = IndexMap::new();
        for cd in spec.class_derivations.values() {
            let Some(inverted) = self.invert_class(cd, &parents)? else {
                continue;
            };
            if class_derivations.contains_key(&inverted.name) {
                self.non_invertible(format!(
                    "class '{}' is derived by more than one class derivation",
                    inverted.name
                ))?;
                continue;
            }
            class_derivations.insert(inverted.name.clone(), inverted);
        }

        let mut enum_derivations = IndexMap::new();
        for ed in spec.enum_derivations.values() {
            if let Some(inverted) = self.invert_enum(ed)? {
                enum_derivations.insert(inverted.name.clone(), inverted);
            }
        }

        if !spec.slot_derivations.is_empty() {
            debug!(
                count = spec.slot_derivations.len(),
                "Top-level slot derivations have no class context and are not inverted"
            );
        }

        debug!(
            class_derivations = class_derivations.len(),
            enum_derivations = enum_derivations.len(),
            "Inverted specification"
        );
        Ok(TransformationSpecification {
            id: spec.id.as_ref().map(|id| format!("{}-inverted", id)),
            title: spec.title.clone(),
            description: spec.description.clone(),
            prefixes: spec.prefixes.clone(),
            source_schema: spec.target_schema.clone(),
            target_schema: spec.source_schema.clone(),
            class_derivations,
            enum_derivations,
            ..Default::default()
        })
    }

    fn non_invertible(&self, message: String) -> Result<()> {
        if self.strict {
            return Err(Error::non_invertible(message));
        }
        warn!("{}; skipping", message);
        Ok(())
    }

    fn invert_class(
        &self,
        cd: &ClassDerivation,
        parents: &IndexMap<&str, &str>,
    ) -> Result<Option<ClassDerivation>> {
        let source_class = cd.source_class();
        if !cd.sources.is_empty() {
            self.non_invertible(format!(
                "class derivation '{}' unions several source classes",
                cd.name
            ))?;
            return Ok(None);
        }

        let mut inverted = ClassDerivation {
            name: source_class.to_string(),
            description: cd.description.clone(),
            populated_from: (source_class != cd.name).then(|| cd.name.clone()),
            is_a: cd.is_a.as_deref().map(|p| parents.get(p).copied().unwrap_or(p).to_string()),
            mixins: cd
                .mixins
                .iter()
                .map(|p| parents.get(p.as_str()).copied().unwrap_or(p.as_str()).to_string())
                .collect(),
            mirror_source: cd.mirror_source,
            ..Default::default()
        };

        if let Some(pivot) = &cd.pivot_operation {
            let mut pivot = pivot.clone();
            pivot.direction = match pivot.direction {
                PivotDirection::Melt => PivotDirection::Unmelt,
                PivotDirection::Unmelt => PivotDirection::Melt,
            };
            inverted.pivot_operation = Some(pivot);
        }
        if !cd.joins.is_empty() {
            debug!(class = %cd.name, "Joins are dropped from the inverse");
        }

        for sd in cd.slot_derivations.values() {
            if let Some(slot) = self.invert_slot(cd, sd, parents)? {
                if inverted.slot_derivations.contains_key(&slot.name) {
                    self.non_invertible(format!(
                        "source slot {}.{} is read by more than one slot derivation",
                        source_class, slot.name
                    ))?;
                    continue;
                }
                inverted.slot_derivations.insert(slot.name.clone(), slot);
            }
        }
        Ok(Some(inverted))
    }

    /// The source slot a slot derivation reads, if that can be reversed
    fn read_slot<'s>(&self, cd: &ClassDerivation, sd: &'s SlotDerivation) -> Result<Option<&'s str>> {
        let reason = if sd.value.is_some() {
            "sets a literal value"
        } else if sd.pivot_operation.is_some() {
            "pivots"
        } else if sd.aggregation_operation.is_some() {
            "aggregates"
        } else if !sd.sources.is_empty() {
            "reads one of several candidate slots"
        } else if sd.is_dot_path() {
            "follows a reference path"
        } else if !sd.expression_to_value_mappings.is_empty() || !sd.expression_to_expression_mappings.is_empty() {
            "maps values by expression"
        } else if sd.stringification.as_ref().is_some_and(|s| !s.over_slots.is_empty()) {
            "joins several slots"
        } else if let Some(expr) = &sd.expr {
            match bare_identifier(expr) {
                Some(name) => return Ok(Some(name)),
                None => "computes an expression",
            }
        } else {
            return Ok(Some(sd.populated_from.as_deref().unwrap_or(&sd.name)));
        };
        self.non_invertible(format!("slot derivation {}.{} {}", cd.name, sd.name, reason))?;
        Ok(None)
    }

    fn invert_slot(
        &self,
        cd: &ClassDerivation,
        sd: &SlotDerivation,
        parents: &IndexMap<&str, &str>,
    ) -> Result<Option<SlotDerivation>> {
        if sd.hide || sd.type_designator {
            return Ok(None);
        }
        let Some(read) = self.read_slot(cd, sd)? else {
            return Ok(None);
        };
        let source_class = cd.source_class();
        let source_slot = self.source.induced_slot(read, source_class);

        let mut inverted = SlotDerivation {
            name: read.to_string(),
            description: sd.description.clone(),
            populated_from: (read != sd.name).then(|| sd.name.clone()),
            ..Default::default()
        };

        // Class and enum ranges always carry over; a primitive source range
        // only when the forward derivation retyped the slot.
        if let Some(slot) = &source_slot {
            let structured = slot
                .range
                .as_deref()
                .is_some_and(|r| matches!(self.source.range_kind(r), RangeKind::Class | RangeKind::Enum));
            let retyped = sd.range.is_some() && sd.range != slot.range;
            if structured || retyped {
                inverted.range = slot.range.clone();
            }
        }

        if sd.cast_collection_as.is_some() || sd.dictionary_key.is_some() {
            let (cast, key) = self.reconstruct_cast(sd, source_slot.as_ref());
            inverted.cast_collection_as = cast;
            inverted.dictionary_key = key;
        }
        if let Some(config) = &sd.unit_conversion {
            inverted.unit_conversion = Some(invert_units(config, source_slot.as_ref()));
        }
        if let Some(config) = &sd.stringification {
            inverted.stringification = Some(StringificationConfiguration {
                reversed: !config.reversed,
                ..config.clone()
            });
        }
        if !sd.value_mappings.is_empty() {
            match invert_value_mappings(&sd.value_mappings) {
                Some(mappings) => inverted.value_mappings = mappings,
                None => {
                    self.non_invertible(format!(
                        "value mappings of {}.{} are not one-to-one",
                        cd.name, sd.name
                    ))?;
                    return Ok(None);
                }
            }
        }

        for nested in sd.object_derivations.values() {
            if let Some(inverted_nested) = self.invert_class(nested, parents)? {
                inverted
                    .object_derivations
                    .insert(inverted_nested.name.clone(), inverted_nested);
            }
        }
        Ok(Some(inverted))
    }

    /// Collection shape that restores the source slot's cardinality
    fn reconstruct_cast(
        &self,
        sd: &SlotDerivation,
        source_slot: Option<&SlotDefinition>,
    ) -> (Option<CollectionType>, Option<String>) {
        let Some(slot) = source_slot else {
            return (None, None);
        };
        if !slot.is_multivalued() {
            return (Some(CollectionType::SingleValued), None);
        }
        let identifier = slot
            .range
            .as_deref()
            .and_then(|r| self.source.get_identifier_slot(r, true))
            .map(|id| id.name);
        let key = sd.dictionary_key.clone().or(identifier);
        if slot.inlined_as_list == Some(true) {
            (Some(CollectionType::MultiValuedList), key)
        } else if key.is_some() && self.source.is_inlined(slot) {
            (Some(CollectionType::MultiValuedDict), key)
        } else {
            (Some(CollectionType::MultiValued), None)
        }
    }

    fn invert_enum(&self, ed: &EnumDerivation) -> Result<Option<EnumDerivation>> {
        if ed.expr.is_some() {
            self.non_invertible(format!("enum derivation '{}' computes an expression", ed.name))?;
            return Ok(None);
        }
        let source_enum = ed.source_enum();
        let mut inverted = EnumDerivation {
            name: source_enum.to_string(),
            description: ed.description.clone(),
            populated_from: (source_enum != ed.name).then(|| ed.name.clone()),
            mirror_source: ed.mirror_source,
            ..Default::default()
        };
        for pvd in ed.permissible_value_derivations.values() {
            if pvd.hide {
                continue;
            }
            if pvd.expr.is_some() {
                self.non_invertible(format!(
                    "permissible value {}.{} is guarded by an expression",
                    ed.name, pvd.name
                ))?;
                continue;
            }
            for source_value in pvd.source_values() {
                if inverted.permissible_value_derivations.contains_key(source_value) {
                    continue;
                }
                inverted.permissible_value_derivations.insert(
                    source_value.to_string(),
                    PermissibleValueDerivation {
                        name: source_value.to_string(),
                        description: pvd.description.clone(),
                        populated_from: (source_value != pvd.name).then(|| pvd.name.clone()),
                        ..Default::default()
                    },
                );
            }
        }
        Ok(Some(inverted))
    }
}

fn invert_units(
    config: &UnitConversionConfiguration,
    source_slot: Option<&SlotDefinition>,
) -> UnitConversionConfiguration {
    let original_unit = config.source_unit.clone().or_else(|| {
        source_slot
            .and_then(|slot| slot.unit.as_ref())
            .and_then(|unit| unit.preferred_code())
            .map(str::to_string)
    });
    UnitConversionConfiguration {
        target_unit: original_unit,
        target_unit_scheme: config.source_unit_scheme,
        source_unit: config.target_unit.clone(),
        source_unit_scheme: config.target_unit_scheme,
        source_unit_slot: config.target_unit_slot.clone(),
        source_magnitude_slot: config.target_magnitude_slot.clone(),
        target_unit_slot: config.source_unit_slot.clone(),
        target_magnitude_slot: config.source_magnitude_slot.clone(),
    }
}

fn invert_value_mappings(mappings: &IndexMap<String, Value>) -> Option<IndexMap<String, Value>> {
    let mut inverted = IndexMap::new();
    for (from, to) in mappings {
        let key = Datum::from_json(to).to_display_string();
        if inverted.insert(key, Value::String(from.clone())).is_some() {
            return None;
        }
    }
    Some(inverted)
}

/// Invert `spec` against `source`; see [`Inverter`]
pub fn invert(
    spec: &TransformationSpecification,
    source: &SchemaView,
    strict: bool,
) -> Result<TransformationSpecification> {
    Inverter::new(source).strict(strict).invert(spec)
}
