//! Transformation specification data structures
//!
//! These types are the canonical form produced by the normalizer. Every
//! `*_derivations` collection is an ordered map keyed by the derivation name,
//! and each derivation also carries its own `name`.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::units::UnitSystem;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Root of a transformation specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Prefix to URL expansions, used for CURIE handling
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub prefixes: IndexMap<String, String>,

    /// Identifier of the source schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_schema: Option<String>,

    /// Identifier of the target schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_schema: Option<String>,

    /// Partial schema merged into the source schema before use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_schema_patches: Option<Value>,

    /// Target class name to class derivation
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub class_derivations: IndexMap<String, ClassDerivation>,

    /// Target enum name to enum derivation
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub enum_derivations: IndexMap<String, EnumDerivation>,

    /// Top-level slot derivations
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub slot_derivations: IndexMap<String, SlotDerivation>,

    /// Schema elements copied from the source schema
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub copy_directives: IndexMap<String, CopyDirective>,
}

/// How to build one target class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDerivation {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source class; defaults to `name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populated_from: Option<String>,

    /// Alternative source classes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Parent derivation whose slot derivations are inherited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_a: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<String>,

    /// Target slot name to slot derivation, in evaluation order
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub slot_derivations: IndexMap<String, SlotDerivation>,

    /// Additional classes joined by alias; not executed in memory
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub joins: IndexMap<String, AliasedClass>,

    /// Fragment filling unset fields of the derived class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_definition: Option<Value>,

    /// Fragment overriding fields of the derived class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot_operation: Option<PivotOperation>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub copy_directives: IndexMap<String, CopyDirective>,

    /// Copy source slots that have no explicit derivation
    #[serde(skip_serializing_if = "is_false")]
    pub mirror_source: bool,
}

/// How to compute one target slot value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotDerivation {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source slot name, or a dot-path following references
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populated_from: Option<String>,

    /// Candidate source slots; at most one may hold a value
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Expression computing the value; multi-line expressions are blocks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,

    /// Target range name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    /// Literal value that populates the slot unconditionally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Inline class derivations used for nested objects of this slot
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub object_derivations: IndexMap<String, ClassDerivation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_conversion: Option<UnitConversionConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stringification: Option<StringificationConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation_operation: Option<AggregationOperation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast_collection_as: Option<CollectionType>,

    /// Identifier key used when the target collection is a compact dict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverse_of: Option<Inverse>,

    /// Compute but do not emit
    #[serde(skip_serializing_if = "is_false")]
    pub hide: bool,

    /// Populate with the target class name
    #[serde(skip_serializing_if = "is_false")]
    pub type_designator: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub mirror_source: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_definition: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot_operation: Option<PivotOperation>,

    /// Stringified source value to target value
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub value_mappings: IndexMap<String, Value>,

    /// Guard expression to target value
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub expression_to_value_mappings: IndexMap<String, Value>,

    /// Guard expression to value expression
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub expression_to_expression_mappings: IndexMap<String, String>,
}

/// How to build one target enum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumDerivation {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub populated_from: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Expression mapping a source value, bound as `src`, to a target value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,

    #[serde(skip_serializing_if = "is_false")]
    pub hide: bool,

    /// Pass unmapped source values through unchanged
    #[serde(skip_serializing_if = "is_false")]
    pub mirror_source: bool,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub permissible_value_derivations: IndexMap<String, PermissibleValueDerivation>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub copy_directives: IndexMap<String, CopyDirective>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissibleValueDerivation {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub populated_from: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Guard expression over `src`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,

    #[serde(skip_serializing_if = "is_false")]
    pub hide: bool,
}

/// Unit conversion of a slot value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConversionConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_unit_scheme: Option<UnitSystem>,

    /// Source unit overriding the source slot metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_unit_scheme: Option<UnitSystem>,

    /// Field of a composite source value holding the unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_unit_slot: Option<String>,

    /// Field of a composite source value holding the magnitude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_magnitude_slot: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_unit_slot: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_magnitude_slot: Option<String>,
}

impl UnitConversionConfiguration {
    /// Whether the source value is a `{magnitude, unit}` mapping
    pub fn has_composite_source(&self) -> bool {
        self.source_unit_slot.is_some() || self.source_magnitude_slot.is_some()
    }

    /// Whether the converted value is emitted as a `{magnitude, unit}` mapping
    pub fn has_composite_target(&self) -> bool {
        self.target_unit_slot.is_some() || self.target_magnitude_slot.is_some()
    }
}

/// Conversion between multivalued slots and single strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringificationConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub syntax: Option<SerializationSyntax>,

    /// Parse a string into a list instead of joining a list into a string
    #[serde(skip_serializing_if = "is_false")]
    pub reversed: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub over_slots: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerializationSyntax {
    #[serde(rename = "JSON", alias = "json")]
    Json,
    #[serde(rename = "YAML", alias = "yaml")]
    Yaml,
    #[serde(rename = "TURTLE", alias = "turtle")]
    Turtle,
}

/// Shape of a target collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionType {
    SingleValued,
    MultiValued,
    MultiValuedList,
    MultiValuedDict,
}

impl CollectionType {
    pub fn is_multivalued(&self) -> bool {
        !matches!(self, CollectionType::SingleValued)
    }
}

/// Reshaping between wide records and entity-attribute-value records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotOperation {
    pub direction: PivotDirection,

    /// Field of an EAV record naming the attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_slot: Option<String>,

    /// Field of an EAV record holding the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_slot: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_slot: Option<String>,

    /// Key template over `{variable}` and `{unit}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_name_template: Option<String>,

    /// Wide slots melted into records
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_slots: Vec<String>,

    /// Slots copied into every melted record
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_slots: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmelt_to_class: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmelt_to_slots: Vec<String>,
}

pub const DEFAULT_VARIABLE_SLOT: &str = "variable";
pub const DEFAULT_VALUE_SLOT: &str = "value";
pub const DEFAULT_SLOT_NAME_TEMPLATE: &str = "{variable}";

impl PivotOperation {
    pub fn variable_slot(&self) -> &str {
        self.variable_slot.as_deref().unwrap_or(DEFAULT_VARIABLE_SLOT)
    }

    pub fn value_slot(&self) -> &str {
        self.value_slot.as_deref().unwrap_or(DEFAULT_VALUE_SLOT)
    }

    pub fn slot_name_template(&self) -> &str {
        self.slot_name_template
            .as_deref()
            .unwrap_or(DEFAULT_SLOT_NAME_TEMPLATE)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PivotDirection {
    #[serde(alias = "melt")]
    Melt,
    #[default]
    #[serde(alias = "unmelt")]
    Unmelt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationOperation {
    pub operator: AggregationOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_handling: Option<NullHandling>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationOperator {
    Sum,
    #[serde(alias = "MEAN")]
    Avg,
    Count,
    Min,
    Max,
    StdDev,
    Variance,
    Median,
    Mode,
    Set,
    List,
    Array,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NullHandling {
    #[default]
    IgnoreNulls,
    PropagateNulls,
    TreatAsZero,
}

/// Back-reference declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inverse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

/// A class joined into a class derivation under an alias
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasedClass {
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_named: Option<String>,
}

/// Rules for copying schema elements from source to target
///
/// Applied in order: `copy_all`, `exclude`, `exclude_all`, `include`, `add`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyDirective {
    pub element_name: String,
    #[serde(skip_serializing_if = "is_false")]
    pub copy_all: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub exclude_all: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Schema fragment added verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add: Option<Value>,
}

impl TransformationSpecification {
    /// The class derivations, top-level and nested in `object_derivations`
    pub fn all_class_derivations(&self) -> Vec<&ClassDerivation> {
        fn collect<'a>(cd: &'a ClassDerivation, out: &mut Vec<&'a ClassDerivation>) {
            out.push(cd);
            for sd in cd.slot_derivations.values() {
                for nested in sd.object_derivations.values() {
                    collect(nested, out);
                }
            }
        }
        let mut out = Vec::new();
        for cd in self.class_derivations.values() {
            collect(cd, &mut out);
        }
        out
    }

    /// Class derivations whose source is `source_class`
    pub fn derivations_from(&self, source_class: &str) -> Vec<&ClassDerivation> {
        self.class_derivations
            .values()
            .filter(|cd| cd.source_class() == source_class || cd.sources.iter().any(|s| s == source_class))
            .collect()
    }
}

impl ClassDerivation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn populated_from(mut self, source: impl Into<String>) -> Self {
        self.populated_from = Some(source.into());
        self
    }

    /// Add a slot derivation, keyed by its name
    pub fn with_slot(mut self, slot_derivation: SlotDerivation) -> Self {
        self.slot_derivations
            .insert(slot_derivation.name.clone(), slot_derivation);
        self
    }

    /// The source class name, `name` when `populated_from` is unset
    pub fn source_class(&self) -> &str {
        self.populated_from.as_deref().unwrap_or(&self.name)
    }

    /// Parent derivations: `is_a` first, then mixins
    pub fn parents(&self) -> impl Iterator<Item = &String> {
        self.is_a.iter().chain(self.mixins.iter())
    }
}

impl SlotDerivation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn populated_from(mut self, source: impl Into<String>) -> Self {
        self.populated_from = Some(source.into());
        self
    }

    pub fn expr(mut self, expr: impl Into<String>) -> Self {
        self.expr = Some(expr.into());
        self
    }

    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Names of the primary value sources that are set
    pub fn primary_sources(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        if self.populated_from.is_some() {
            set.push("populated_from");
        }
        if self.expr.is_some() {
            set.push("expr");
        }
        if !self.sources.is_empty() {
            set.push("sources");
        }
        if self.value.is_some() {
            set.push("value");
        }
        set
    }

    /// Whether `populated_from` is a dot-path through a reference
    pub fn is_dot_path(&self) -> bool {
        self.populated_from
            .as_deref()
            .is_some_and(|path| path.contains('.'))
    }
}

impl PermissibleValueDerivation {
    /// Source permissible values this derivation reads
    ///
    /// The derivation's own name is read only when neither `populated_from`
    /// nor `sources` is set.
    pub fn source_values(&self) -> Vec<&str> {
        if self.populated_from.is_none() && self.sources.is_empty() {
            return vec![self.name.as_str()];
        }
        self.populated_from
            .iter()
            .chain(self.sources.iter())
            .map(String::as_str)
            .collect()
    }
}

impl EnumDerivation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn source_enum(&self) -> &str {
        self.populated_from.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_wire_names() {
        let op: AggregationOperation =
            serde_json::from_value(json!({"operator": "STD_DEV", "null_handling": "TREAT_AS_ZERO"})).unwrap();
        assert_eq!(op.operator, AggregationOperator::StdDev);
        assert_eq!(op.null_handling, Some(NullHandling::TreatAsZero));

        let cast: CollectionType = serde_json::from_value(json!("MultiValuedDict")).unwrap();
        assert!(cast.is_multivalued());

        let syntax: SerializationSyntax = serde_json::from_value(json!("yaml")).unwrap();
        assert_eq!(syntax, SerializationSyntax::Yaml);
    }

    #[test]
    fn test_serialization_skips_defaults() {
        let cd = ClassDerivation::new("Agent")
            .populated_from("Person")
            .with_slot(SlotDerivation::new("label").populated_from("name"));
        assert_eq!(
            serde_json::to_value(&cd).unwrap(),
            json!({
                "name": "Agent",
                "populated_from": "Person",
                "slot_derivations": {"label": {"name": "label", "populated_from": "name"}}
            })
        );
    }

    #[test]
    fn test_pivot_defaults() {
        let pivot = PivotOperation::default();
        assert_eq!(pivot.variable_slot(), "variable");
        assert_eq!(pivot.value_slot(), "value");
        assert_eq!(pivot.slot_name_template(), "{variable}");
    }
}
