//! Object transformer: maps source instances to target instances
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::aggregation::aggregate;
use super::bindings::Bindings;
use super::coerce::Coercer;
use super::collections::{
    compact_dict_to_list, destringify, list_to_compact_dict, stringify, to_multivalued, to_single_valued,
};
use super::enums::transform_enum;
use super::pivot::{melt, unmelt};
use super::resolution::{find_class_derivation, flatten};
use super::unit_conversion::convert_value;
use super::value_mappings::{apply_value_mappings, has_value_mappings};
use crate::config::TransformerOptions;
use crate::error::{Error, Result};
use crate::expr::{is_block, Datum, Evaluator, Proxy};
use crate::object_index::ObjectIndex;
use crate::schema_mapper::{source_slot, SchemaMapper};
use crate::spec::{
    induce_missing_values, ClassDerivation, CollectionType, PivotDirection, SlotDerivation,
    TransformationSpecification,
};
use indexmap::IndexMap;
use schemamap_schemas::{Primitive, RangeKind, SchemaView, SlotDefinition};
use serde_json::{Map, Value};
use std::cell::OnceCell;
use std::sync::Arc;
use tracing::{debug, trace, warn};

type LocalDerivations = IndexMap<String, ClassDerivation>;

/// Maps objects of the source schema through a transformation specification
///
/// The transformer owns the specification (as given and with defaults
/// induced), the patched source schema, the object index used to follow
/// references, and a lazily derived target schema. It is single-threaded:
/// the index caches are not shared across threads.
#[derive(Debug)]
pub struct ObjectTransformer {
    specification: TransformationSpecification,
    derived_specification: TransformationSpecification,
    source_schemaview: Arc<SchemaView>,
    target_schemaview: OnceCell<Option<Arc<SchemaView>>>,
    object_index: ObjectIndex,
    coercer: Coercer,
    options: TransformerOptions,
}

impl ObjectTransformer {
    /// Create a transformer; `source_schema_patches` are merged into the
    /// source schema here, once
    pub fn new(
        specification: TransformationSpecification,
        source_schema: SchemaView,
        options: TransformerOptions,
    ) -> Result<Self> {
        let mut source_schema = source_schema;
        if let Some(patch) = &specification.source_schema_patches {
            source_schema.merge_patch(patch)?;
            debug!("Applied source schema patches");
        }

        let mut derived_specification = specification.clone();
        induce_missing_values(&mut derived_specification, &source_schema);

        let coercer = Coercer::new(specification.prefixes.clone(), options.expand_curies)
            .with_prefixes(&source_schema.schema().prefixes);
        let source_schemaview = Arc::new(source_schema);

        Ok(Self {
            specification,
            derived_specification,
            object_index: ObjectIndex::new(Arc::clone(&source_schemaview)),
            source_schemaview,
            target_schemaview: OnceCell::new(),
            coercer,
            options,
        })
    }

    /// Use an explicit target schema instead of deriving one
    pub fn with_target_schema(mut self, target_schema: SchemaView) -> Self {
        self.coercer = self.coercer.with_prefixes(&target_schema.schema().prefixes);
        self.target_schemaview = OnceCell::from(Some(Arc::new(target_schema)));
        self
    }

    /// The specification as given
    pub fn specification(&self) -> &TransformationSpecification {
        &self.specification
    }

    /// The specification with defaults induced from the source schema
    pub fn derived_specification(&self) -> &TransformationSpecification {
        &self.derived_specification
    }

    /// The source schema, patches applied
    pub fn source_schemaview(&self) -> &Arc<SchemaView> {
        &self.source_schemaview
    }

    /// The target schema, derived on first use when none was given
    pub fn target_schemaview(&self) -> Option<Arc<SchemaView>> {
        self.target_schemaview
            .get_or_init(|| {
                match SchemaMapper::new(&self.source_schemaview).derive_schema(&self.derived_specification, None, None) {
                    Ok(schema) => Some(Arc::new(SchemaView::new(schema))),
                    Err(err) => {
                        warn!(error = %err, "Could not derive the target schema; target slot metadata unavailable");
                        None
                    }
                }
            })
            .clone()
    }

    pub fn options(&self) -> &TransformerOptions {
        &self.options
    }

    pub fn object_index(&self) -> &ObjectIndex {
        &self.object_index
    }

    /// Index every identified object reachable from `root`
    ///
    /// Replaces any previous index, so references resolve against this
    /// container only.
    pub fn index(&mut self, root: &Value, class_name: &str) {
        self.object_index = ObjectIndex::build(Arc::clone(&self.source_schemaview), root, class_name);
    }

    pub fn clear_proxy_object_cache(&self) {
        self.object_index.clear_proxy_object_cache();
    }

    /// Map one source object
    ///
    /// `source_type` names the source class (or type, or enum) of `obj`;
    /// when omitted it is taken from the derivation named by `target_type`,
    /// or from the only class derivation of the specification.
    pub fn map_object(&self, obj: &Value, source_type: Option<&str>, target_type: Option<&str>) -> Result<Value> {
        self.clear_proxy_object_cache();
        let source_type = match source_type {
            Some(source_type) => source_type.to_string(),
            None => self.infer_source_type(target_type)?,
        };
        self.transform(obj, &source_type, target_type, None, true)
    }

    /// Map an enum value through the enum derivations
    pub fn transform_enum(&self, value: &Value, enum_name: &str) -> Result<Value> {
        transform_enum(&self.derived_specification, &self.evaluator(), value, enum_name)
    }

    fn infer_source_type(&self, target_type: Option<&str>) -> Result<String> {
        let spec = &self.derived_specification;
        if let Some(target_type) = target_type {
            return spec
                .class_derivations
                .get(target_type)
                .map(|cd| cd.source_class().to_string())
                .ok_or_else(|| Error::specification(format!("no class derivation named '{}'", target_type)));
        }
        match spec.class_derivations.values().collect::<Vec<_>>().as_slice() {
            [cd] => Ok(cd.source_class().to_string()),
            _ => Err(Error::specification(
                "a source type is required when the specification has several class derivations",
            )),
        }
    }

    fn evaluator(&self) -> Evaluator {
        if self.options.unrestricted_eval {
            Evaluator::permissive()
        } else {
            Evaluator::restricted()
        }
    }

    fn transform(
        &self,
        obj: &Value,
        source_type: &str,
        target_type: Option<&str>,
        local: Option<&LocalDerivations>,
        top: bool,
    ) -> Result<Value> {
        let view = &*self.source_schemaview;
        match view.range_kind(source_type) {
            RangeKind::Type(_) => {
                let target = target_type.and_then(|t| self.primitive_of(t));
                return Ok(match target {
                    Some(primitive) => self.coercer.coerce(obj, primitive),
                    None => obj.clone(),
                });
            }
            RangeKind::Enum => return self.transform_enum(obj, source_type),
            RangeKind::Class | RangeKind::Unknown => {}
        }

        let spec = &self.derived_specification;
        let Some(cd) = find_class_derivation(spec, local, source_type, target_type)? else {
            if top {
                return Err(Error::specification(format!(
                    "no class derivation populates from '{}'",
                    source_type
                )));
            }
            trace!(source_type, "No class derivation; passing nested value through");
            return Ok(obj.clone());
        };
        let cd = flatten(spec, cd)?;
        if !view.is_class(source_type) {
            warn!(source_type, target = %cd.name, "Source class is not defined in the source schema");
        }

        if let Some(pivot) = &cd.pivot_operation {
            if pivot.direction == PivotDirection::Unmelt {
                return Ok(self.unmelt_object(&cd, obj));
            }
        }

        match obj {
            Value::Object(_) => self.map_class(&cd, source_type, obj),
            Value::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.transform(item, source_type, Some(&cd.name), local, top))
                    .collect::<Result<_>>()?,
            )),
            Value::Null => Ok(Value::Null),
            other => {
                if top {
                    warn!(source_type, value = %other, "Value is not an object; returning it unchanged");
                } else {
                    trace!(source_type, value = %other, "Reference left unmapped");
                }
                Ok(other.clone())
            }
        }
    }

    fn map_class(&self, cd: &ClassDerivation, source_type: &str, obj: &Value) -> Result<Value> {
        let Some(source) = obj.as_object() else {
            return Ok(obj.clone());
        };
        trace!(source_type, target = %cd.name, "Mapping object");

        let mut bindings = Bindings::new(obj, source_type, &self.object_index);
        let mut target = Map::new();
        for sd in cd.slot_derivations.values() {
            let value = self.derive_slot_value(cd, sd, source_type, source, &bindings)?;
            if !value.is_null() && !source.contains_key(&sd.name) {
                bindings.bind(sd.name.clone(), Datum::from_json(&value));
            }
            if sd.hide || value.is_null() {
                continue;
            }
            target.insert(sd.name.clone(), value);
        }

        if cd.mirror_source {
            for slot in self.source_schemaview.class_induced_slots(source_type) {
                if cd.slot_derivations.contains_key(&slot.name) || target.contains_key(&slot.name) {
                    continue;
                }
                if let Some(value) = source.get(&slot.name).filter(|v| !v.is_null()) {
                    target.insert(slot.name.clone(), value.clone());
                }
            }
        }

        if !cd.joins.is_empty() {
            debug!(
                class = %cd.name,
                joins = ?cd.joins.keys().collect::<Vec<_>>(),
                "Joins are not executed in memory"
            );
        }
        Ok(Value::Object(target))
    }

    fn derive_slot_value(
        &self,
        cd: &ClassDerivation,
        sd: &SlotDerivation,
        source_type: &str,
        source: &Map<String, Value>,
        bindings: &Bindings<'_>,
    ) -> Result<Value> {
        let view = &*self.source_schemaview;
        let mut source_slot: Option<SlotDefinition> = None;

        let mut value = if let Some(pivot) = &sd.pivot_operation {
            match pivot.direction {
                PivotDirection::Melt => melt(pivot, source, |name| {
                    view.induced_slot(name, source_type)
                        .and_then(|slot| slot.unit)
                        .and_then(|unit| unit.preferred_code().map(str::to_string))
                }),
                PivotDirection::Unmelt => {
                    let name = sd.populated_from.as_deref().unwrap_or(&sd.name);
                    match source.get(name) {
                        Some(records) => Value::Object(unmelt(pivot, records)),
                        None => Value::Null,
                    }
                }
            }
        } else if let Some(literal) = &sd.value {
            literal.clone()
        } else if let Some(config) = &sd.unit_conversion {
            let name = sd.populated_from.as_deref().unwrap_or(&sd.name);
            let slot = view.induced_slot(name, source_type);
            let raw = source.get(name).cloned().unwrap_or(Value::Null);
            convert_value(config, &raw, slot.as_ref())?
        } else if let Some(expr) = &sd.expr {
            self.evaluate_expr(expr, bindings)?
        } else if let Some(populated_from) = &sd.populated_from {
            if sd.is_dot_path() {
                self.follow_path(sd, populated_from, bindings)?
            } else {
                source_slot = view.induced_slot(populated_from, source_type);
                source.get(populated_from).cloned().unwrap_or(Value::Null)
            }
        } else if !sd.sources.is_empty() {
            let present: Vec<(&String, &Value)> = sd
                .sources
                .iter()
                .filter_map(|name| source.get(name).filter(|v| !v.is_null()).map(|v| (name, v)))
                .collect();
            match present.as_slice() {
                [] => Value::Null,
                [(name, value)] => {
                    source_slot = view.induced_slot(name, source_type);
                    (*value).clone()
                }
                many => {
                    return Err(Error::Ambiguity {
                        class_name: cd.name.clone(),
                        slot_name: sd.name.clone(),
                        candidates: many.iter().map(|(name, _)| (*name).clone()).collect(),
                    })
                }
            }
        } else if sd.type_designator {
            Value::String(cd.name.clone())
        } else {
            source_slot = view.induced_slot(&sd.name, source_type);
            source.get(&sd.name).cloned().unwrap_or(Value::Null)
        };

        if let Some(slot) = &source_slot {
            if !value.is_null() {
                value = self.descend(value, slot, sd)?;
            }
        }
        if let Some(operation) = &sd.aggregation_operation {
            value = aggregate(operation, &value)?;
        }
        if has_value_mappings(sd) {
            value = apply_value_mappings(sd, value, bindings, &self.evaluator())?;
        }
        self.post_process(cd, sd, value, source_slot.as_ref(), source)
    }

    fn evaluate_expr(&self, expr: &str, bindings: &Bindings<'_>) -> Result<Value> {
        if is_block(expr) {
            if !self.options.unrestricted_eval {
                return Err(Error::expression(
                    expr,
                    "multi-line blocks require unrestricted evaluation",
                ));
            }
            return Ok(Evaluator::permissive()
                .execute_block(expr, &bindings.with_source_object())?
                .to_json());
        }
        match Evaluator::restricted().evaluate(expr, bindings) {
            Ok(value) => Ok(value.to_json()),
            Err(err) if err.is_expression_error() && self.options.unrestricted_eval => {
                debug!(expr, error = %err, "Falling back to permissive evaluation");
                Ok(Evaluator::permissive()
                    .evaluate(expr, &bindings.with_source_object())?
                    .to_json())
            }
            Err(err) => Err(err),
        }
    }

    fn follow_path(&self, sd: &SlotDerivation, path: &str, bindings: &Bindings<'_>) -> Result<Value> {
        let source_type = bindings.class_name();
        if self.object_index.is_empty() {
            if self.options.strict {
                return Err(Error::specification(format!(
                    "slot '{}' follows '{}' but no object index has been built",
                    sd.name, path
                )));
            }
            warn!(slot = %sd.name, path, "No object index; dot-path yields null");
            return Ok(Value::Null);
        }
        if source_slot(sd, &self.source_schemaview, source_type).is_none() {
            if self.options.strict {
                return Err(Error::specification(format!(
                    "path '{}' does not resolve through class ranges of '{}'",
                    path, source_type
                )));
            }
            warn!(slot = %sd.name, path, source_type, "Dot-path does not resolve in the source schema");
            return Ok(Value::Null);
        }

        let proxy = self.object_index.bless(bindings.source(), source_type);
        if self.options.strict {
            let head = path.split('.').next().unwrap_or(path);
            if let Datum::Object(Proxy::Stub { id, .. }) = self.object_index.resolve_attribute(&proxy, head) {
                return Err(Error::specification(format!(
                    "dangling reference {} in '{}' of '{}'",
                    id, head, source_type
                )));
            }
        }
        Ok(self.object_index.eval_path(&proxy, path).to_json())
    }

    /// Recurse into nested values along the source slot's range
    fn descend(&self, value: Value, slot: &SlotDefinition, sd: &SlotDerivation) -> Result<Value> {
        let Some(range) = slot.range.as_deref() else {
            return Ok(if slot.is_multivalued() { to_multivalued(value) } else { value });
        };
        let kind = self.source_schemaview.range_kind(range);
        let local = Some(&sd.object_derivations);
        let nested = |item: &Value| -> Result<Value> {
            match kind {
                RangeKind::Class => self.transform(item, range, sd.range.as_deref(), local, false),
                RangeKind::Enum => self.transform_enum(item, range),
                _ => Ok(item.clone()),
            }
        };

        if !slot.is_multivalued() {
            return nested(&value);
        }
        match &value {
            Value::Array(items) => Ok(Value::Array(items.iter().map(&nested).collect::<Result<_>>()?)),
            Value::Object(dict) if kind == RangeKind::Class && slot.inlined_as_list != Some(true) => {
                Ok(Value::Object(
                    dict.iter()
                        .map(|(key, item)| Ok((key.clone(), nested(item)?)))
                        .collect::<Result<_>>()?,
                ))
            }
            scalar => Ok(Value::Array(vec![nested(scalar)?])),
        }
    }

    fn post_process(
        &self,
        cd: &ClassDerivation,
        sd: &SlotDerivation,
        mut value: Value,
        source_slot: Option<&SlotDefinition>,
        source: &Map<String, Value>,
    ) -> Result<Value> {
        let target_slot = self.target_slot(cd, sd);
        let stringification = sd.stringification.as_ref();
        let reversed = stringification.is_some_and(|s| s.reversed);

        // cardinality
        if let (Some(config), true) = (stringification, reversed) {
            value = destringify(&value, config)?;
        } else {
            let cast_multivalued = sd.cast_collection_as.is_some_and(|c| c.is_multivalued());
            let target_multivalued = stringification.is_none()
                && sd.cast_collection_as != Some(CollectionType::SingleValued)
                && target_slot.as_ref().is_some_and(SlotDefinition::is_multivalued);
            if cast_multivalued || target_multivalued {
                let keyed = matches!(value, Value::Object(_))
                    && (source_slot.is_some_and(SlotDefinition::is_multivalued)
                        || sd.dictionary_key.is_some()
                        || sd.cast_collection_as == Some(CollectionType::MultiValuedDict));
                if !keyed {
                    value = to_multivalued(value);
                }
            }
        }
        if sd.cast_collection_as == Some(CollectionType::SingleValued) {
            value = to_single_valued(value, &sd.name)?;
        }
        if let (Some(config), false) = (stringification, reversed) {
            if !config.over_slots.is_empty() {
                value = Value::Array(
                    config
                        .over_slots
                        .iter()
                        .filter_map(|name| source.get(name).filter(|v| !v.is_null()).cloned())
                        .collect(),
                );
            }
            value = stringify(&value, config)?;
        }

        // datatype
        if self.options.coerce_types && !value.is_null() {
            let range = sd.range.clone().or_else(|| self.declared_target_range(cd, sd));
            if let Some(primitive) = range.as_deref().and_then(|r| self.primitive_of(r)) {
                value = self.coercer.coerce(&value, primitive);
            }
        }

        // compact dicts
        let expand = sd.cast_collection_as == Some(CollectionType::MultiValuedList);
        if let (Some(key), Value::Array(_), false) = (sd.dictionary_key.as_deref(), &value, expand) {
            value = list_to_compact_dict(value, key);
        }
        if expand && value.is_object() {
            match self.dictionary_key_for(sd, source_slot) {
                Some(key) => value = compact_dict_to_list(value, &key),
                None => warn!(slot = %sd.name, "No identifier to re-inject when expanding a compact dict"),
            }
        }
        Ok(value)
    }

    fn dictionary_key_for(&self, sd: &SlotDerivation, source_slot: Option<&SlotDefinition>) -> Option<String> {
        if let Some(key) = &sd.dictionary_key {
            return Some(key.clone());
        }
        let source_range = source_slot.and_then(|slot| slot.range.as_deref());
        if let Some(id) = source_range.and_then(|r| self.source_schemaview.get_identifier_slot(r, true)) {
            return Some(id.name);
        }
        let target = self.target_schemaview()?;
        let id = sd.range.as_deref().and_then(|r| target.get_identifier_slot(r, true))?;
        Some(id.name)
    }

    fn target_slot(&self, cd: &ClassDerivation, sd: &SlotDerivation) -> Option<SlotDefinition> {
        self.target_schemaview()?.induced_slot(&sd.name, &cd.name)
    }

    /// The range written on the target slot, ignoring the default range
    fn declared_target_range(&self, cd: &ClassDerivation, sd: &SlotDerivation) -> Option<String> {
        let target = self.target_schemaview()?;
        let schema = target.schema();
        let class = schema.classes.get(&cd.name);
        class
            .and_then(|class| class.slot_usage.get(&sd.name))
            .and_then(|slot| slot.range.clone())
            .or_else(|| class.and_then(|class| class.attributes.get(&sd.name)).and_then(|slot| slot.range.clone()))
            .or_else(|| schema.slots.get(&sd.name).and_then(|slot| slot.range.clone()))
    }

    fn primitive_of(&self, range: &str) -> Option<Primitive> {
        self.source_schemaview.primitive_of(range).or_else(|| {
            self.target_schemaview
                .get()
                .and_then(Option::as_ref)
                .and_then(|target| target.primitive_of(range))
        })
    }

    fn unmelt_object(&self, cd: &ClassDerivation, obj: &Value) -> Value {
        let Some(pivot) = &cd.pivot_operation else {
            return obj.clone();
        };
        let wide = unmelt(pivot, obj);
        let mut target = Map::new();
        for (key, value) in wide {
            if value.is_null() {
                continue;
            }
            let range = cd
                .slot_derivations
                .get(&key)
                .and_then(|sd| sd.range.clone())
                .or_else(|| {
                    let class_name = pivot.unmelt_to_class.as_deref().unwrap_or(&cd.name);
                    self.target_schemaview()?
                        .induced_slot(&key, class_name)
                        .and_then(|slot| slot.range)
                });
            let value = match range.as_deref().and_then(|r| self.primitive_of(r)) {
                Some(primitive) if self.options.coerce_types => self.coercer.coerce(&value, primitive),
                _ => value,
            };
            target.insert(key, value);
        }
        Value::Object(target)
    }
}
