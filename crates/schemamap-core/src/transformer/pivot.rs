//! Pivot operations between wide records and entity-attribute-value records
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::spec::PivotOperation;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Wide object to EAV records, one per populated source slot
///
/// With no `source_slots` every key of the object that is not an id slot is
/// melted. `unit_of` supplies the unit recorded in `unit_slot`.
pub fn melt(pivot: &PivotOperation, source: &Map<String, Value>, unit_of: impl Fn(&str) -> Option<String>) -> Value {
    let names: Vec<&str> = if pivot.source_slots.is_empty() {
        source
            .keys()
            .map(String::as_str)
            .filter(|key| !pivot.id_slots.iter().any(|id| id == key))
            .collect()
    } else {
        pivot.source_slots.iter().map(String::as_str).collect()
    };

    let records = names
        .into_iter()
        .filter_map(|name| {
            let value = source.get(name).filter(|v| !v.is_null())?;
            let mut record = Map::new();
            for id in &pivot.id_slots {
                if let Some(id_value) = source.get(id) {
                    record.insert(id.clone(), id_value.clone());
                }
            }
            record.insert(pivot.variable_slot().to_string(), Value::String(name.to_string()));
            record.insert(pivot.value_slot().to_string(), value.clone());
            if let Some(unit_slot) = &pivot.unit_slot {
                if let Some(unit) = unit_of(name) {
                    record.insert(unit_slot.clone(), Value::String(unit));
                }
            }
            Some(Value::Object(record))
        })
        .collect();
    Value::Array(records)
}

/// EAV records to one wide object
///
/// `source` is a single record, a list of records, or a container whose
/// list-valued fields hold records. Records without a variable are skipped.
pub fn unmelt(pivot: &PivotOperation, source: &Value) -> Map<String, Value> {
    let variable_slot = pivot.variable_slot();
    let records = collect_records(source, variable_slot);
    debug!(records = records.len(), variable_slot, "Unmelting records");

    let mut wide = Map::new();
    for record in records {
        let Some(variable) = record.get(variable_slot).and_then(as_key) else {
            warn!(variable_slot, "Skipping record without a variable");
            continue;
        };
        let unit = pivot
            .unit_slot
            .as_deref()
            .and_then(|slot| record.get(slot))
            .and_then(as_key)
            .unwrap_or_default();
        let key = pivot
            .slot_name_template()
            .replace("{variable}", &variable)
            .replace("{unit}", &unit);
        if !pivot.unmelt_to_slots.is_empty() && !pivot.unmelt_to_slots.contains(&key) {
            continue;
        }
        let value = record.get(pivot.value_slot()).cloned().unwrap_or(Value::Null);
        wide.insert(key, value);
    }
    wide
}

fn collect_records<'v>(source: &'v Value, variable_slot: &str) -> Vec<&'v Map<String, Value>> {
    match source {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(object) if object.contains_key(variable_slot) => vec![object],
        Value::Object(container) => container
            .values()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_object)
            .collect(),
        _ => Vec::new(),
    }
}

fn as_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::PivotDirection;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn eav() -> PivotOperation {
        PivotOperation {
            direction: PivotDirection::Unmelt,
            variable_slot: Some("att".to_string()),
            value_slot: Some("val".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unmelt_container() {
        let wide = unmelt(
            &eav(),
            &json!({"measurements": [{"att": "height", "val": 1.8}, {"att": "weight", "val": 75}, {"val": 3}]}),
        );
        assert_eq!(Value::Object(wide), json!({"height": 1.8, "weight": 75}));
    }

    #[test]
    fn test_unmelt_single_record_with_unit_template() {
        let pivot = PivotOperation {
            unit_slot: Some("unit".to_string()),
            slot_name_template: Some("{variable}_{unit}".to_string()),
            ..eav()
        };
        let wide = unmelt(&pivot, &json!({"att": "height", "unit": "cm"}));
        assert_eq!(Value::Object(wide), json!({"height_cm": null}));
    }

    #[test]
    fn test_melt() {
        let pivot = PivotOperation {
            direction: PivotDirection::Melt,
            source_slots: vec!["height".to_string(), "weight".to_string(), "age".to_string()],
            id_slots: vec!["id".to_string()],
            unit_slot: Some("unit".to_string()),
            ..Default::default()
        };
        let source = json!({"id": "P1", "height": 1.8, "weight": 75, "age": null});
        let records = melt(&pivot, source.as_object().unwrap(), |name| {
            (name == "height").then(|| "m".to_string())
        });
        assert_eq!(
            records,
            json!([
                {"id": "P1", "variable": "height", "value": 1.8, "unit": "m"},
                {"id": "P1", "variable": "weight", "value": 75}
            ])
        );
    }
}
