//! Structural merging of JSON-shaped schema fragments
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use serde_json::Value;

/// Deep merge where `patch` wins
///
/// Mappings are merged key by key; any other value in `patch` replaces the
/// corresponding value in `target`. A `null` in `patch` leaves `target` alone.
pub fn merge_override(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (_, Value::Null) => {}
        (Value::Object(target), Value::Object(patch)) => {
            for (key, patch_value) in patch {
                match target.get_mut(key) {
                    Some(existing) => merge_override(existing, patch_value),
                    None => {
                        if !patch_value.is_null() {
                            target.insert(key.clone(), patch_value.clone());
                        }
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Deep merge that only fills holes in `target`
///
/// A key of `target` counts as a hole when it is absent, `null`, an empty
/// list or an empty mapping. Non-empty mappings are recursed into.
pub fn merge_fill(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, source_value) in source {
                match target.get_mut(key) {
                    Some(existing) if !is_empty(existing) => merge_fill(existing, source_value),
                    Some(existing) => *existing = source_value.clone(),
                    None => {
                        target.insert(key.clone(), source_value.clone());
                    }
                }
            }
        }
        (target, source) => {
            if is_empty(target) {
                *target = source.clone();
            }
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_override_is_deep() {
        let mut target = json!({"a": {"x": 1, "y": 2}, "b": [1]});
        merge_override(&mut target, &json!({"a": {"y": 3}, "b": [2, 3], "c": true}));
        assert_eq!(target, json!({"a": {"x": 1, "y": 3}, "b": [2, 3], "c": true}));
    }

    #[test]
    fn test_fill_keeps_existing() {
        let mut target = json!({"range": "string", "description": null, "mixins": []});
        merge_fill(
            &mut target,
            &json!({"range": "integer", "description": "d", "mixins": ["M"], "required": true}),
        );
        assert_eq!(
            target,
            json!({"range": "string", "description": "d", "mixins": ["M"], "required": true})
        );
    }
}
