//! Value mappings applied after the primary slot value is computed
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::Result;
use crate::expr::{Datum, Environment, Evaluator};
use crate::spec::SlotDerivation;
use serde_json::Value;
use tracing::trace;

/// Whether a slot derivation declares any value mapping
pub fn has_value_mappings(sd: &SlotDerivation) -> bool {
    !sd.value_mappings.is_empty()
        || !sd.expression_to_value_mappings.is_empty()
        || !sd.expression_to_expression_mappings.is_empty()
}

/// Replace the primary value with the first applicable mapping
///
/// Lookup order: literal `value_mappings` on the stringified value
/// (element-wise for lists), then the guards of
/// `expression_to_value_mappings`, then those of
/// `expression_to_expression_mappings`.
pub fn apply_value_mappings(
    sd: &SlotDerivation,
    value: Value,
    env: &dyn Environment,
    evaluator: &Evaluator,
) -> Result<Value> {
    if !sd.value_mappings.is_empty() {
        let (mapped, hit) = map_literal(sd, value);
        if hit {
            return Ok(mapped);
        }
        return map_expressions(sd, mapped, env, evaluator);
    }
    map_expressions(sd, value, env, evaluator)
}

fn map_literal(sd: &SlotDerivation, value: Value) -> (Value, bool) {
    match value {
        Value::Array(items) => {
            let mut any = false;
            let items = items
                .into_iter()
                .map(|item| {
                    let (mapped, hit) = map_literal(sd, item);
                    any |= hit;
                    mapped
                })
                .collect();
            (Value::Array(items), any)
        }
        Value::Null => (Value::Null, false),
        other => {
            let key = Datum::from_json(&other).to_display_string();
            match sd.value_mappings.get(&key) {
                Some(mapped) => {
                    trace!(slot = %sd.name, from = %key, to = %mapped, "Applied value mapping");
                    (mapped.clone(), true)
                }
                None => (other, false),
            }
        }
    }
}

fn map_expressions(
    sd: &SlotDerivation,
    value: Value,
    env: &dyn Environment,
    evaluator: &Evaluator,
) -> Result<Value> {
    for (guard, mapped) in &sd.expression_to_value_mappings {
        if evaluator.evaluate(guard, env)?.truthy() {
            trace!(slot = %sd.name, guard = %guard, "Expression-to-value mapping applied");
            return Ok(mapped.clone());
        }
    }
    for (guard, expr) in &sd.expression_to_expression_mappings {
        if evaluator.evaluate(guard, env)?.truthy() {
            trace!(slot = %sd.name, guard = %guard, "Expression-to-expression mapping applied");
            return Ok(evaluator.evaluate(expr, env)?.to_json());
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::MapEnvironment;
    use indexmap::IndexMap;
    use serde_json::json;

    fn derivation() -> SlotDerivation {
        SlotDerivation {
            value_mappings: IndexMap::from([
                ("M".to_string(), json!("male")),
                ("F".to_string(), json!("female")),
                ("1".to_string(), json!(true)),
            ]),
            ..SlotDerivation::new("sex")
        }
    }

    #[test]
    fn test_literal_mappings() {
        let env = MapEnvironment::new();
        let evaluator = Evaluator::restricted();
        let sd = derivation();
        assert_eq!(apply_value_mappings(&sd, json!("F"), &env, &evaluator).unwrap(), json!("female"));
        assert_eq!(apply_value_mappings(&sd, json!(1), &env, &evaluator).unwrap(), json!(true));
        assert_eq!(apply_value_mappings(&sd, json!(["M", "X"]), &env, &evaluator).unwrap(), json!(["male", "X"]));
        assert_eq!(apply_value_mappings(&sd, json!("X"), &env, &evaluator).unwrap(), json!("X"));
    }

    #[test]
    fn test_expression_mappings_in_declaration_order() {
        let evaluator = Evaluator::restricted();
        let sd = SlotDerivation {
            expression_to_value_mappings: IndexMap::from([
                ("age < 18".to_string(), json!("minor")),
                ("age < 65".to_string(), json!("adult")),
            ]),
            expression_to_expression_mappings: IndexMap::from([(
                "age >= 65".to_string(),
                "'senior (' + str(age) + ')'".to_string(),
            )]),
            ..SlotDerivation::new("age_group")
        };
        let env = |age: i64| MapEnvironment::new().with("age", Datum::Int(age));
        assert_eq!(apply_value_mappings(&sd, Value::Null, &env(10), &evaluator).unwrap(), json!("minor"));
        assert_eq!(apply_value_mappings(&sd, Value::Null, &env(30), &evaluator).unwrap(), json!("adult"));
        assert_eq!(apply_value_mappings(&sd, Value::Null, &env(70), &evaluator).unwrap(), json!("senior (70)"));
    }
}
