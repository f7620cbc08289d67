//! Mapping of enum values through enum derivations
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::Result;
use crate::expr::{Datum, Evaluator, MapEnvironment, SOURCE_VARIABLE};
use crate::spec::{EnumDerivation, PermissibleValueDerivation, TransformationSpecification};
use serde_json::Value;
use tracing::{debug, trace};

/// The enum derivation populated from `enum_name`
pub fn find_enum_derivation<'s>(
    specification: &'s TransformationSpecification,
    enum_name: &str,
) -> Option<&'s EnumDerivation> {
    specification
        .enum_derivations
        .values()
        .find(|ed| ed.source_enum() == enum_name || ed.sources.iter().any(|s| s == enum_name))
}

/// Map a permissible value of `enum_name` to its target value
///
/// Values of enums without a derivation pass through. Otherwise `expr` wins,
/// then the first matching permissible value derivation; unmatched values
/// pass through only when the derivation mirrors its source.
pub fn transform_enum(
    specification: &TransformationSpecification,
    evaluator: &Evaluator,
    value: &Value,
    enum_name: &str,
) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| transform_enum(specification, evaluator, item, enum_name))
                .collect::<Result<_>>()?,
        )),
        _ => {
            let Some(ed) = find_enum_derivation(specification, enum_name) else {
                debug!(enum_name, "No enum derivation; passing value through");
                return Ok(value.clone());
            };
            map_permissible_value(ed, evaluator, value)
        }
    }
}

fn map_permissible_value(ed: &EnumDerivation, evaluator: &Evaluator, value: &Value) -> Result<Value> {
    let env = MapEnvironment::new().with(SOURCE_VARIABLE, Datum::from_json(value));
    if let Some(expr) = &ed.expr {
        return Ok(evaluator.evaluate(expr, &env)?.to_json());
    }

    let text = Datum::from_json(value).to_display_string();
    for pvd in ed.permissible_value_derivations.values() {
        if matches(pvd, &text, evaluator, &env)? {
            trace!(enum_name = %ed.name, from = %text, to = %pvd.name, "Mapped permissible value");
            if pvd.hide {
                return Ok(Value::Null);
            }
            return Ok(Value::String(pvd.name.clone()));
        }
    }

    if ed.mirror_source {
        Ok(value.clone())
    } else {
        debug!(enum_name = %ed.name, value = %text, "No permissible value derivation matches");
        Ok(Value::Null)
    }
}

fn matches(
    pvd: &PermissibleValueDerivation,
    text: &str,
    evaluator: &Evaluator,
    env: &MapEnvironment,
) -> Result<bool> {
    if let Some(guard) = &pvd.expr {
        return Ok(evaluator.evaluate(guard, env)?.truthy());
    }
    Ok(pvd.source_values().contains(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn specification() -> TransformationSpecification {
        TransformationSpecification::from_value(json!({
            "enum_derivations": {
                "Status": {
                    "populated_from": "SourceStatus",
                    "permissible_value_derivations": {
                        "ACTIVE": {"populated_from": "active", "sources": ["enabled"]},
                        "INACTIVE": {"sources": ["disabled", "off"]}
                    }
                },
                "Color": {"populated_from": "Colour", "mirror_source": true, "permissible_value_derivations": {
                    "red": {"populated_from": "rouge"}
                }},
                "Grade": {"expr": "'grade_' + src"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_permissible_value_derivations() {
        let spec = specification();
        let evaluator = Evaluator::restricted();
        let map = |v: Value| transform_enum(&spec, &evaluator, &v, "SourceStatus").unwrap();
        assert_eq!(map(json!("active")), json!("ACTIVE"));
        assert_eq!(map(json!("enabled")), json!("ACTIVE"));
        assert_eq!(map(json!("off")), json!("INACTIVE"));
        assert_eq!(map(json!("unknown")), Value::Null);
        // a derivation with sources does not read its own name
        assert_eq!(map(json!("INACTIVE")), Value::Null);
        assert_eq!(map(json!(["active", "off"])), json!(["ACTIVE", "INACTIVE"]));
    }

    #[test]
    fn test_mirror_source_and_expr() {
        let spec = specification();
        let evaluator = Evaluator::restricted();
        assert_eq!(transform_enum(&spec, &evaluator, &json!("rouge"), "Colour").unwrap(), json!("red"));
        assert_eq!(transform_enum(&spec, &evaluator, &json!("vert"), "Colour").unwrap(), json!("vert"));
        assert_eq!(transform_enum(&spec, &evaluator, &json!("a"), "Grade").unwrap(), json!("grade_a"));
        assert_eq!(transform_enum(&spec, &evaluator, &json!("x"), "Unmapped").unwrap(), json!("x"));
    }
}
