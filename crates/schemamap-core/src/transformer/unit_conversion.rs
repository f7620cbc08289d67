//! Unit conversion of slot values during object mapping
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Result, UnitError};
use crate::spec::UnitConversionConfiguration;
use crate::units::{convert_units, UnitSystem};
use schemamap_schemas::SlotDefinition;
use serde_json::{Map, Number, Value};
use tracing::warn;

/// Field names used for composite values when the configuration leaves them unset
pub const DEFAULT_MAGNITUDE_SLOT: &str = "value";
pub const DEFAULT_UNIT_SLOT: &str = "unit";

/// Convert a scalar magnitude or a composite `{magnitude, unit}` value
///
/// Lists are converted element-wise. The source unit comes from the composite
/// value, then the configuration, then the source slot's unit metadata.
pub fn convert_value(
    config: &UnitConversionConfiguration,
    value: &Value,
    source_slot: Option<&SlotDefinition>,
) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| convert_value(config, item, source_slot))
                .collect::<Result<_>>()?,
        )),
        _ => convert_single(config, value, source_slot),
    }
}

fn convert_single(
    config: &UnitConversionConfiguration,
    value: &Value,
    source_slot: Option<&SlotDefinition>,
) -> Result<Value> {
    let system = unit_system(config);
    let (magnitude, from_unit) = if config.has_composite_source() {
        let Value::Object(composite) = value else {
            warn!(value = %value, "Expected a composite value with magnitude and unit");
            return Ok(value.clone());
        };
        let magnitude_slot = config.source_magnitude_slot.as_deref().unwrap_or(DEFAULT_MAGNITUDE_SLOT);
        let unit_slot = config.source_unit_slot.as_deref().unwrap_or(DEFAULT_UNIT_SLOT);
        let unit = composite
            .get(unit_slot)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| source_unit(config, source_slot));
        (composite.get(magnitude_slot).cloned().unwrap_or(Value::Null), unit)
    } else {
        (value.clone(), source_unit(config, source_slot))
    };

    if magnitude.is_null() {
        return Ok(Value::Null);
    }

    let converted = match (&from_unit, &config.target_unit) {
        (Some(from), Some(to)) if from == to => magnitude,
        (Some(from), Some(to)) => {
            let Some(number) = as_magnitude(&magnitude) else {
                warn!(value = %magnitude, unit = %from, "Cannot convert a non-numeric magnitude");
                return Ok(value.clone());
            };
            let converted = convert_units(number, from, to, system)?;
            Number::from_f64(converted).map(Value::Number).unwrap_or(Value::Null)
        }
        (None, Some(_)) => {
            return Err(UnitError::undefined("<no source unit>", system).into());
        }
        (_, None) => magnitude,
    };

    if !config.has_composite_target() {
        return Ok(converted);
    }
    let mut composite = Map::new();
    composite.insert(
        config
            .target_magnitude_slot
            .clone()
            .unwrap_or_else(|| DEFAULT_MAGNITUDE_SLOT.to_string()),
        converted,
    );
    let unit = config.target_unit.clone().or(from_unit);
    if let Some(unit) = unit {
        composite.insert(
            config
                .target_unit_slot
                .clone()
                .unwrap_or_else(|| DEFAULT_UNIT_SLOT.to_string()),
            Value::String(unit),
        );
    }
    Ok(Value::Object(composite))
}

fn source_unit(config: &UnitConversionConfiguration, source_slot: Option<&SlotDefinition>) -> Option<String> {
    config.source_unit.clone().or_else(|| {
        source_slot
            .and_then(|slot| slot.unit.as_ref())
            .and_then(|unit| unit.preferred_code())
            .map(str::to_string)
    })
}

fn as_magnitude(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The unit system a configuration converts in
pub fn unit_system(config: &UnitConversionConfiguration) -> UnitSystem {
    config
        .source_unit_scheme
        .or(config.target_unit_scheme)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use schemamap_schemas::UnitOfMeasure;
    use serde_json::json;

    fn height_slot() -> SlotDefinition {
        SlotDefinition {
            unit: Some(UnitOfMeasure::ucum("m")),
            ..SlotDefinition::new("height")
        }
    }

    fn to_cm() -> UnitConversionConfiguration {
        UnitConversionConfiguration {
            target_unit: Some("cm".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_scalar_from_slot_metadata() {
        let converted = convert_value(&to_cm(), &json!(1.8), Some(&height_slot())).unwrap();
        assert!((converted.as_f64().unwrap() - 180.0).abs() < 1e-9);
        assert!(converted.is_f64());
    }

    #[test]
    fn test_identity_returns_original_value() {
        let config = UnitConversionConfiguration {
            target_unit: Some("m".to_string()),
            ..Default::default()
        };
        assert_eq!(convert_value(&config, &json!(2), Some(&height_slot())).unwrap(), json!(2));
    }

    #[test]
    fn test_composite_source_and_target() {
        let config = UnitConversionConfiguration {
            target_unit: Some("g".to_string()),
            source_magnitude_slot: Some("amount".to_string()),
            source_unit_slot: Some("units".to_string()),
            target_magnitude_slot: Some("mass".to_string()),
            target_unit_slot: Some("mass_unit".to_string()),
            ..Default::default()
        };
        let converted = convert_value(&config, &json!({"amount": 1.5, "units": "kg"}), None).unwrap();
        assert_eq!(converted["mass_unit"], json!("g"));
        assert!((converted["mass"].as_f64().unwrap() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_source_unit_is_an_error() {
        let err = convert_value(&to_cm(), &json!(1.0), None).unwrap_err();
        assert!(matches!(err, Error::Unit(UnitError::UndefinedUnit { .. })));
        let err = convert_value(&to_cm(), &json!(1.0), Some(&SlotDefinition {
            unit: Some(UnitOfMeasure::ucum("kg")),
            ..SlotDefinition::new("mass")
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Unit(UnitError::Dimensionality { .. })));
    }
}
