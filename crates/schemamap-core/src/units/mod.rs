//! Unit conversion across unit systems
//!
//! Every system parses codes into the same UCUM-based registry. The non-UCUM
//! systems additionally accept common symbol spellings (`°C`, `mph`, `m^2`)
//! which are rewritten into UCUM codes before lookup.
//!
//! # Example
//!
//! ```
//! use schemamap_core::units::{convert_units, UnitSystem};
//!
//! let cm = convert_units(1.8, "m", "cm", UnitSystem::Ucum).unwrap();
//! assert!((cm - 180.0).abs() < 1e-9);
//! ```
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

pub mod registry;
pub mod ucum;

pub use registry::{Dimension, UnitDef, UnitRegistry};
pub use ucum::{parse_unit, Quantity};

use crate::error::UnitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::trace;

/// Unit system a unit code is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitSystem {
    #[default]
    #[serde(alias = "ucum")]
    Ucum,
    #[serde(alias = "iec61360")]
    Iec61360,
    #[serde(alias = "si")]
    Si,
    #[serde(alias = "none")]
    None,
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSystem::Ucum => write!(f, "UCUM"),
            UnitSystem::Iec61360 => write!(f, "IEC61360"),
            UnitSystem::Si => write!(f, "SI"),
            UnitSystem::None => write!(f, "NONE"),
        }
    }
}

/// The shared registry for a unit system
pub fn registry(system: UnitSystem) -> &'static UnitRegistry {
    static UCUM: OnceLock<UnitRegistry> = OnceLock::new();
    static IEC61360: OnceLock<UnitRegistry> = OnceLock::new();
    static SI: OnceLock<UnitRegistry> = OnceLock::new();
    static NONE: OnceLock<UnitRegistry> = OnceLock::new();

    let cell = match system {
        UnitSystem::Ucum => &UCUM,
        UnitSystem::Iec61360 => &IEC61360,
        UnitSystem::Si => &SI,
        UnitSystem::None => &NONE,
    };
    cell.get_or_init(|| UnitRegistry::new(system))
}

/// Convert `magnitude` from one unit to another
///
/// Identical unit codes return the magnitude untouched. Otherwise both codes
/// are parsed and must share a dimension.
pub fn convert_units(
    magnitude: f64,
    from_unit: &str,
    to_unit: &str,
    system: UnitSystem,
) -> Result<f64, UnitError> {
    if from_unit == to_unit {
        return Ok(magnitude);
    }

    let registry = registry(system);
    let from = parse_unit(from_unit, registry)?;
    let to = parse_unit(to_unit, registry)?;

    if from.dimension != to.dimension {
        return Err(UnitError::Dimensionality {
            from: from_unit.to_string(),
            to: to_unit.to_string(),
            from_dimension: from.dimension.to_string(),
            to_dimension: to.dimension.to_string(),
        });
    }

    let base = magnitude * from.factor + from.offset;
    let converted = (base - to.offset) / to.factor;
    trace!(magnitude, from_unit, to_unit, converted, "converted units");
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_length_and_mass() {
        assert!(close(convert_units(1.8, "m", "cm", UnitSystem::Ucum).unwrap(), 180.0));
        assert!(close(convert_units(1.0, "[lb_av]", "kg", UnitSystem::Ucum).unwrap(), 0.45359237));
        assert!(close(convert_units(2.5, "km", "m", UnitSystem::Ucum).unwrap(), 2500.0));
    }

    #[test]
    fn test_temperature_offsets() {
        assert!(close(convert_units(0.0, "Cel", "K", UnitSystem::Ucum).unwrap(), 273.15));
        assert!(close(convert_units(100.0, "Cel", "[degF]", UnitSystem::Ucum).unwrap(), 212.0));
        assert!(close(convert_units(32.0, "°F", "°C", UnitSystem::Si).unwrap(), 0.0));
    }

    #[test]
    fn test_identity_short_circuit() {
        // not a known unit, but identical codes never reach the parser
        assert_eq!(convert_units(3.0, "widget", "widget", UnitSystem::Ucum).unwrap(), 3.0);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            convert_units(1.0, "m", "kg", UnitSystem::Ucum),
            Err(UnitError::Dimensionality { .. })
        ));
        assert!(matches!(
            convert_units(1.0, "furlong", "m", UnitSystem::Ucum),
            Err(UnitError::UndefinedUnit { .. })
        ));
    }

    #[test]
    fn test_system_names() {
        let system: UnitSystem = serde_json::from_str("\"SI\"").unwrap();
        assert_eq!(system, UnitSystem::Si);
        let system: UnitSystem = serde_json::from_str("\"ucum\"").unwrap();
        assert_eq!(system, UnitSystem::Ucum);
        assert_eq!(UnitSystem::Iec61360.to_string(), "IEC61360");
    }
}
