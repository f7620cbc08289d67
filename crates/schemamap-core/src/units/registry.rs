//! Unit definitions, prefixes and dimensions
//!
//! Magnitudes are expressed relative to the UCUM base units
//! (m, g, s, A, K, mol, cd).
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::UnitSystem;
use std::collections::HashMap;
use std::fmt;

/// Exponents of the seven base dimensions: L, M, T, I, Θ, N, J
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Dimension(pub [i8; 7]);

const DIMENSION_SYMBOLS: [&str; 7] = ["L", "M", "T", "I", "Θ", "N", "J"];

impl Dimension {
    pub const NONE: Dimension = Dimension([0; 7]);

    pub const fn new(l: i8, m: i8, t: i8, i: i8, th: i8, n: i8, j: i8) -> Self {
        Dimension([l, m, t, i, th, n, j])
    }

    pub fn powi(self, exp: i32) -> Self {
        let mut out = self.0;
        for d in out.iter_mut() {
            *d = (*d as i32 * exp) as i8;
        }
        Dimension(out)
    }

    pub fn mul(self, other: Dimension) -> Self {
        let mut out = self.0;
        for (d, o) in out.iter_mut().zip(other.0) {
            *d += o;
        }
        Dimension(out)
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .zip(DIMENSION_SYMBOLS)
            .filter(|(exp, _)| **exp != 0)
            .map(|(exp, sym)| {
                if *exp == 1 {
                    sym.to_string()
                } else {
                    format!("{}{}", sym, exp)
                }
            })
            .collect();
        write!(f, "{}", parts.join("."))
    }
}

/// A named unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    /// Multiplier to base units
    pub factor: f64,
    /// Offset added after scaling, for temperature scales
    pub offset: f64,
    pub dimension: Dimension,
    /// Whether metric prefixes may be applied
    pub metric: bool,
}

const L: Dimension = Dimension::new(1, 0, 0, 0, 0, 0, 0);
const M: Dimension = Dimension::new(0, 1, 0, 0, 0, 0, 0);
const T: Dimension = Dimension::new(0, 0, 1, 0, 0, 0, 0);
const I: Dimension = Dimension::new(0, 0, 0, 1, 0, 0, 0);
const TH: Dimension = Dimension::new(0, 0, 0, 0, 1, 0, 0);
const N: Dimension = Dimension::new(0, 0, 0, 0, 0, 1, 0);
const J: Dimension = Dimension::new(0, 0, 0, 0, 0, 0, 1);
const NONE: Dimension = Dimension::NONE;

const AREA: Dimension = Dimension::new(2, 0, 0, 0, 0, 0, 0);
const VOLUME: Dimension = Dimension::new(3, 0, 0, 0, 0, 0, 0);
const FREQUENCY: Dimension = Dimension::new(0, 0, -1, 0, 0, 0, 0);
const FORCE: Dimension = Dimension::new(1, 1, -2, 0, 0, 0, 0);
const PRESSURE: Dimension = Dimension::new(-1, 1, -2, 0, 0, 0, 0);
const ENERGY: Dimension = Dimension::new(2, 1, -2, 0, 0, 0, 0);
const POWER: Dimension = Dimension::new(2, 1, -3, 0, 0, 0, 0);
const CHARGE: Dimension = Dimension::new(0, 0, 1, 1, 0, 0, 0);
const VOLTAGE: Dimension = Dimension::new(2, 1, -3, -1, 0, 0, 0);
const RESISTANCE: Dimension = Dimension::new(2, 1, -3, -2, 0, 0, 0);

/// (symbol, factor, offset, dimension, metric)
const UCUM_UNITS: &[(&str, f64, f64, Dimension, bool)] = &[
    // base units
    ("m", 1.0, 0.0, L, true),
    ("g", 1.0, 0.0, M, true),
    ("s", 1.0, 0.0, T, true),
    ("A", 1.0, 0.0, I, true),
    ("K", 1.0, 0.0, TH, true),
    ("mol", 1.0, 0.0, N, true),
    ("cd", 1.0, 0.0, J, true),
    // dimensionless
    ("1", 1.0, 0.0, NONE, false),
    ("%", 0.01, 0.0, NONE, false),
    ("[ppth]", 1e-3, 0.0, NONE, false),
    ("[ppm]", 1e-6, 0.0, NONE, false),
    ("[ppb]", 1e-9, 0.0, NONE, false),
    ("rad", 1.0, 0.0, NONE, true),
    ("sr", 1.0, 0.0, NONE, true),
    ("deg", std::f64::consts::PI / 180.0, 0.0, NONE, false),
    // time
    ("min", 60.0, 0.0, T, false),
    ("h", 3600.0, 0.0, T, false),
    ("d", 86400.0, 0.0, T, false),
    ("wk", 604800.0, 0.0, T, false),
    ("mo", 2629800.0, 0.0, T, false),
    ("a", 31557600.0, 0.0, T, false),
    // length and area
    ("Ao", 1e-10, 0.0, L, false),
    ("[in_i]", 0.0254, 0.0, L, false),
    ("[ft_i]", 0.3048, 0.0, L, false),
    ("[yd_i]", 0.9144, 0.0, L, false),
    ("[mi_i]", 1609.344, 0.0, L, false),
    ("[nmi_i]", 1852.0, 0.0, L, false),
    ("ar", 100.0, 0.0, AREA, true),
    // volume
    ("L", 1e-3, 0.0, VOLUME, true),
    ("l", 1e-3, 0.0, VOLUME, true),
    ("[gal_us]", 3.785411784e-3, 0.0, VOLUME, false),
    ("[qt_us]", 9.46352946e-4, 0.0, VOLUME, false),
    ("[pt_us]", 4.73176473e-4, 0.0, VOLUME, false),
    ("[foz_us]", 2.95735295625e-5, 0.0, VOLUME, false),
    // mass
    ("t", 1e6, 0.0, M, true),
    ("u", 1.66053906660e-24, 0.0, M, true),
    ("[lb_av]", 453.59237, 0.0, M, false),
    ("[oz_av]", 28.349523125, 0.0, M, false),
    ("[stone_av]", 6350.29318, 0.0, M, false),
    // mechanics
    ("Hz", 1.0, 0.0, FREQUENCY, true),
    ("N", 1000.0, 0.0, FORCE, true),
    ("Pa", 1000.0, 0.0, PRESSURE, true),
    ("bar", 1e8, 0.0, PRESSURE, true),
    ("atm", 1.01325e8, 0.0, PRESSURE, false),
    ("m[Hg]", 1.33322387415e8, 0.0, PRESSURE, true),
    ("[psi]", 6.894757293168361e6, 0.0, PRESSURE, false),
    ("J", 1000.0, 0.0, ENERGY, true),
    ("cal", 4184.0, 0.0, ENERGY, true),
    ("[Cal]", 4.184e6, 0.0, ENERGY, false),
    ("eV", 1.602176634e-16, 0.0, ENERGY, true),
    ("W", 1000.0, 0.0, POWER, true),
    // electromagnetism
    ("C", 1.0, 0.0, CHARGE, true),
    ("V", 1000.0, 0.0, VOLTAGE, true),
    ("Ohm", 1000.0, 0.0, RESISTANCE, true),
    // temperature
    ("Cel", 1.0, 273.15, TH, false),
    ("[degF]", 5.0 / 9.0, 459.67 * 5.0 / 9.0, TH, false),
    ("[degR]", 5.0 / 9.0, 0.0, TH, false),
];

/// Metric prefixes, longest symbols first
const PREFIXES: &[(&str, f64)] = &[
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

/// Symbols and names accepted outside strict UCUM, mapped to UCUM codes
const SYMBOL_ALIASES: &[(&str, &str)] = &[
    ("°C", "Cel"),
    ("℃", "Cel"),
    ("degC", "Cel"),
    ("celsius", "Cel"),
    ("°F", "[degF]"),
    ("℉", "[degF]"),
    ("degF", "[degF]"),
    ("fahrenheit", "[degF]"),
    ("kelvin", "K"),
    ("meter", "m"),
    ("metre", "m"),
    ("meters", "m"),
    ("metres", "m"),
    ("centimeter", "cm"),
    ("centimetre", "cm"),
    ("millimeter", "mm"),
    ("kilometer", "km"),
    ("gram", "g"),
    ("grams", "g"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("second", "s"),
    ("seconds", "s"),
    ("sec", "s"),
    ("minute", "min"),
    ("minutes", "min"),
    ("hour", "h"),
    ("hours", "h"),
    ("hr", "h"),
    ("day", "d"),
    ("days", "d"),
    ("week", "wk"),
    ("year", "a"),
    ("years", "a"),
    ("yr", "a"),
    ("liter", "L"),
    ("litre", "L"),
    ("percent", "%"),
    ("in", "[in_i]"),
    ("inch", "[in_i]"),
    ("inches", "[in_i]"),
    ("ft", "[ft_i]"),
    ("foot", "[ft_i]"),
    ("feet", "[ft_i]"),
    ("yd", "[yd_i]"),
    ("mi", "[mi_i]"),
    ("mile", "[mi_i]"),
    ("miles", "[mi_i]"),
    ("mph", "[mi_i]/h"),
    ("lb", "[lb_av]"),
    ("lbs", "[lb_av]"),
    ("pound", "[lb_av]"),
    ("pounds", "[lb_av]"),
    ("oz", "[oz_av]"),
    ("gal", "[gal_us]"),
    ("psi", "[psi]"),
    ("mmHg", "mm[Hg]"),
    ("ppm", "[ppm]"),
    ("Ω", "Ohm"),
    ("ohm", "Ohm"),
];

/// Lookup tables for one unit system
#[derive(Debug)]
pub struct UnitRegistry {
    system: UnitSystem,
    units: HashMap<&'static str, UnitDef>,
    aliases: HashMap<&'static str, &'static str>,
}

impl UnitRegistry {
    pub fn new(system: UnitSystem) -> Self {
        let units = UCUM_UNITS
            .iter()
            .map(|(symbol, factor, offset, dimension, metric)| {
                (
                    *symbol,
                    UnitDef {
                        factor: *factor,
                        offset: *offset,
                        dimension: *dimension,
                        metric: *metric,
                    },
                )
            })
            .collect();
        let aliases = match system {
            UnitSystem::Ucum => HashMap::new(),
            _ => SYMBOL_ALIASES.iter().copied().collect(),
        };
        Self {
            system,
            units,
            aliases,
        }
    }

    pub fn system(&self) -> UnitSystem {
        self.system
    }

    /// Replace a whole-expression alias by its UCUM code
    pub fn alias<'a>(&self, code: &'a str) -> &'a str {
        self.aliases.get(code).copied().unwrap_or(code)
    }

    /// Resolve an atomic symbol, optionally carrying a metric prefix
    pub fn lookup(&self, symbol: &str) -> Option<UnitDef> {
        let symbol = self.alias(symbol);
        if let Some(unit) = self.units.get(symbol) {
            return Some(*unit);
        }
        PREFIXES.iter().find_map(|(prefix, scale)| {
            let rest = symbol.strip_prefix(prefix)?;
            let unit = self.units.get(rest)?;
            if !unit.metric {
                return None;
            }
            Some(UnitDef {
                factor: unit.factor * scale,
                ..*unit
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_lookup() {
        let registry = UnitRegistry::new(UnitSystem::Ucum);
        let cm = registry.lookup("cm").unwrap();
        assert_eq!(cm.dimension, L);
        assert!((cm.factor - 0.01).abs() < 1e-15);
        assert_eq!(registry.lookup("kg").unwrap().factor, 1000.0);
        // exact symbols take precedence over prefix splits
        assert_eq!(registry.lookup("cd").unwrap().dimension, J);
        assert_eq!(registry.lookup("min").unwrap().factor, 60.0);
        // non-metric units take no prefix
        assert!(registry.lookup("kh").is_none());
        assert!(registry.lookup("furlong").is_none());
    }

    #[test]
    fn test_aliases_only_outside_ucum() {
        assert!(UnitRegistry::new(UnitSystem::Ucum).lookup("°C").is_none());
        assert_eq!(
            UnitRegistry::new(UnitSystem::Si).lookup("°C").unwrap().offset,
            273.15
        );
    }

    #[test]
    fn test_dimension_display() {
        assert_eq!(PRESSURE.to_string(), "L-1.M.T-2");
        assert_eq!(NONE.to_string(), "dimensionless");
    }
}
