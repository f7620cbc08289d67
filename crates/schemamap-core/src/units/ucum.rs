//! Parser for UCUM-style unit expressions
//!
//! Supports products (`.`), quotients (`/`), integer exponents (`m2`, `s-1`),
//! parenthesised sub-terms, bracketed atoms (`[in_i]`, `mm[Hg]`), powers of
//! ten (`10*3`) and curly-brace annotations, which are ignored.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::registry::{Dimension, UnitDef, UnitRegistry};
use crate::error::UnitError;
use regex::Regex;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::OnceLock;

/// A parsed unit expression reduced to base units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub factor: f64,
    pub offset: f64,
    pub dimension: Dimension,
}

impl Quantity {
    const ONE: Quantity = Quantity {
        factor: 1.0,
        offset: 0.0,
        dimension: Dimension::NONE,
    };

    fn from_def(def: UnitDef, exp: i32) -> Self {
        Quantity {
            factor: def.factor.powi(exp),
            offset: 0.0,
            dimension: def.dimension.powi(exp),
        }
    }

    fn times(self, other: Quantity) -> Self {
        Quantity {
            factor: self.factor * other.factor,
            offset: 0.0,
            dimension: self.dimension.mul(other.dimension),
        }
    }

    fn inverse(self) -> Self {
        Quantity {
            factor: 1.0 / self.factor,
            offset: 0.0,
            dimension: self.dimension.powi(-1),
        }
    }

    fn powi(self, exp: i32) -> Self {
        Quantity {
            factor: self.factor.powi(exp),
            offset: 0.0,
            dimension: self.dimension.powi(exp),
        }
    }
}

fn ten_power() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^10[\*\^]([+-]?[0-9]+)$").unwrap())
}

fn exponent_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<symbol>.*[^0-9+\-])(?P<exp>[+\-]?[0-9]+)$").unwrap())
}

/// Rewrite common non-UCUM spellings into UCUM syntax
pub fn normalize_code(code: &str, registry: &UnitRegistry) -> String {
    let trimmed = code.trim();
    let aliased = registry.alias(trimmed);
    let mut out = String::with_capacity(aliased.len());
    let mut chars = aliased.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            'µ' | 'μ' => out.push('u'),
            '²' => out.push('2'),
            '³' => out.push('3'),
            '·' | '⋅' => out.push('.'),
            '^' if !out.ends_with("10") => {}
            '*' if !out.ends_with("10") => out.push('.'),
            ' ' => {
                while chars.peek() == Some(&' ') {
                    chars.next();
                }
                let next_is_operator = matches!(chars.peek(), Some('/' | '.') | None);
                if !out.is_empty() && !out.ends_with(['/', '.']) && !next_is_operator {
                    out.push('.');
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Parse a unit expression
pub fn parse_unit(code: &str, registry: &UnitRegistry) -> Result<Quantity, UnitError> {
    let normalized = normalize_code(code, registry);
    if normalized.is_empty() {
        return Err(UnitError::undefined(code, registry.system()));
    }
    let mut parser = UnitParser {
        code,
        chars: normalized.chars().peekable(),
        registry,
        atoms: Vec::new(),
    };
    let quantity = parser.term()?;
    if parser.chars.peek().is_some() {
        return Err(UnitError::undefined(code, registry.system()));
    }

    // a lone affine unit keeps its offset; inside compound units it is a plain scale
    match parser.atoms.as_slice() {
        [(def, 1)] => Ok(Quantity {
            offset: def.offset,
            ..quantity
        }),
        _ => Ok(quantity),
    }
}

struct UnitParser<'a> {
    code: &'a str,
    chars: Peekable<Chars<'a>>,
    registry: &'a UnitRegistry,
    atoms: Vec<(UnitDef, i32)>,
}

impl<'a> UnitParser<'a> {
    fn undefined(&self) -> UnitError {
        UnitError::undefined(self.code, self.registry.system())
    }

    fn term(&mut self) -> Result<Quantity, UnitError> {
        let mut quantity = if self.chars.peek() == Some(&'/') {
            self.chars.next();
            self.component()?.inverse()
        } else {
            self.component()?
        };
        loop {
            match self.chars.peek() {
                Some('.') => {
                    self.chars.next();
                    quantity = quantity.times(self.component()?);
                }
                Some('/') => {
                    self.chars.next();
                    quantity = quantity.times(self.component()?.inverse());
                }
                _ => return Ok(quantity),
            }
        }
    }

    fn component(&mut self) -> Result<Quantity, UnitError> {
        match self.chars.peek() {
            Some('(') => {
                self.chars.next();
                let inner = self.term()?;
                if self.chars.next() != Some(')') {
                    return Err(self.undefined());
                }
                let exp = self.exponent();
                self.skip_annotation()?;
                Ok(inner.powi(exp.unwrap_or(1)))
            }
            Some('{') => {
                self.skip_annotation()?;
                Ok(Quantity::ONE)
            }
            Some(_) => {
                let atom = self.atom_text()?;
                self.skip_annotation()?;
                self.resolve_atom(&atom)
            }
            None => Err(self.undefined()),
        }
    }

    fn atom_text(&mut self) -> Result<String, UnitError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                '.' | '/' | '(' | ')' | '{' => break,
                '[' => {
                    text.push(c);
                    self.chars.next();
                    loop {
                        match self.chars.next() {
                            Some(']') => {
                                text.push(']');
                                break;
                            }
                            Some(inner) => text.push(inner),
                            None => return Err(self.undefined()),
                        }
                    }
                }
                _ => {
                    text.push(c);
                    self.chars.next();
                }
            }
        }
        if text.is_empty() {
            return Err(self.undefined());
        }
        Ok(text)
    }

    fn resolve_atom(&mut self, atom: &str) -> Result<Quantity, UnitError> {
        if let Some(caps) = ten_power().captures(atom) {
            let exp: i32 = caps[1].parse().map_err(|_| self.undefined())?;
            return Ok(Quantity {
                factor: 10f64.powi(exp),
                ..Quantity::ONE
            });
        }
        if let Some(def) = self.registry.lookup(atom) {
            self.atoms.push((def, 1));
            return Ok(Quantity::from_def(def, 1));
        }
        if let Some(caps) = exponent_suffix().captures(atom) {
            let exp: i32 = caps["exp"].parse().map_err(|_| self.undefined())?;
            if let Some(def) = self.registry.lookup(&caps["symbol"]) {
                self.atoms.push((def, exp));
                return Ok(Quantity::from_def(def, exp));
            }
        }
        if atom.chars().all(|c| c.is_ascii_digit()) {
            let factor: f64 = atom.parse().map_err(|_| self.undefined())?;
            return Ok(Quantity {
                factor,
                ..Quantity::ONE
            });
        }
        Err(self.undefined())
    }

    fn exponent(&mut self) -> Option<i32> {
        let mut text = String::new();
        if let Some(&sign @ ('+' | '-')) = self.chars.peek() {
            text.push(sign);
            self.chars.next();
        }
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        text.parse().ok()
    }

    fn skip_annotation(&mut self) -> Result<(), UnitError> {
        if self.chars.peek() != Some(&'{') {
            return Ok(());
        }
        for c in self.chars.by_ref() {
            if c == '}' {
                return Ok(());
            }
        }
        Err(self.undefined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitSystem;

    fn parse(code: &str) -> Quantity {
        parse_unit(code, &UnitRegistry::new(UnitSystem::Ucum)).unwrap()
    }

    #[test]
    fn test_compound_units() {
        let kmh = parse("km/h");
        assert!((kmh.factor - 1000.0 / 3600.0).abs() < 1e-12);
        assert_eq!(kmh.dimension, Dimension::new(1, 0, -1, 0, 0, 0, 0));

        let accel = parse("m.s-2");
        assert_eq!(accel.dimension, Dimension::new(1, 0, -2, 0, 0, 0, 0));

        let per_volume = parse("mol/(L.s)");
        assert_eq!(per_volume.dimension, Dimension::new(-3, 0, -1, 0, 0, 1, 0));
    }

    #[test]
    fn test_annotations_and_powers_of_ten() {
        assert_eq!(parse("{cells}/uL").dimension, Dimension::new(-3, 0, 0, 0, 0, 0, 0));
        assert_eq!(parse("10*3").factor, 1000.0);
        assert_eq!(parse("[in_i]2").dimension, Dimension::new(2, 0, 0, 0, 0, 0, 0));
        assert_eq!(parse("1").dimension, Dimension::NONE);
    }

    #[test]
    fn test_affine_offset_only_for_lone_units() {
        assert_eq!(parse("Cel").offset, 273.15);
        assert_eq!(parse("Cel/h").offset, 0.0);
    }

    #[test]
    fn test_normalization_outside_ucum() {
        let si = UnitRegistry::new(UnitSystem::Si);
        assert_eq!(normalize_code("m^2", &si), "m2");
        assert_eq!(normalize_code("kg·m/s²", &si), "kg.m/s2");
        assert_eq!(normalize_code("µg", &si), "ug");
        assert_eq!(normalize_code("°C", &si), "Cel");
        assert_eq!(normalize_code("N m", &si), "N.m");
        assert!(parse_unit("mph", &si).is_ok());
    }

    #[test]
    fn test_undefined_units() {
        let ucum = UnitRegistry::new(UnitSystem::Ucum);
        assert!(parse_unit("furlong", &ucum).is_err());
        assert!(parse_unit("m/", &ucum).is_err());
        assert!(parse_unit("(m", &ucum).is_err());
        assert!(parse_unit("", &ucum).is_err());
    }
}
