//! Datatype coercion of slot values to primitive target ranges
//!
//! Coercion never fails: a value that cannot be represented in the target
//! type is logged and passed through unchanged.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use schemamap_schemas::Primitive;
use serde_json::{Number, Value};
use tracing::warn;
use url::Url;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Converts values between primitive types, with CURIE handling for URIs
#[derive(Debug, Clone, Default)]
pub struct Coercer {
    prefixes: IndexMap<String, String>,
    expand_curies: bool,
}

impl Coercer {
    pub fn new(prefixes: IndexMap<String, String>, expand_curies: bool) -> Self {
        Self {
            prefixes,
            expand_curies,
        }
    }

    /// Add prefixes without replacing existing expansions
    pub fn with_prefixes<'a>(mut self, prefixes: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (prefix, expansion) in prefixes {
            self.prefixes
                .entry(prefix.clone())
                .or_insert_with(|| expansion.clone());
        }
        self
    }

    pub fn prefixes(&self) -> &IndexMap<String, String> {
        &self.prefixes
    }

    /// Coerce a value, element-wise for lists
    pub fn coerce(&self, value: &Value, primitive: Primitive) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::Array(items) => Value::Array(items.iter().map(|v| self.coerce(v, primitive)).collect()),
            Value::Object(_) => value.clone(),
            scalar => self.coerce_scalar(scalar, primitive).unwrap_or_else(|| {
                warn!(value = %scalar, target = ?primitive, "Could not coerce value");
                scalar.clone()
            }),
        }
    }

    fn coerce_scalar(&self, value: &Value, primitive: Primitive) -> Option<Value> {
        match primitive {
            Primitive::String => Some(match value {
                Value::String(_) => value.clone(),
                other => Value::String(other.to_string()),
            }),
            Primitive::Integer => to_integer(value).map(Value::from),
            Primitive::Float => to_float(value).and_then(Number::from_f64).map(Value::Number),
            Primitive::Boolean => to_boolean(value).map(Value::Bool),
            Primitive::Date => to_date(value).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            Primitive::DateTime => to_datetime(value).map(Value::String),
            Primitive::Time => to_time(value).map(|t| Value::String(t.format("%H:%M:%S").to_string())),
            Primitive::Uri => Some(self.to_uri(value)),
            Primitive::Curie => Some(self.to_curie(value)),
        }
    }

    /// Expand `prefix:local` when the prefix is known
    pub fn expand_curie(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        self.prefixes
            .get(prefix)
            .map(|base| format!("{}{}", base, local))
    }

    /// Compress a URI with the longest matching prefix expansion
    pub fn compress_uri(&self, uri: &str) -> Option<String> {
        self.prefixes
            .iter()
            .filter(|(_, base)| !base.is_empty() && uri.starts_with(base.as_str()))
            .max_by_key(|(_, base)| base.len())
            .map(|(prefix, base)| format!("{}:{}", prefix, &uri[base.len()..]))
    }

    fn to_uri(&self, value: &Value) -> Value {
        let Value::String(text) = value else {
            return value.clone();
        };
        if self.expand_curies {
            if let Some(expanded) = self.expand_curie(text) {
                return Value::String(expanded);
            }
        }
        if Url::parse(text).is_err() && !text.contains(':') {
            warn!(value = %text, "Value is neither a URI nor a known CURIE");
        }
        value.clone()
    }

    fn to_curie(&self, value: &Value) -> Value {
        match value {
            Value::String(text) if Url::parse(text).is_ok() => self
                .compress_uri(text)
                .map(Value::String)
                .unwrap_or_else(|| value.clone()),
            other => other.clone(),
        }
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        }
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

fn to_datetime(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.to_rfc3339());
    }
    if let Some(dt) = parse_datetime(text) {
        return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn to_time(value: &Value) -> Option<NaiveTime> {
    let text = value.as_str()?.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coercer() -> Coercer {
        Coercer::new(
            IndexMap::from([("ex".to_string(), "http://example.org/".to_string())]),
            true,
        )
    }

    #[test]
    fn test_numeric_and_boolean() {
        let c = coercer();
        assert_eq!(c.coerce(&json!("42"), Primitive::Integer), json!(42));
        assert_eq!(c.coerce(&json!(3.0), Primitive::Integer), json!(3));
        assert_eq!(c.coerce(&json!(75), Primitive::Float), json!(75.0));
        assert_eq!(c.coerce(&json!("1.5"), Primitive::Float), json!(1.5));
        assert_eq!(c.coerce(&json!("yes"), Primitive::Boolean), json!(true));
        assert_eq!(c.coerce(&json!(33), Primitive::String), json!("33"));
        assert_eq!(c.coerce(&json!(["1", "2"]), Primitive::Integer), json!([1, 2]));
    }

    #[test]
    fn test_failed_coercion_passes_through() {
        let c = coercer();
        assert_eq!(c.coerce(&json!("abc"), Primitive::Integer), json!("abc"));
        assert_eq!(c.coerce(&json!("not a date"), Primitive::Date), json!("not a date"));
    }

    #[test]
    fn test_dates() {
        let c = coercer();
        assert_eq!(c.coerce(&json!("2024-02-29"), Primitive::Date), json!("2024-02-29"));
        assert_eq!(c.coerce(&json!("2024-02-29T10:30:00"), Primitive::Date), json!("2024-02-29"));
        assert_eq!(c.coerce(&json!("2024-02-29"), Primitive::DateTime), json!("2024-02-29T00:00:00"));
        assert_eq!(
            c.coerce(&json!("2024-02-29T10:30:00Z"), Primitive::DateTime),
            json!("2024-02-29T10:30:00+00:00")
        );
        assert_eq!(c.coerce(&json!("2023-02-30"), Primitive::Date), json!("2023-02-30"));
    }

    #[test]
    fn test_curies() {
        let c = coercer();
        assert_eq!(c.coerce(&json!("ex:P1"), Primitive::Uri), json!("http://example.org/P1"));
        assert_eq!(c.coerce(&json!("http://example.org/P1"), Primitive::Curie), json!("ex:P1"));
        assert_eq!(c.coerce(&json!("unknown:P1"), Primitive::Uri), json!("unknown:P1"));

        let no_expand = Coercer::new(c.prefixes().clone(), false);
        assert_eq!(no_expand.coerce(&json!("ex:P1"), Primitive::Uri), json!("ex:P1"));
    }
}
