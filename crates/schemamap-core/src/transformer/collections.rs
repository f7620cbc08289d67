//! Collection shape post-processing: cardinality, stringification, compact dicts
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::object_index::identifier_key;
use crate::spec::{SerializationSyntax, StringificationConfiguration};
use serde_json::{Map, Value};
use tracing::warn;

/// Delimiter used when a stringification names neither a delimiter nor a syntax
pub const DEFAULT_DELIMITER: &str = ",";

/// Wrap a single value into a list; lists and nulls pass through
pub fn to_multivalued(value: Value) -> Value {
    match value {
        Value::Null | Value::Array(_) => value,
        other => Value::Array(vec![other]),
    }
}

/// Collapse a list of at most one element into that element
pub fn to_single_valued(value: Value, slot_name: &str) -> Result<Value> {
    match value {
        Value::Array(mut items) => match items.len() {
            0 => Ok(Value::Null),
            1 => Ok(items.remove(0)),
            n => Err(Error::specification(format!(
                "cannot cast {} values of slot '{}' to a single value",
                n, slot_name
            ))),
        },
        other => Ok(other),
    }
}

fn item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Join a list (or serialize any value) into a single string
pub fn stringify(value: &Value, config: &StringificationConfiguration) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match config.syntax {
        Some(SerializationSyntax::Json) => Ok(Value::String(serde_json::to_string(value)?)),
        Some(SerializationSyntax::Yaml) => {
            let text = serde_yaml::to_string(value)?;
            Ok(Value::String(text.trim_end().to_string()))
        }
        Some(SerializationSyntax::Turtle) => Err(Error::specification(
            "TURTLE stringification is not supported by the in-memory engine",
        )),
        None => {
            let delimiter = config.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER);
            match value {
                Value::Array(items) => Ok(Value::String(
                    items
                        .iter()
                        .filter(|item| !item.is_null())
                        .map(item_text)
                        .collect::<Vec<_>>()
                        .join(delimiter),
                )),
                other => Ok(Value::String(item_text(other))),
            }
        }
    }
}

/// Split a string (or parse a serialized value) into a list
pub fn destringify(value: &Value, config: &StringificationConfiguration) -> Result<Value> {
    let Value::String(text) = value else {
        return Ok(value.clone());
    };
    match config.syntax {
        Some(SerializationSyntax::Json) => Ok(serde_json::from_str(text)?),
        Some(SerializationSyntax::Yaml) => {
            let parsed: serde_yaml::Value = serde_yaml::from_str(text)?;
            Ok(serde_json::to_value(parsed)?)
        }
        Some(SerializationSyntax::Turtle) => Err(Error::specification(
            "TURTLE stringification is not supported by the in-memory engine",
        )),
        None => {
            if text.is_empty() {
                return Ok(Value::Array(Vec::new()));
            }
            let delimiter = config.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER);
            Ok(Value::Array(
                text.split(delimiter)
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ))
        }
    }
}

/// Turn a list of objects into a compact dict keyed by `key`
///
/// Items lacking the key are kept out of the dict and reported.
pub fn list_to_compact_dict(value: Value, key: &str) -> Value {
    let Value::Array(items) = value else {
        return value;
    };
    let mut dict = Map::new();
    for item in items {
        match item {
            Value::Object(mut object) => {
                let id = object.remove(key).as_ref().and_then(identifier_key);
                match id {
                    Some(id) => {
                        dict.insert(id, Value::Object(object));
                    }
                    None => warn!(key, "Dropping item without dictionary key"),
                }
            }
            Value::Null => {}
            scalar => match identifier_key(&scalar) {
                Some(id) => {
                    dict.insert(id, Value::Null);
                }
                None => warn!(key, "Dropping item without dictionary key"),
            },
        }
    }
    Value::Object(dict)
}

/// Expand a compact dict back into a list, re-injecting `key` into each item
pub fn compact_dict_to_list(value: Value, key: &str) -> Value {
    let Value::Object(dict) = value else {
        return value;
    };
    Value::Array(
        dict.into_iter()
            .map(|(id, item)| {
                let object = match item {
                    Value::Object(object) => object,
                    Value::Null => Map::new(),
                    other => {
                        // a scalar compact-dict value is the single non-key field
                        let mut object = Map::new();
                        object.insert("value".to_string(), other);
                        object
                    }
                };
                let mut with_key = Map::new();
                with_key.insert(key.to_string(), Value::String(id));
                with_key.extend(object);
                Value::Object(with_key)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn delimited(delimiter: &str) -> StringificationConfiguration {
        StringificationConfiguration {
            delimiter: Some(delimiter.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_join_and_split() {
        let config = delimited("|");
        assert_eq!(stringify(&json!(["a", "b", "c"]), &config).unwrap(), json!("a|b|c"));
        assert_eq!(destringify(&json!("a|b"), &config).unwrap(), json!(["a", "b"]));
        assert_eq!(destringify(&json!(""), &config).unwrap(), json!([]));
        assert_eq!(stringify(&json!([1, 2.5, true]), &config).unwrap(), json!("1|2.5|true"));
    }

    #[test]
    fn test_syntax_serialization() {
        let config = StringificationConfiguration {
            syntax: Some(SerializationSyntax::Json),
            ..Default::default()
        };
        let text = stringify(&json!({"a": [1, 2]}), &config).unwrap();
        assert_eq!(text, json!(r#"{"a":[1,2]}"#));
        assert_eq!(destringify(&text, &config).unwrap(), json!({"a": [1, 2]}));

        let yaml = StringificationConfiguration {
            syntax: Some(SerializationSyntax::Yaml),
            ..Default::default()
        };
        assert_eq!(stringify(&json!(["x", "y"]), &yaml).unwrap(), json!("- x\n- y"));
    }

    #[test]
    fn test_cardinality() {
        assert_eq!(to_multivalued(json!("a")), json!(["a"]));
        assert_eq!(to_multivalued(Value::Null), Value::Null);
        assert_eq!(to_single_valued(json!(["a"]), "s").unwrap(), json!("a"));
        assert_eq!(to_single_valued(json!([]), "s").unwrap(), Value::Null);
        assert!(to_single_valued(json!(["a", "b"]), "s").is_err());
    }

    #[test]
    fn test_compact_dict_round_trip() {
        let list = json!([{"id": "a", "n": 1}, {"id": "b", "n": 2}]);
        let dict = list_to_compact_dict(list.clone(), "id");
        assert_eq!(dict, json!({"a": {"n": 1}, "b": {"n": 2}}));
        assert_eq!(compact_dict_to_list(dict, "id"), list);
    }
}
