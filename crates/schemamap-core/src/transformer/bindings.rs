//! Evaluation environment built over a source object
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::Result;
use crate::expr::{Datum, Environment, Proxy, SOURCE_VARIABLE, TARGET_VARIABLE};
use crate::object_index::ObjectIndex;
use indexmap::IndexMap;
use serde_json::Value;

/// Name pre-bound to null
pub const NULL_VARIABLE: &str = "NULL";

/// Lazy bindings over the top-level keys of a source object
///
/// A key is only interpreted when an expression reads it: class-ranged values
/// become proxies, so attribute chains follow references through the index.
/// Values added with [`bind`](Self::bind) shadow the source object.
pub struct Bindings<'a> {
    source: &'a Value,
    class_name: &'a str,
    index: &'a ObjectIndex,
    extra: IndexMap<String, Datum>,
}

impl<'a> Bindings<'a> {
    pub fn new(source: &'a Value, class_name: &'a str, index: &'a ObjectIndex) -> Self {
        Self {
            source,
            class_name,
            index,
            extra: IndexMap::new(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Datum) -> &mut Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// A copy that also binds `src` to the blessed source object and
    /// `target` to null, as the permissive evaluator expects
    pub fn with_source_object(&self) -> Bindings<'a> {
        let mut extra = self.extra.clone();
        let proxy = self.index.bless(self.source, self.class_name);
        extra.insert(SOURCE_VARIABLE.to_string(), Datum::Object(proxy));
        extra
            .entry(TARGET_VARIABLE.to_string())
            .or_insert(Datum::Null);
        Bindings { extra, ..*self }
    }

    pub fn source(&self) -> &'a Value {
        self.source
    }

    pub fn class_name(&self) -> &'a str {
        self.class_name
    }
}

impl Environment for Bindings<'_> {
    fn lookup(&self, name: &str) -> Result<Option<Datum>> {
        if let Some(value) = self.extra.get(name) {
            return Ok(Some(value.clone()));
        }
        if name == NULL_VARIABLE {
            return Ok(Some(Datum::Null));
        }
        Ok(self
            .source
            .get(name)
            .map(|raw| self.index.resolve_value(raw, name, self.class_name)))
    }

    fn resolve_attribute(&self, proxy: &Proxy, attr: &str) -> Result<Datum> {
        Ok(self.index.resolve_attribute(proxy, attr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Evaluator;
    use schemamap_schemas::SchemaView;
    use serde_json::json;
    use std::sync::Arc;

    fn index() -> ObjectIndex {
        let view = SchemaView::from_value(json!({
            "name": "s",
            "classes": {
                "Container": {"attributes": {
                    "persons": {"range": "Person", "multivalued": true, "inlined_as_list": true},
                    "orgs": {"range": "Org", "multivalued": true, "inlined_as_list": true}
                }},
                "Person": {"attributes": {"id": {"identifier": true}, "employer": {"range": "Org"}}},
                "Org": {"attributes": {"id": {"identifier": true}, "name": {}}}
            }
        }))
        .unwrap();
        ObjectIndex::build(
            Arc::new(view),
            &json!({"persons": [{"id": "P1", "employer": "O1"}], "orgs": [{"id": "O1", "name": "Acme"}]}),
            "Container",
        )
    }

    #[test]
    fn test_lookup_follows_references() {
        let index = index();
        let person = json!({"id": "P1", "employer": "O1"});
        let bindings = Bindings::new(&person, "Person", &index);
        let evaluator = Evaluator::restricted();
        assert_eq!(evaluator.evaluate("employer.name", &bindings).unwrap(), Datum::from("Acme"));
        assert_eq!(evaluator.evaluate("NULL", &bindings).unwrap(), Datum::Null);
        assert_eq!(evaluator.evaluate("missing", &bindings).unwrap(), Datum::Null);
    }

    #[test]
    fn test_source_object_binding() {
        let index = index();
        let person = json!({"id": "P1", "employer": "O1"});
        let bindings = Bindings::new(&person, "Person", &index).with_source_object();
        let evaluator = Evaluator::permissive();
        assert_eq!(evaluator.evaluate("src.employer.name.upper()", &bindings).unwrap(), Datum::from("ACME"));
        assert_eq!(evaluator.evaluate("target", &bindings).unwrap(), Datum::Null);
    }
}
