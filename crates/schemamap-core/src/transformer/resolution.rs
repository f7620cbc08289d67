//! Class derivation lookup and inheritance flattening
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::spec::{ClassDerivation, TransformationSpecification};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Find the class derivation that maps instances of `source_type`
///
/// `local` holds the `object_derivations` of the slot being descended into
/// and is searched before the top-level derivations. An explicit
/// `target_type` selects a derivation by name; otherwise exactly one
/// derivation may populate from the source class.
pub fn find_class_derivation<'s>(
    specification: &'s TransformationSpecification,
    local: Option<&'s IndexMap<String, ClassDerivation>>,
    source_type: &str,
    target_type: Option<&str>,
) -> Result<Option<&'s ClassDerivation>> {
    let pools = local
        .into_iter()
        .filter(|pool| !pool.is_empty())
        .chain(std::iter::once(&specification.class_derivations));

    for pool in pools {
        if let Some(target_type) = target_type {
            if let Some(cd) = pool.get(target_type) {
                return Ok(Some(cd));
            }
            continue;
        }
        let matches: Vec<&ClassDerivation> = pool
            .values()
            .filter(|cd| cd.source_class() == source_type || cd.sources.iter().any(|s| s == source_type))
            .collect();
        match matches.as_slice() {
            [] => continue,
            [cd] => return Ok(Some(cd)),
            many => {
                return Err(Error::specification(format!(
                    "source class '{}' is populated by several class derivations ({}); pass a target type",
                    source_type,
                    many.iter().map(|cd| cd.name.as_str()).collect::<Vec<_>>().join(", ")
                )))
            }
        }
    }
    Ok(None)
}

/// Merge a class derivation with its `is_a`/`mixins` ancestors
///
/// Parents fill holes: slot derivations and dict fields absent from the child
/// are added, lists are extended and scalars are only set when unset.
/// Parent names are looked up among the top-level class derivations.
pub fn flatten(specification: &TransformationSpecification, cd: &ClassDerivation) -> Result<ClassDerivation> {
    let mut merged = cd.clone();
    let mut visited = IndexSet::new();
    visited.insert(cd.name.clone());
    let mut pending: Vec<String> = cd.parents().cloned().collect();

    while !pending.is_empty() {
        let name = pending.remove(0);
        if !visited.insert(name.clone()) {
            if name == cd.name {
                return Err(Error::specification(format!(
                    "class derivation '{}' inherits from itself",
                    cd.name
                )));
            }
            continue;
        }
        let Some(parent) = specification.class_derivations.get(&name) else {
            return Err(Error::specification(format!(
                "class derivation '{}' inherits from unknown derivation '{}'",
                cd.name, name
            )));
        };
        debug!(child = %cd.name, parent = %name, "Merging inherited class derivation");
        fill_holes(&mut merged, parent);
        pending.extend(parent.parents().cloned());
    }
    Ok(merged)
}

fn fill_holes(child: &mut ClassDerivation, parent: &ClassDerivation) {
    for (name, sd) in &parent.slot_derivations {
        child
            .slot_derivations
            .entry(name.clone())
            .or_insert_with(|| sd.clone());
    }
    for (name, join) in &parent.joins {
        child.joins.entry(name.clone()).or_insert_with(|| join.clone());
    }
    for (name, directive) in &parent.copy_directives {
        child
            .copy_directives
            .entry(name.clone())
            .or_insert_with(|| directive.clone());
    }
    for source in &parent.sources {
        if !child.sources.contains(source) {
            child.sources.push(source.clone());
        }
    }
    if child.description.is_none() {
        child.description = parent.description.clone();
    }
    if child.pivot_operation.is_none() {
        child.pivot_operation = parent.pivot_operation.clone();
    }
    if child.target_definition.is_none() {
        child.target_definition = parent.target_definition.clone();
    }
    if child.overrides.is_none() {
        child.overrides = parent.overrides.clone();
    }
    child.mirror_source |= parent.mirror_source;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SlotDerivation;

    fn specification() -> TransformationSpecification {
        let mut spec = TransformationSpecification::default();
        let thing = ClassDerivation::new("Thing")
            .populated_from("NamedThing")
            .with_slot(SlotDerivation::new("id").populated_from("id"))
            .with_slot(SlotDerivation::new("label").populated_from("name"));
        let mut agent = ClassDerivation::new("Agent")
            .populated_from("Person")
            .with_slot(SlotDerivation::new("label").expr("{name}"));
        agent.is_a = Some("Thing".to_string());
        let org = ClassDerivation::new("Org").populated_from("Organization");
        let org2 = ClassDerivation::new("Company").populated_from("Organization");
        for cd in [thing, agent, org, org2] {
            spec.class_derivations.insert(cd.name.clone(), cd);
        }
        spec
    }

    #[test]
    fn test_find_by_source_and_target() {
        let spec = specification();
        let cd = find_class_derivation(&spec, None, "Person", None).unwrap().unwrap();
        assert_eq!(cd.name, "Agent");
        let cd = find_class_derivation(&spec, None, "Organization", Some("Company")).unwrap().unwrap();
        assert_eq!(cd.name, "Company");
        assert!(find_class_derivation(&spec, None, "Pet", None).unwrap().is_none());
        assert!(find_class_derivation(&spec, None, "Organization", None).is_err());
    }

    #[test]
    fn test_local_derivations_take_precedence() {
        let spec = specification();
        let local = IndexMap::from([(
            "Employer".to_string(),
            ClassDerivation::new("Employer").populated_from("Organization"),
        )]);
        let cd = find_class_derivation(&spec, Some(&local), "Organization", None).unwrap().unwrap();
        assert_eq!(cd.name, "Employer");
    }

    #[test]
    fn test_flatten_child_wins() {
        let spec = specification();
        let flat = flatten(&spec, &spec.class_derivations["Agent"]).unwrap();
        assert_eq!(flat.slot_derivations.keys().collect::<Vec<_>>(), vec!["label", "id"]);
        assert_eq!(flat.slot_derivations["label"].expr.as_deref(), Some("{name}"));
        assert_eq!(flat.source_class(), "Person");
    }

    #[test]
    fn test_flatten_cycle_is_an_error() {
        let mut spec = specification();
        spec.class_derivations["Thing"].is_a = Some("Agent".to_string());
        assert!(flatten(&spec, &spec.class_derivations["Agent"]).is_err());
    }
}
