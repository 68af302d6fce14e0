//! Referential-integrity validation of a threat model.

use std::collections::HashSet;

use tm_core::{ElementClass, ElementId, TmError, TmResult};

use crate::attachments::Attachments;
use crate::finding::Finding;
use crate::model::ThreatModel;

/// Validate the model: every reference resolves, containment is symmetric and
/// acyclic, and the name index matches the elements.
pub(crate) fn validate_model(model: &ThreatModel) -> TmResult<()> {
    validate_collections(model)?;
    validate_containment(model)?;
    validate_flows(model)?;
    validate_actors(model)?;
    validate_findings(model)?;
    Ok(())
}

/// Each collection holds registered elements of the right class, exactly once.
fn validate_collections(model: &ThreatModel) -> TmResult<()> {
    let mut seen: HashSet<ElementId> = HashSet::new();
    let collections: [(&[ElementId], &[ElementClass]); 3] = [
        (&model.components, &[ElementClass::Component, ElementClass::Flow]),
        (&model.actors, &[ElementClass::Actor]),
        (&model.boundaries, &[ElementClass::Boundary]),
    ];

    for (ids, classes) in collections {
        for &id in ids {
            let element = model
                .element(id)
                .ok_or_else(|| TmError::integrity(format!("collection entry {} is not registered", id)))?;
            if !classes.contains(&element.class()) {
                return Err(TmError::integrity(format!(
                    "{} is stored in the wrong collection",
                    model.label(id)
                )));
            }
            if !seen.insert(id) {
                return Err(TmError::integrity(format!(
                    "{} is listed more than once",
                    model.label(id)
                )));
            }
        }
    }

    if seen.len() != model.elements.len() {
        return Err(TmError::integrity(format!(
            "{} elements registered but {} listed in collections",
            model.elements.len(),
            seen.len()
        )));
    }

    for ((class, name), &id) in &model.names {
        match model.element(id) {
            Some(e) if e.class() == *class && e.name() == name.as_str() => {}
            _ => {
                return Err(TmError::integrity(format!(
                    "name index entry {} '{}' does not match element {}",
                    class, name, id
                )));
            }
        }
    }
    if model.names.len() != model.elements.len() {
        return Err(TmError::integrity("name index is out of sync with elements"));
    }

    Ok(())
}

/// Parent/child links agree in both directions and contain no cycle.
fn validate_containment(model: &ThreatModel) -> TmResult<()> {
    for element in model.elements.values() {
        let id = element.id();

        if let Some(parent) = element.parent() {
            let p = model.element(parent).ok_or_else(|| {
                TmError::integrity(format!("{} has unregistered parent {}", model.label(id), parent))
            })?;
            if !p.has_child(id) {
                return Err(TmError::integrity(format!(
                    "{} names {} as parent but is not among its children",
                    model.label(id),
                    model.label(parent)
                )));
            }
        }

        let mut unique = HashSet::new();
        for &child in element.children() {
            let c = model.element(child).ok_or_else(|| {
                TmError::integrity(format!("{} has unregistered child {}", model.label(id), child))
            })?;
            if c.parent() != Some(id) {
                return Err(TmError::integrity(format!(
                    "{} lists {} as child but the child disagrees",
                    model.label(id),
                    model.label(child)
                )));
            }
            if !unique.insert(child) {
                return Err(TmError::integrity(format!(
                    "{} lists {} twice",
                    model.label(id),
                    model.label(child)
                )));
            }
        }

        // Walk up; more steps than elements means a cycle.
        let mut steps = 0;
        let mut current = element.parent();
        while let Some(p) = current {
            if p == id || steps > model.elements.len() {
                return Err(TmError::integrity(format!(
                    "{} is its own ancestor",
                    model.label(id)
                )));
            }
            steps += 1;
            current = model.element(p).and_then(|e| e.parent());
        }
    }
    Ok(())
}

/// Flow endpoints and path entries are registered components or actors.
fn validate_flows(model: &ThreatModel) -> TmResult<()> {
    for (element, flow) in model.flows() {
        if flow.src() == flow.dst() {
            return Err(TmError::integrity(format!(
                "flow '{}' starts and ends at the same element",
                element.name()
            )));
        }
        for id in flow.referenced() {
            match model.element(id) {
                Some(e) if e.class().is_endpoint() => {}
                Some(e) => {
                    return Err(TmError::integrity(format!(
                        "flow '{}' references {} '{}'",
                        element.name(),
                        e.class(),
                        e.name()
                    )));
                }
                None => {
                    return Err(TmError::integrity(format!(
                        "flow '{}' references unregistered element {}",
                        element.name(),
                        id
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Physical-access grants point at registered components.
fn validate_actors(model: &ThreatModel) -> TmResult<()> {
    for element in model.actors() {
        let Some(actor) = element.as_actor() else {
            continue;
        };
        for &target in actor.physical_access() {
            match model.element(target) {
                Some(e) if e.class() == ElementClass::Component => {}
                _ => {
                    return Err(TmError::integrity(format!(
                        "{} has physical access to unknown component {}",
                        model.label(element.id()),
                        target
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Findings still point at components or flows carrying their threats and controls.
fn validate_findings(model: &ThreatModel) -> TmResult<()> {
    let mut seen = HashSet::new();
    for finding in model.findings() {
        if !seen.insert(finding.id()) {
            return Err(TmError::integrity(format!(
                "finding {} is listed more than once",
                finding.id()
            )));
        }
        check_finding(model, finding)
            .map_err(|e| TmError::integrity(format!("finding {}: {}", finding.id(), e)))?;
    }
    Ok(())
}

/// References of one finding: affected elements are registered components or
/// flows, and each threat and control id is attached to one of them.
pub(crate) fn check_finding(model: &ThreatModel, finding: &Finding) -> TmResult<()> {
    let mut attached: Vec<&Attachments> = Vec::with_capacity(finding.affected().len());
    for &id in finding.affected() {
        let element = model.get(id)?;
        let attachments = element.attachments().ok_or_else(|| {
            TmError::invalid_argument(format!(
                "{} cannot be affected by a finding; only components and flows carry threats",
                model.label(id)
            ))
        })?;
        attached.push(attachments);
    }

    for threat in finding.threats() {
        if !attached.iter().any(|a| a.has_threat(threat)) {
            return Err(TmError::invalid_relationship(format!(
                "threat '{}' is not attached to any element the finding affects",
                threat
            )));
        }
    }
    for control in finding.controls() {
        if !attached.iter().any(|a| a.has_control(control)) {
            return Err(TmError::invalid_relationship(format!(
                "control '{}' is not attached to any element the finding affects",
                control
            )));
        }
    }
    Ok(())
}
