//! The threat-model container.

use std::collections::HashMap;

use tm_core::{ContainmentPolicy, ElementClass, ElementId, FindingId, TmError, TmResult};
use tracing::debug;

use crate::attachments::Attachments;
use crate::element::{self, Actor, Boundary, Component, Element, ElementKind, SecurityProperty};
use crate::finding::Finding;
use crate::flow::{Flow, FlowClass};
use crate::trace::{Trace, Tracer};
use crate::validate;

/// All elements, flows and findings of one threat model.
///
/// The container is instance-scoped: nothing is shared between models except the
/// id counter. Elements are registered with `add_*` and keep their registration
/// order; flows are stored in the component collection, as a flow is a component
/// that connects two others.
#[derive(Debug, Clone, Default)]
pub struct ThreatModel {
    name: String,
    description: Option<String>,
    assumptions: Vec<String>,
    policy: ContainmentPolicy,
    pub(crate) elements: HashMap<ElementId, Element>,
    pub(crate) components: Vec<ElementId>,
    pub(crate) actors: Vec<ElementId>,
    pub(crate) boundaries: Vec<ElementId>,
    pub(crate) names: HashMap<(ElementClass, String), ElementId>,
    pub(crate) findings: Vec<Finding>,
}

impl ThreatModel {
    /// Create an empty model with the default containment policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, ContainmentPolicy::default())
    }

    pub fn with_policy(name: impl Into<String>, policy: ContainmentPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_model_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn policy(&self) -> ContainmentPolicy {
        self.policy
    }

    pub fn assumptions(&self) -> &[String] {
        &self.assumptions
    }

    pub fn add_assumption(&mut self, assumption: impl Into<String>) -> TmResult<()> {
        let assumption = assumption.into();
        if assumption.trim().is_empty() {
            return Err(TmError::invalid_argument("assumption must not be empty"));
        }
        self.assumptions.push(assumption);
        Ok(())
    }

    /// Empty the model. Ids handed out before the reset stay invalid forever.
    pub fn reset(&mut self) {
        debug!(model = %self.name, elements = self.elements.len(), "resetting threat model");
        self.elements.clear();
        self.components.clear();
        self.actors.clear();
        self.boundaries.clear();
        self.names.clear();
        self.assumptions.clear();
        self.findings.clear();
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    pub fn add_component(&mut self, name: impl Into<String>, component: Component) -> TmResult<ElementId> {
        element::check_class(&component.class)?;
        let id = self.register(name.into(), ElementKind::Component(component))?;
        self.components.push(id);
        Ok(id)
    }

    pub fn add_actor(&mut self, name: impl Into<String>, actor: Actor) -> TmResult<ElementId> {
        for &target in &actor.physical_access {
            self.expect_class(target, ElementClass::Component)?;
        }
        let id = self.register(name.into(), ElementKind::Actor(actor))?;
        self.actors.push(id);
        Ok(id)
    }

    pub fn add_boundary(&mut self, name: impl Into<String>, boundary: Boundary) -> TmResult<ElementId> {
        let id = self.register(name.into(), ElementKind::Boundary(boundary))?;
        self.boundaries.push(id);
        Ok(id)
    }

    /// Register a flow. Its endpoints and path entries must already be registered
    /// components or actors, and the endpoints must differ.
    pub fn add_flow(&mut self, name: impl Into<String>, flow: Flow) -> TmResult<ElementId> {
        let name = name.into();
        if flow.src() == flow.dst() {
            return Err(TmError::invalid_argument(format!(
                "flow '{}' must connect two distinct elements",
                name
            )));
        }
        for id in flow.referenced() {
            let element = self.get(id)?;
            if !element.class().is_endpoint() {
                return Err(TmError::invalid_argument(format!(
                    "flow '{}' references {} '{}'; only components and actors can be connected",
                    name,
                    element.class(),
                    element.name
                )));
            }
        }
        let id = self.register(name, ElementKind::Flow(flow))?;
        self.components.push(id);
        Ok(id)
    }

    fn register(&mut self, name: String, kind: ElementKind) -> TmResult<ElementId> {
        if name.trim().is_empty() {
            return Err(TmError::invalid_argument("element name must not be empty"));
        }
        let class = kind.class();
        let key = (class, name);
        if self.names.contains_key(&key) {
            return Err(TmError::DuplicateName { class, name: key.1 });
        }
        let element = Element::new(key.1.clone(), kind);
        let id = element.id;
        debug!(%id, %class, name = %key.1, "registered element");
        self.names.insert(key, id);
        self.elements.insert(id, element);
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------------

    pub fn remove_component(&mut self, id: ElementId) -> TmResult<Element> {
        self.expect_class(id, ElementClass::Component)?;
        self.remove(id)
    }

    pub fn remove_flow(&mut self, id: ElementId) -> TmResult<Element> {
        self.expect_class(id, ElementClass::Flow)?;
        self.remove(id)
    }

    pub fn remove_actor(&mut self, id: ElementId) -> TmResult<Element> {
        self.expect_class(id, ElementClass::Actor)?;
        self.remove(id)
    }

    pub fn remove_boundary(&mut self, id: ElementId) -> TmResult<Element> {
        self.expect_class(id, ElementClass::Boundary)?;
        self.remove(id)
    }

    /// Unregister an element of any class.
    ///
    /// Fails while a flow or a finding still references the element. Containment
    /// links on both sides are cleared and physical-access grants to it are revoked.
    pub fn remove(&mut self, id: ElementId) -> TmResult<Element> {
        let class = self.get(id)?.class();
        if let Some((flow, _)) = self.flows().find(|(fe, f)| fe.id != id && f.references(id)) {
            return Err(TmError::invalid_relationship(format!(
                "{} is still referenced by flow '{}'",
                self.label(id),
                flow.name
            )));
        }
        if let Some(finding) = self.findings.iter().find(|f| f.affects(id)) {
            return Err(TmError::invalid_relationship(format!(
                "{} is still affected by finding {}",
                self.label(id),
                finding.id
            )));
        }

        if self.element(id).and_then(|e| e.parent).is_some() {
            self.clear_parent(id)?;
        }
        let children = self.get(id)?.children.clone();
        for child in children {
            if let Some(c) = self.elements.get_mut(&child) {
                c.parent = None;
            }
        }
        for actor in &self.actors {
            if let Some(ElementKind::Actor(a)) = self.elements.get_mut(actor).map(|e| &mut e.kind) {
                a.physical_access.retain(|&t| t != id);
            }
        }

        let element = self
            .elements
            .remove(&id)
            .ok_or(TmError::NotRegistered { id })?;
        match class {
            ElementClass::Component | ElementClass::Flow => self.components.retain(|&c| c != id),
            ElementClass::Actor => self.actors.retain(|&a| a != id),
            ElementClass::Boundary => self.boundaries.retain(|&b| b != id),
        }
        self.names.remove(&(class, element.name.clone()));
        debug!(%id, %class, name = %element.name, "removed element");
        Ok(element)
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    /// Get an element by ID (None if not registered).
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Get an element by ID, failing with `NotRegistered`.
    pub fn get(&self, id: ElementId) -> TmResult<&Element> {
        self.elements.get(&id).ok_or(TmError::NotRegistered { id })
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Find an element by class and name.
    pub fn find(&self, class: ElementClass, name: &str) -> Option<ElementId> {
        self.names.get(&(class, name.to_string())).copied()
    }

    /// Every element with this name, across classes.
    pub fn lookup(&self, name: &str) -> Vec<ElementId> {
        ElementClass::ALL
            .iter()
            .filter_map(|&class| self.find(class, name))
            .collect()
    }

    /// Display name of an element, or its id when it is not registered.
    pub fn label(&self, id: ElementId) -> String {
        match self.element(id) {
            Some(e) => format!("{} '{}'", e.class(), e.name),
            None => id.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn ordered<'a>(&'a self, ids: &'a [ElementId]) -> impl Iterator<Item = &'a Element> + 'a {
        ids.iter().filter_map(move |id| self.elements.get(id))
    }

    /// All components, flows included, in registration order.
    pub fn components(&self) -> impl Iterator<Item = &Element> + '_ {
        self.ordered(&self.components)
    }

    /// Components that are not flows.
    pub fn assets(&self) -> impl Iterator<Item = &Element> + '_ {
        self.components().filter(|e| e.class() == ElementClass::Component)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Element> + '_ {
        self.ordered(&self.actors)
    }

    pub fn boundaries(&self) -> impl Iterator<Item = &Element> + '_ {
        self.ordered(&self.boundaries)
    }

    /// All flows in registration order.
    pub fn flows(&self) -> impl Iterator<Item = (&Element, &Flow)> + '_ {
        self.components()
            .filter_map(|e| e.as_flow().map(|f| (e, f)))
    }

    /// Flows of one subtype.
    pub fn flows_of(&self, class: FlowClass) -> impl Iterator<Item = (&Element, &Flow)> + '_ {
        self.flows().filter(move |(_, f)| f.class() == class)
    }

    /// Components and flows carrying data with this name.
    pub fn describe_data(&self, data_name: &str) -> Vec<ElementId> {
        self.components()
            .filter(|e| e.attachments().is_some_and(|a| a.has_data(data_name)))
            .map(|e| e.id)
            .collect()
    }

    pub(crate) fn expect_class(&self, id: ElementId, class: ElementClass) -> TmResult<&Element> {
        let element = self.get(id)?;
        if element.class() != class {
            return Err(TmError::invalid_argument(format!(
                "{} is not a {}",
                self.label(id),
                class
            )));
        }
        Ok(element)
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    fn get_mut(&mut self, id: ElementId) -> TmResult<&mut Element> {
        self.elements.get_mut(&id).ok_or(TmError::NotRegistered { id })
    }

    /// Rename an element, keeping the per-class name unique.
    pub fn rename(&mut self, id: ElementId, name: impl Into<String>) -> TmResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TmError::invalid_argument("element name must not be empty"));
        }
        let element = self.get(id)?;
        let class = element.class();
        let old = element.name.clone();
        if old == name {
            return Ok(());
        }
        if self.names.contains_key(&(class, name.clone())) {
            return Err(TmError::DuplicateName { class, name });
        }
        self.names.remove(&(class, old));
        self.names.insert((class, name.clone()), id);
        self.get_mut(id)?.name = name;
        Ok(())
    }

    pub fn set_description(&mut self, id: ElementId, description: Option<String>) -> TmResult<()> {
        self.get_mut(id)?.description = description;
        Ok(())
    }

    pub fn security_mut(&mut self, id: ElementId) -> TmResult<&mut SecurityProperty> {
        Ok(&mut self.get_mut(id)?.security)
    }

    pub fn component_mut(&mut self, id: ElementId) -> TmResult<&mut Component> {
        self.expect_class(id, ElementClass::Component)?;
        match &mut self.get_mut(id)?.kind {
            ElementKind::Component(c) => Ok(c),
            _ => Err(TmError::NotRegistered { id }),
        }
    }

    pub fn actor_mut(&mut self, id: ElementId) -> TmResult<&mut Actor> {
        self.expect_class(id, ElementClass::Actor)?;
        match &mut self.get_mut(id)?.kind {
            ElementKind::Actor(a) => Ok(a),
            _ => Err(TmError::NotRegistered { id }),
        }
    }

    pub fn boundary_mut(&mut self, id: ElementId) -> TmResult<&mut Boundary> {
        self.expect_class(id, ElementClass::Boundary)?;
        match &mut self.get_mut(id)?.kind {
            ElementKind::Boundary(b) => Ok(b),
            _ => Err(TmError::NotRegistered { id }),
        }
    }

    /// Mutable access to a flow's non-structural fields (endpoints stay fixed).
    pub fn flow_mut(&mut self, id: ElementId) -> TmResult<&mut Flow> {
        self.expect_class(id, ElementClass::Flow)?;
        match &mut self.get_mut(id)?.kind {
            ElementKind::Flow(f) => Ok(f),
            _ => Err(TmError::NotRegistered { id }),
        }
    }

    /// Attachments of a component or flow.
    pub fn attachments_mut(&mut self, id: ElementId) -> TmResult<&mut Attachments> {
        let label = self.label(id);
        self.get_mut(id)?
            .attachments_mut()
            .ok_or_else(|| TmError::invalid_argument(format!("{} cannot carry attachments", label)))
    }

    /// Record that `actor` can physically reach `component`.
    pub fn grant_physical_access(&mut self, actor: ElementId, component: ElementId) -> TmResult<()> {
        self.expect_class(component, ElementClass::Component)?;
        let access = &mut self.actor_mut(actor)?.physical_access;
        if !access.contains(&component) {
            access.push(component);
        }
        Ok(())
    }

    pub fn revoke_physical_access(&mut self, actor: ElementId, component: ElementId) -> TmResult<()> {
        let label = self.label(component);
        let access = &mut self.actor_mut(actor)?.physical_access;
        let before = access.len();
        access.retain(|&c| c != component);
        if access.len() == before {
            return Err(TmError::NotFound {
                what: format!("physical access to {}", label),
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Findings
    // ---------------------------------------------------------------------

    /// Record a finding against registered components or flows.
    ///
    /// Every threat and control id must be attached to at least one affected
    /// element. Adding the same finding twice fails.
    pub fn add_finding(&mut self, finding: Finding) -> TmResult<FindingId> {
        if self.finding(finding.id).is_some() {
            return Err(TmError::invalid_argument(format!(
                "finding {} is already in the model",
                finding.id
            )));
        }
        finding.check_shape()?;
        validate::check_finding(self, &finding)?;
        let id = finding.id;
        debug!(%id, affected = finding.affected.len(), threats = finding.threats.len(), "added finding");
        self.findings.push(finding);
        Ok(id)
    }

    pub fn remove_finding(&mut self, id: FindingId) -> TmResult<Finding> {
        let pos = self
            .findings
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| TmError::NotFound {
                what: format!("finding {}", id),
            })?;
        debug!(%id, "removed finding");
        Ok(self.findings.remove(pos))
    }

    pub fn finding(&self, id: FindingId) -> Option<&Finding> {
        self.findings.iter().find(|f| f.id == id)
    }

    /// Mutable access to the assessment; targets and references stay fixed.
    pub fn finding_mut(&mut self, id: FindingId) -> TmResult<&mut Finding> {
        self.findings
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| TmError::NotFound {
                what: format!("finding {}", id),
            })
    }

    /// All findings in the order they were added.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> + '_ {
        self.findings.iter()
    }

    /// Findings that affect `element`.
    pub fn findings_for(&self, element: ElementId) -> impl Iterator<Item = &Finding> + '_ {
        self.findings.iter().filter(move |f| f.affects(element))
    }

    // ---------------------------------------------------------------------
    // Analysis
    // ---------------------------------------------------------------------

    /// Check referential integrity of the whole model.
    pub fn validate(&self) -> TmResult<()> {
        validate::validate_model(self)
    }

    /// Backward attack paths leading into `initial`, with default limits.
    ///
    /// Check [`Trace::truncated`] before treating the paths as complete.
    pub fn find_related_attack_vectors(&self, initial: ElementId) -> TmResult<Trace> {
        Tracer::new(self)?.find_related_attack_vectors(initial)
    }

    /// Forward attack paths reachable from `target`, with default limits.
    pub fn simulate_attack(&self, target: ElementId) -> TmResult<Trace> {
        Tracer::new(self)?.simulate_attack(target)
    }
}
