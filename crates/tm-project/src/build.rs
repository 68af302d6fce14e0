//! Turn a validated definition into a `ThreatModel`.
//!
//! Registration happens in dependency order: boundaries, components and actors
//! first, then containment and physical access, then flows, then findings. Name
//! references are resolved against what is already registered.

use tm_core::{ElementClass, ElementId, TraceLimits};
use tm_graph::{
    Actor, Assessment, Attachments, Boundary, Component, Control, Data, DatastoreType, Finding,
    Flow, Level, Lifetime, Machine, SecurityProperty, Threat, ThreatKind, ThreatModel, Transport,
};
use tracing::debug;

use crate::schema::{
    AssessmentDef, ComponentDef, ComponentKindDef, ControlDef, DataDef, FindingDef, FlowDef,
    FlowKindDef, LevelDef, LifetimeDef, MachineDef, ModelDef, SecurityDef, StoreDef, ThreatDef,
    ThreatKindDef,
};
use crate::{ProjectError, ProjectResult};

/// A built model plus the trace limits its settings ask for.
#[derive(Debug)]
pub struct LoadedModel {
    pub model: ThreatModel,
    pub limits: TraceLimits,
}

const PARENTS: &[ElementClass] = &[
    ElementClass::Component,
    ElementClass::Actor,
    ElementClass::Boundary,
];
const ENDPOINTS: &[ElementClass] = &[ElementClass::Component, ElementClass::Actor];
const COMPONENTS: &[ElementClass] = &[ElementClass::Component];
const AFFECTED: &[ElementClass] = &[ElementClass::Component, ElementClass::Flow];

pub fn build_model(def: &ModelDef) -> ProjectResult<LoadedModel> {
    let mut model = ThreatModel::with_policy(def.name.clone(), def.settings.containment);
    if let Some(description) = &def.description {
        model.set_model_description(description.clone());
    }
    for assumption in &def.assumptions {
        model.add_assumption(assumption.clone())?;
    }

    let mut parents: Vec<(ElementId, &str)> = Vec::new();

    for b in &def.boundaries {
        let mut boundary = Boundary::new();
        boundary.trust_level = b.trust_level.clone();
        let id = model.add_boundary(b.name.clone(), boundary)?;
        model.set_description(id, b.description.clone())?;
        if let Some(parent) = &b.parent {
            parents.push((id, parent.as_str()));
        }
    }

    for c in &def.components {
        let id = model.add_component(c.name.clone(), component(c))?;
        model.set_description(id, c.description.clone())?;
        if let Some(security) = &c.security {
            *model.security_mut(id)? = security_property(security);
        }
        attach(model.attachments_mut(id)?, &c.data, &c.threats, &c.controls)?;
        if let Some(parent) = &c.parent {
            parents.push((id, parent.as_str()));
        }
    }

    let mut access: Vec<(ElementId, &str)> = Vec::new();
    for a in &def.actors {
        let mut actor = Actor::new().internal(a.internal);
        actor.actor_type = a.actor_type.clone();
        let id = model.add_actor(a.name.clone(), actor)?;
        model.set_description(id, a.description.clone())?;
        if let Some(security) = &a.security {
            *model.security_mut(id)? = security_property(security);
        }
        if let Some(parent) = &a.parent {
            parents.push((id, parent.as_str()));
        }
        access.extend(a.physical_access.iter().map(|c| (id, c.as_str())));
    }

    for (child, parent) in parents {
        let parent = resolve(&model, parent, PARENTS, "parent")?;
        model.set_parent(child, parent)?;
    }
    for (actor, target) in access {
        let target = resolve(&model, target, COMPONENTS, "physical_access")?;
        model.grant_physical_access(actor, target)?;
    }

    for f in &def.flows {
        let flow = flow(&model, f)?;
        let id = model.add_flow(f.name.clone(), flow)?;
        model.set_description(id, f.description.clone())?;
        attach(model.attachments_mut(id)?, &f.data, &f.threats, &f.controls)?;
    }

    for (i, f) in def.findings.iter().enumerate() {
        let finding = finding(&model, i, f)?;
        model.add_finding(finding)?;
    }

    let defaults = TraceLimits::default();
    let limits = TraceLimits {
        max_depth: def.settings.max_depth.or(defaults.max_depth),
        max_paths: def.settings.max_paths.or(defaults.max_paths),
    };

    debug!(
        model = %def.name,
        elements = model.len(),
        flows = def.flows.len(),
        findings = def.findings.len(),
        "built threat model"
    );
    Ok(LoadedModel { model, limits })
}

/// Find the component or actor called `name`, e.g. to start a trace.
pub fn find_endpoint(model: &ThreatModel, name: &str) -> ProjectResult<ElementId> {
    resolve(model, name, ENDPOINTS, "trace start")
}

/// Find the single element called `name` among `classes`.
fn resolve(
    model: &ThreatModel,
    name: &str,
    classes: &[ElementClass],
    context: &str,
) -> ProjectResult<ElementId> {
    let matches: Vec<ElementId> = classes
        .iter()
        .filter_map(|&class| model.find(class, name))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(ProjectError::UnknownReference {
            name: name.to_string(),
            context: context.to_string(),
        }),
        _ => Err(ProjectError::AmbiguousReference {
            name: name.to_string(),
            context: context.to_string(),
        }),
    }
}

fn component(def: &ComponentDef) -> Component {
    let component = match def.kind {
        ComponentKindDef::Generic => Component::generic(),
        ComponentKindDef::Process => Component::process(),
        ComponentKindDef::ExternalEntity => Component::external_entity(),
        ComponentKindDef::Datastore => {
            let store = match def.store.unwrap_or_default() {
                StoreDef::Unknown => DatastoreType::Unknown,
                StoreDef::FileSystem => DatastoreType::FileSystem,
                StoreDef::Sql => DatastoreType::Sql,
                StoreDef::Ldap => DatastoreType::Ldap,
                StoreDef::Bucket => DatastoreType::Bucket,
                StoreDef::NoSql => DatastoreType::NoSql,
                // An empty description is rejected by the model.
                StoreDef::Other => DatastoreType::Other(def.description.clone().unwrap_or_default()),
            };
            Component::datastore(store)
        }
    };
    component
        .with_machine(machine(def.machine))
        .with_open_ports(def.open_ports.iter().copied())
}

fn flow(model: &ThreatModel, def: &FlowDef) -> ProjectResult<Flow> {
    let context = format!("flow '{}'", def.name);
    let src = resolve(model, &def.src, ENDPOINTS, &context)?;
    let dst = resolve(model, &def.dst, ENDPOINTS, &context)?;
    let path = def
        .path
        .iter()
        .map(|name| resolve(model, name, ENDPOINTS, &context))
        .collect::<ProjectResult<Vec<_>>>()?;

    let mut flow = match def.kind {
        FlowKindDef::Data => {
            let mut flow = Flow::data(src, dst);
            flow.transport = Transport::Data {
                protocol: def.protocol.clone(),
                port: def.port,
            };
            flow
        }
        FlowKindDef::Work => Flow::work(src, dst),
    }
    .with_path(path)
    .with_multifactor(def.multifactor_authentication);

    if let Some(auth) = &def.authentication {
        flow = flow.with_authentication(auth.clone());
    }
    Ok(flow)
}

fn finding(model: &ThreatModel, index: usize, def: &FindingDef) -> ProjectResult<Finding> {
    let context = format!("findings[{}]", index);
    let affected = def
        .affected
        .iter()
        .map(|name| resolve(model, name, AFFECTED, &context))
        .collect::<ProjectResult<Vec<_>>>()?;
    Ok(Finding::new(affected, def.threats.iter().cloned())
        .with_controls(def.controls.iter().cloned())
        .with_assessment(assessment(&def.assessment)))
}

fn assessment(def: &AssessmentDef) -> Assessment {
    Assessment {
        relevance: def.relevance.clone(),
        likelihood: def.likelihood.clone(),
        likelihood_event_occurrence: def.likelihood_event_occurrence.clone(),
        likelihood_adverse_event: def.likelihood_adverse_event.clone(),
        impact: def.impact.clone(),
        technical_impact: def
            .technical_impact
            .as_ref()
            .map(security_property)
            .unwrap_or_default(),
        business_impact: def.business_impact.clone(),
        predispositions: def.predispositions.clone(),
        severity: def.severity.clone(),
        pervasiveness: def.pervasiveness.clone(),
        risk: def.risk.clone(),
        residual_risk: def.residual_risk.clone(),
    }
}

fn attach(
    target: &mut Attachments,
    data: &[DataDef],
    threats: &[ThreatDef],
    controls: &[ControlDef],
) -> ProjectResult<()> {
    for d in data {
        target.add_data(Data {
            name: d.name.clone(),
            description: d.description.clone(),
            is_pii: d.is_pii,
            is_phi: d.is_phi,
            is_credentials: d.is_credentials,
            format: d.format.clone(),
            lifetime: lifetime(d.lifetime),
        })?;
    }
    for t in threats {
        let mut threat = Threat::new(t.id.clone(), t.name.clone()).with_kind(threat_kind(t.kind));
        threat.description = t.description.clone();
        target.add_threat(threat)?;
    }
    for c in controls {
        let mut control = Control::new(c.id.clone(), c.name.clone());
        control.description = c.description.clone();
        target.add_control(control)?;
    }
    Ok(())
}

fn threat_kind(def: ThreatKindDef) -> ThreatKind {
    match def {
        ThreatKindDef::Threat => ThreatKind::Threat,
        ThreatKindDef::Issue => ThreatKind::Issue,
        ThreatKindDef::Weakness => ThreatKind::Weakness,
        ThreatKindDef::Vulnerability => ThreatKind::Vulnerability,
    }
}

fn machine(def: MachineDef) -> Machine {
    match def {
        MachineDef::NotApplicable => Machine::NotApplicable,
        MachineDef::Physical => Machine::Physical,
        MachineDef::Virtual => Machine::Virtual,
        MachineDef::Container => Machine::Container,
        MachineDef::Serverless => Machine::Serverless,
    }
}

fn level(def: LevelDef) -> Level {
    match def {
        LevelDef::NotSet => Level::NotSet,
        LevelDef::Low => Level::Low,
        LevelDef::Medium => Level::Medium,
        LevelDef::High => Level::High,
    }
}

fn security_property(def: &SecurityDef) -> SecurityProperty {
    SecurityProperty {
        confidentiality: level(def.confidentiality),
        integrity: level(def.integrity),
        availability: level(def.availability),
    }
}

fn lifetime(def: LifetimeDef) -> Lifetime {
    match def {
        LifetimeDef::None => Lifetime::None,
        LifetimeDef::Unknown => Lifetime::Unknown,
        LifetimeDef::Short => Lifetime::Short,
        LifetimeDef::Long => Lifetime::Long,
        LifetimeDef::AutoRevocable => Lifetime::AutoRevocable,
        LifetimeDef::ManuallyRevocable => Lifetime::ManuallyRevocable,
        LifetimeDef::Hardcoded => Lifetime::Hardcoded,
    }
}
