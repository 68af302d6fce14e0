//! Model elements: the nodes of the threat-model graph.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use tm_core::{ElementClass, ElementId, TmError, TmResult};

use crate::attachments::Attachments;
use crate::flow::Flow;

/// Requirement level for one security property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Level {
    #[default]
    NotSet,
    Low,
    Medium,
    High,
}

/// Confidentiality / integrity / availability requirements of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityProperty {
    pub confidentiality: Level,
    pub integrity: Level,
    pub availability: Level,
}

/// Platform an asset runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Machine {
    #[default]
    NotApplicable,
    Physical,
    Virtual,
    Container,
    Serverless,
}

/// Storage technology behind a datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatastoreType {
    Unknown,
    FileSystem,
    Sql,
    Ldap,
    Bucket,
    NoSql,
    /// Anything else; the string says what it is.
    Other(String),
}

/// What kind of system component an element is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentClass {
    Generic,
    Process,
    Datastore(DatastoreType),
    ExternalEntity,
}

/// A component of the system under analysis (an asset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub(crate) class: ComponentClass,
    pub machine: Machine,
    pub open_ports: BTreeSet<u16>,
    pub attachments: Attachments,
}

impl Component {
    fn of_class(class: ComponentClass) -> Self {
        Self {
            class,
            machine: Machine::NotApplicable,
            open_ports: BTreeSet::new(),
            attachments: Attachments::default(),
        }
    }

    pub fn generic() -> Self {
        Self::of_class(ComponentClass::Generic)
    }

    pub fn process() -> Self {
        Self::of_class(ComponentClass::Process)
    }

    pub fn datastore(store: DatastoreType) -> Self {
        Self::of_class(ComponentClass::Datastore(store))
    }

    pub fn external_entity() -> Self {
        Self::of_class(ComponentClass::ExternalEntity)
    }

    pub fn with_machine(mut self, machine: Machine) -> Self {
        self.machine = machine;
        self
    }

    pub fn with_open_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.open_ports.extend(ports);
        self
    }

    pub fn class(&self) -> &ComponentClass {
        &self.class
    }

    /// Change the class; an `Other` datastore must say what it is.
    pub fn set_class(&mut self, class: ComponentClass) -> TmResult<()> {
        check_class(&class)?;
        self.class = class;
        Ok(())
    }
}

pub(crate) fn check_class(class: &ComponentClass) -> TmResult<()> {
    if let ComponentClass::Datastore(DatastoreType::Other(what)) = class {
        if what.trim().is_empty() {
            return Err(TmError::invalid_argument(
                "a datastore of type Other must say what it is",
            ));
        }
    }
    Ok(())
}

/// A person or organization interacting with the system.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Actor {
    /// Free-form kind, e.g. "Individual" or "Administrator".
    pub actor_type: Option<String>,
    /// Internal to the organization building the model.
    pub internal: bool,
    pub(crate) physical_access: Vec<ElementId>,
}

impl Actor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, actor_type: impl Into<String>) -> Self {
        self.actor_type = Some(actor_type.into());
        self
    }

    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    /// Components this actor can physically reach.
    pub fn physical_access(&self) -> &[ElementId] {
        &self.physical_access
    }
}

/// A trust boundary grouping its children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Boundary {
    pub trust_level: Option<String>,
}

impl Boundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trust_level(mut self, level: impl Into<String>) -> Self {
        self.trust_level = Some(level.into());
        self
    }
}

/// Class-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Component(Component),
    Flow(Flow),
    Actor(Actor),
    Boundary(Boundary),
}

impl ElementKind {
    pub fn class(&self) -> ElementClass {
        match self {
            ElementKind::Component(_) => ElementClass::Component,
            ElementKind::Flow(_) => ElementClass::Flow,
            ElementKind::Actor(_) => ElementClass::Actor,
            ElementKind::Boundary(_) => ElementClass::Boundary,
        }
    }
}

/// A registered node of the model.
///
/// Identity is the id: two elements are equal only if they are the same element,
/// regardless of name. Containment links are managed by `ThreatModel` so both
/// directions stay in sync.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) id: ElementId,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub security: SecurityProperty,
    pub(crate) kind: ElementKind,
}

impl Element {
    pub(crate) fn new(name: String, kind: ElementKind) -> Self {
        Self {
            id: ElementId::fresh(),
            name,
            description: None,
            parent: None,
            children: Vec::new(),
            security: SecurityProperty::default(),
            kind,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Children in the order they were attached.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn has_child(&self, id: ElementId) -> bool {
        self.children.contains(&id)
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn class(&self) -> ElementClass {
        self.kind.class()
    }

    pub fn as_component(&self) -> Option<&Component> {
        match &self.kind {
            ElementKind::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_flow(&self) -> Option<&Flow> {
        match &self.kind {
            ElementKind::Flow(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_actor(&self) -> Option<&Actor> {
        match &self.kind {
            ElementKind::Actor(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_boundary(&self) -> Option<&Boundary> {
        match &self.kind {
            ElementKind::Boundary(b) => Some(b),
            _ => None,
        }
    }

    /// Attachments of a component or flow; None for actors and boundaries.
    pub fn attachments(&self) -> Option<&Attachments> {
        match &self.kind {
            ElementKind::Component(c) => Some(&c.attachments),
            ElementKind::Flow(f) => Some(&f.attachments),
            _ => None,
        }
    }

    pub(crate) fn attachments_mut(&mut self) -> Option<&mut Attachments> {
        match &mut self.kind {
            ElementKind::Component(c) => Some(&mut c.attachments),
            ElementKind::Flow(f) => Some(&mut f.attachments),
            _ => None,
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
