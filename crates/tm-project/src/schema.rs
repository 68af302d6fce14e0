//! Model definition schema.
//!
//! Elements reference each other by name. The definition is plain data; it is
//! turned into a `ThreatModel` by [`crate::build_model`].

use serde::{Deserialize, Serialize};
use tm_core::ContainmentPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDef {
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub settings: SettingsDef,
    #[serde(default)]
    pub actors: Vec<ActorDef>,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub boundaries: Vec<BoundaryDef>,
    #[serde(default)]
    pub flows: Vec<FlowDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<FindingDef>,
}

/// Model-wide knobs: containment rule and default trace limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsDef {
    #[serde(default)]
    pub containment: ContainmentPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_paths: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LevelDef {
    #[default]
    NotSet,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityDef {
    #[serde(default)]
    pub confidentiality: LevelDef,
    #[serde(default)]
    pub integrity: LevelDef,
    #[serde(default)]
    pub availability: LevelDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_type: Option<String>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Names of components the actor can physically reach.
    #[serde(default)]
    pub physical_access: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityDef>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKindDef {
    #[default]
    Generic,
    Process,
    Datastore,
    ExternalEntity,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MachineDef {
    #[default]
    NotApplicable,
    Physical,
    Virtual,
    Container,
    Serverless,
}

/// Storage technology. `other` takes its meaning from the component description.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreDef {
    #[default]
    Unknown,
    FileSystem,
    Sql,
    Ldap,
    Bucket,
    NoSql,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    pub name: String,
    #[serde(default)]
    pub kind: ComponentKindDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only meaningful for `kind: datastore`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreDef>,
    #[serde(default)]
    pub machine: MachineDef,
    #[serde(default)]
    pub open_ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityDef>,
    #[serde(default)]
    pub data: Vec<DataDef>,
    #[serde(default)]
    pub threats: Vec<ThreatDef>,
    #[serde(default)]
    pub controls: Vec<ControlDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundaryDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowKindDef {
    #[default]
    Data,
    Work,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowDef {
    pub name: String,
    pub src: String,
    pub dst: String,
    #[serde(default)]
    pub kind: FlowKindDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered route of element names; empty means `[src, dst]`.
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    #[serde(default = "default_true")]
    pub multifactor_authentication: bool,
    #[serde(default)]
    pub data: Vec<DataDef>,
    #[serde(default)]
    pub threats: Vec<ThreatDef>,
    #[serde(default)]
    pub controls: Vec<ControlDef>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifetimeDef {
    #[default]
    None,
    Unknown,
    Short,
    Long,
    AutoRevocable,
    ManuallyRevocable,
    Hardcoded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_pii: bool,
    #[serde(default)]
    pub is_phi: bool,
    #[serde(default)]
    pub is_credentials: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub lifetime: LifetimeDef,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKindDef {
    #[default]
    Threat,
    Issue,
    Weakness,
    Vulnerability,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreatDef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: ThreatKindDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlDef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A finding against components or flows, named like flow endpoints.
/// Threat and control ids must be attached to one of the affected elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FindingDef {
    pub affected: Vec<String>,
    pub threats: Vec<String>,
    #[serde(default)]
    pub controls: Vec<String>,
    #[serde(default)]
    pub assessment: AssessmentDef,
}

/// Free-text assessment; omitted fields are not evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssessmentDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood_event_occurrence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood_adverse_event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_impact: Option<SecurityDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_impact: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predispositions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pervasiveness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual_risk: Option<String>,
}
