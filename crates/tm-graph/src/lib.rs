//! tm-graph: threat-model graph and attack-path analysis.
//!
//! Provides:
//! - Element types (components, flows, actors, boundaries) and their attachments
//! - Findings recorded against components and flows
//! - The `ThreatModel` registry with name indexing and containment
//! - Flow adjacency indexing and integrity validation
//! - Backward and forward attack-path tracing
//!
//! # Example
//!
//! ```
//! use tm_graph::{Component, DatastoreType, Flow, PathStep, ThreatModel};
//!
//! let mut tm = ThreatModel::new("Shop");
//! let web = tm.add_component("Web", Component::process()).unwrap();
//! let db = tm.add_component("DB", Component::datastore(DatastoreType::Sql)).unwrap();
//! let query = tm.add_flow("Web to DB", Flow::data(web, db)).unwrap();
//!
//! let trace = tm.find_related_attack_vectors(db).unwrap();
//! assert!(!trace.truncated);
//! let paths = &trace.paths;
//! assert_eq!(paths.len(), 1);
//! assert_eq!(paths[0].steps(), &[PathStep::Flow(query)]);
//! ```

pub mod attachments;
pub mod containment;
pub mod element;
pub mod finding;
pub mod flow;
pub mod indexing;
pub mod model;
pub mod trace;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use attachments::{Attachments, Control, Data, Lifetime, Threat, ThreatKind};
pub use element::{
    Actor, Boundary, Component, ComponentClass, DatastoreType, Element, ElementKind, Level,
    Machine, SecurityProperty,
};
pub use finding::{Assessment, Finding};
pub use flow::{Flow, FlowClass, Transport};
pub use indexing::{FlowEdge, FlowIndex};
pub use model::ThreatModel;
pub use trace::{AttackPath, Direction, PathStep, Trace, Tracer};
pub use tm_core::{
    ContainmentPolicy, ElementClass, ElementId, FindingId, TmError, TmResult, TraceLimits,
};
