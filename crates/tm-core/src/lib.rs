//! tm-core: stable foundation for the threat-model graph.
//!
//! Contains:
//! - ids (process-unique element and finding identifiers)
//! - class (element classes used for name indexing and error reporting)
//! - policy (containment rules and trace limits)
//! - error (shared error types)

pub mod class;
pub mod error;
pub mod ids;
pub mod policy;

// Re-exports: nice ergonomics for downstream crates
pub use class::ElementClass;
pub use error::{TmError, TmResult};
pub use ids::*;
pub use policy::{ContainmentPolicy, TraceLimits};
