use core::fmt;

/// Broad class of a model element.
///
/// Names are unique per class within one model, so an actor and a component
/// may share a display name but two components may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ElementClass {
    Component,
    Flow,
    Actor,
    Boundary,
}

impl ElementClass {
    pub const ALL: [ElementClass; 4] = [
        ElementClass::Component,
        ElementClass::Flow,
        ElementClass::Actor,
        ElementClass::Boundary,
    ];

    /// Whether an element of this class can start a trace or terminate a flow.
    pub fn is_endpoint(self) -> bool {
        matches!(self, ElementClass::Component | ElementClass::Actor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementClass::Component => "component",
            ElementClass::Flow => "flow",
            ElementClass::Actor => "actor",
            ElementClass::Boundary => "boundary",
        }
    }
}

impl fmt::Display for ElementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
