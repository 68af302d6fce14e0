//! Flows: directed edges between components and actors.

use tm_core::ElementId;

use crate::attachments::Attachments;

/// Flow subtype filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowClass {
    Data,
    Work,
}

/// How a flow moves between its endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// A network transfer.
    Data {
        protocol: Option<String>,
        port: Option<u16>,
    },
    /// A procedural step rather than a transfer.
    Work,
}

/// A directed flow from `src` to `dst`, optionally routed through `path`.
///
/// Endpoints and path entries are checked against the model when the flow is
/// registered; they cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    src: ElementId,
    dst: ElementId,
    path: Vec<ElementId>,
    pub authentication: Option<String>,
    pub multifactor_authentication: bool,
    pub transport: Transport,
    pub attachments: Attachments,
}

impl Flow {
    fn new(src: ElementId, dst: ElementId, transport: Transport) -> Self {
        Self {
            src,
            dst,
            path: vec![src, dst],
            authentication: None,
            multifactor_authentication: true,
            transport,
            attachments: Attachments::default(),
        }
    }

    /// A data flow with no protocol or port specified.
    pub fn data(src: ElementId, dst: ElementId) -> Self {
        Self::new(
            src,
            dst,
            Transport::Data {
                protocol: None,
                port: None,
            },
        )
    }

    /// A work flow.
    pub fn work(src: ElementId, dst: ElementId) -> Self {
        Self::new(src, dst, Transport::Work)
    }

    /// Route through explicit intermediate elements. An empty path keeps `[src, dst]`.
    pub fn with_path(mut self, path: Vec<ElementId>) -> Self {
        if !path.is_empty() {
            self.path = path;
        }
        self
    }

    /// Turn this into a data flow over `protocol` on `port`.
    pub fn with_protocol(mut self, protocol: impl Into<String>, port: Option<u16>) -> Self {
        self.transport = Transport::Data {
            protocol: Some(protocol.into()),
            port,
        };
        self
    }

    pub fn with_authentication(mut self, authentication: impl Into<String>) -> Self {
        self.authentication = Some(authentication.into());
        self
    }

    pub fn with_multifactor(mut self, enabled: bool) -> Self {
        self.multifactor_authentication = enabled;
        self
    }

    pub fn src(&self) -> ElementId {
        self.src
    }

    pub fn dst(&self) -> ElementId {
        self.dst
    }

    pub fn path(&self) -> &[ElementId] {
        &self.path
    }

    pub fn class(&self) -> FlowClass {
        match self.transport {
            Transport::Data { .. } => FlowClass::Data,
            Transport::Work => FlowClass::Work,
        }
    }

    pub fn protocol(&self) -> Option<&str> {
        match &self.transport {
            Transport::Data { protocol, .. } => protocol.as_deref(),
            Transport::Work => None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self.transport {
            Transport::Data { port, .. } => port,
            Transport::Work => None,
        }
    }

    /// Whether this flow references `id` as an endpoint or path entry.
    pub fn references(&self, id: ElementId) -> bool {
        self.src == id || self.dst == id || self.path.contains(&id)
    }

    /// Every element this flow references, endpoints first.
    pub(crate) fn referenced(&self) -> impl Iterator<Item = ElementId> + '_ {
        [self.src, self.dst].into_iter().chain(self.path.iter().copied())
    }
}
