//! Flow adjacency indexing for the tracer.
//!
//! Maps element ids to contiguous slots and stores, per slot, the flows that
//! enter and leave it in compact offset/list form.

use std::collections::HashMap;

use tm_core::{ElementId, TmError, TmResult};

use crate::model::ThreatModel;

/// One flow edge, reduced to what traversal needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowEdge {
    pub flow: ElementId,
    pub src: ElementId,
    pub dst: ElementId,
}

/// Incoming/outgoing flow lists for every element of a model.
///
/// Edge lists keep the model's flow registration order, so traversal is
/// deterministic and matches `ThreatModel::flows()`.
#[derive(Debug, Clone)]
pub struct FlowIndex {
    /// Element id -> contiguous slot.
    slots: HashMap<ElementId, usize>,

    /// All flows in registration order.
    edges: Vec<FlowEdge>,

    /// Slot i's incoming edges are in incoming[incoming_offsets[i]..incoming_offsets[i+1]].
    incoming_offsets: Vec<usize>,
    incoming: Vec<usize>,

    /// Same layout for outgoing edges.
    outgoing_offsets: Vec<usize>,
    outgoing: Vec<usize>,
}

impl FlowIndex {
    /// Build an index from a model. Flow endpoints must be registered.
    pub fn from_model(model: &ThreatModel) -> TmResult<Self> {
        let mut slots = HashMap::with_capacity(model.len());
        for (i, id) in model
            .components()
            .chain(model.actors())
            .chain(model.boundaries())
            .map(|e| e.id())
            .enumerate()
        {
            slots.insert(id, i);
        }

        let mut edges = Vec::new();
        for (element, flow) in model.flows() {
            for endpoint in [flow.src(), flow.dst()] {
                if !slots.contains_key(&endpoint) {
                    return Err(TmError::integrity(format!(
                        "flow '{}' references unregistered element {}",
                        element.name(),
                        endpoint
                    )));
                }
            }
            edges.push(FlowEdge {
                flow: element.id(),
                src: flow.src(),
                dst: flow.dst(),
            });
        }

        let (incoming_offsets, incoming) = Self::build_adjacency(slots.len(), &slots, &edges, |e| e.dst);
        let (outgoing_offsets, outgoing) = Self::build_adjacency(slots.len(), &slots, &edges, |e| e.src);

        Ok(Self {
            slots,
            edges,
            incoming_offsets,
            incoming,
            outgoing_offsets,
            outgoing,
        })
    }

    /// Group edge indices by the slot `key` picks, preserving edge order.
    fn build_adjacency(
        slot_count: usize,
        slots: &HashMap<ElementId, usize>,
        edges: &[FlowEdge],
        key: impl Fn(&FlowEdge) -> ElementId,
    ) -> (Vec<usize>, Vec<usize>) {
        let mut grouped: Vec<Vec<usize>> = vec![Vec::new(); slot_count];
        for (i, edge) in edges.iter().enumerate() {
            if let Some(&slot) = slots.get(&key(edge)) {
                grouped[slot].push(i);
            }
        }

        let mut offsets = Vec::with_capacity(slot_count + 1);
        let mut flat = Vec::with_capacity(edges.len());
        offsets.push(0);
        for list in grouped {
            flat.extend(list);
            offsets.push(flat.len());
        }
        (offsets, flat)
    }

    /// Number of indexed elements.
    pub fn element_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of indexed flows.
    pub fn flow_count(&self) -> usize {
        self.edges.len()
    }

    /// Contiguous slot of an element.
    pub fn slot(&self, id: ElementId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// Edge by its index (as returned by `incoming`/`outgoing`).
    pub fn edge(&self, i: usize) -> &FlowEdge {
        &self.edges[i]
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    /// Indices of flows whose `dst` is `id`.
    pub fn incoming(&self, id: ElementId) -> &[usize] {
        match self.slot(id) {
            Some(s) => &self.incoming[self.incoming_offsets[s]..self.incoming_offsets[s + 1]],
            None => &[],
        }
    }

    /// Indices of flows whose `src` is `id`.
    pub fn outgoing(&self, id: ElementId) -> &[usize] {
        match self.slot(id) {
            Some(s) => &self.outgoing[self.outgoing_offsets[s]..self.outgoing_offsets[s + 1]],
            None => &[],
        }
    }
}
