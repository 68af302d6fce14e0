//! Attack-path tracing.
//!
//! Two traversals over the flow graph and the containment tree:
//!
//! - [`Tracer::find_related_attack_vectors`] walks backward from an element and
//!   reports every path of flows (and parent hops) that leads into it.
//! - [`Tracer::simulate_attack`] walks forward from an element and reports every
//!   path of flows (and child hops) an attacker holding it could follow.
//!
//! All qualifying paths are enumerated, in flow registration order. Each branch
//! carries its own visited set, so an element may show up on several paths but
//! never twice on the same one. Two filters prune paths: an immediate
//! back-and-forth over a pair of opposite flows, and any flow that returns to
//! the starting element. Traversal runs on an explicit stack, so the native
//! stack depth does not grow with the graph; [`TraceLimits`] caps the output.

use std::collections::HashSet;

use tm_core::{ElementClass, ElementId, TmError, TmResult, TraceLimits};
use tracing::{debug, warn};

use crate::indexing::FlowIndex;
use crate::model::ThreatModel;

/// Which way a trace walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Against flow direction, up the containment tree.
    Backward,
    /// Along flow direction, down the containment tree.
    Forward,
}

/// One step of an attack path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Traversal of a flow.
    Flow(ElementId),
    /// Compromise spreading to the enclosing element.
    Parent(ElementId),
    /// Pivot from an element into something it contains.
    Child(ElementId),
}

impl PathStep {
    pub fn element(self) -> ElementId {
        match self {
            PathStep::Flow(id) | PathStep::Parent(id) | PathStep::Child(id) => id,
        }
    }

    pub fn is_flow(self) -> bool {
        matches!(self, PathStep::Flow(_))
    }
}

/// An ordered sequence of steps.
///
/// Backward paths read from the candidate origin toward the traced element;
/// forward paths read from the traced element outward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackPath {
    steps: Vec<PathStep>,
    endpoint: ElementId,
}

impl AttackPath {
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The element at the far end: origin candidate when tracing backward,
    /// exposed element when tracing forward.
    pub fn endpoint(&self) -> ElementId {
        self.endpoint
    }

    /// Flow ids along the path, in path order.
    pub fn flows(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.steps.iter().filter_map(|s| match s {
            PathStep::Flow(id) => Some(*id),
            _ => None,
        })
    }

    pub fn contains_flow(&self, flow: ElementId) -> bool {
        self.steps.contains(&PathStep::Flow(flow))
    }

    /// Human-readable one-liner, e.g. `Users to API -> API to DB`.
    pub fn describe(&self, model: &ThreatModel) -> String {
        self.steps
            .iter()
            .map(|step| {
                let name = model
                    .element(step.element())
                    .map(|e| e.name().to_string())
                    .unwrap_or_else(|| step.element().to_string());
                match step {
                    PathStep::Flow(_) => name,
                    PathStep::Parent(_) => format!("[parent: {}]", name),
                    PathStep::Child(_) => format!("[child: {}]", name),
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Result of one traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub direction: Direction,
    pub origin: ElementId,
    pub paths: Vec<AttackPath>,
    /// A limit stopped enumeration before every path was found.
    pub truncated: bool,
}

impl Trace {
    /// Distinct path endpoints in discovery order.
    pub fn reached(&self) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        self.paths
            .iter()
            .map(AttackPath::endpoint)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Internal step: flows are kept as edge indices for O(1) endpoint lookup.
#[derive(Debug, Clone, Copy)]
enum Hop {
    Edge(usize),
    Link(ElementId),
}

/// One pending descent: the element reached, the path so far (in walk order),
/// the branch's visited set and how far its candidates have been consumed.
struct Frame {
    node: ElementId,
    path: Vec<Hop>,
    visited: HashSet<ElementId>,
    edge_cursor: usize,
    link_cursor: usize,
}

impl Frame {
    fn new(node: ElementId, path: Vec<Hop>, visited: HashSet<ElementId>) -> Self {
        Self {
            node,
            path,
            visited,
            edge_cursor: 0,
            link_cursor: 0,
        }
    }
}

/// Attack-path tracer over an immutable borrow of a model.
///
/// Holding `&ThreatModel` for its lifetime keeps the model frozen while paths
/// are enumerated.
#[derive(Debug)]
pub struct Tracer<'m> {
    model: &'m ThreatModel,
    index: FlowIndex,
    limits: TraceLimits,
}

impl<'m> Tracer<'m> {
    /// Validate the model and index its flows.
    pub fn new(model: &'m ThreatModel) -> TmResult<Self> {
        model.validate()?;
        let index = FlowIndex::from_model(model)?;
        Ok(Self {
            model,
            index,
            limits: TraceLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: TraceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> TraceLimits {
        self.limits
    }

    pub fn model(&self) -> &'m ThreatModel {
        self.model
    }

    /// Every path leading into `initial`, read from origin to `initial`.
    pub fn find_related_attack_vectors(&self, initial: ElementId) -> TmResult<Trace> {
        self.run(initial, Direction::Backward)
    }

    /// Every path leading out of `target`, read from `target` outward.
    pub fn simulate_attack(&self, target: ElementId) -> TmResult<Trace> {
        self.run(target, Direction::Forward)
    }

    /// Run a trace in either direction.
    pub fn trace(&self, start: ElementId, direction: Direction) -> TmResult<Trace> {
        self.run(start, direction)
    }

    fn run(&self, origin: ElementId, direction: Direction) -> TmResult<Trace> {
        let element = self.model.get(origin)?;
        if !element.class().is_endpoint() {
            return Err(TmError::invalid_argument(format!(
                "{} cannot be traced; expected a {} or {}",
                self.model.label(origin),
                ElementClass::Component,
                ElementClass::Actor
            )));
        }

        let mut paths = Vec::new();
        let mut truncated = false;
        let mut stack = vec![Frame::new(origin, Vec::new(), HashSet::from([origin]))];

        'walk: while let Some(frame) = stack.last_mut() {
            let Some((path, node)) = self.next_candidate(frame, origin, direction) else {
                stack.pop();
                continue;
            };

            if !self.limits.allows_depth(path.len()) {
                truncated = true;
                continue;
            }
            if !self.limits.allows_another_path(paths.len()) {
                truncated = true;
                break 'walk;
            }

            paths.push(self.finish(&path, node, direction));

            let mut visited = frame.visited.clone();
            if visited.insert(node) {
                stack.push(Frame::new(node, path, visited));
            }
        }

        debug!(
            origin = %origin,
            ?direction,
            paths = paths.len(),
            truncated,
            "attack-path trace finished"
        );
        if truncated {
            warn!(
                origin = %origin,
                ?direction,
                limits = ?self.limits,
                "attack-path trace truncated by limits"
            );
        }

        Ok(Trace {
            direction,
            origin,
            paths,
            truncated,
        })
    }

    /// Advance `frame` to its next qualifying step: first flows, then
    /// containment links. Returns the extended path and the element it reaches.
    fn next_candidate(
        &self,
        frame: &mut Frame,
        origin: ElementId,
        direction: Direction,
    ) -> Option<(Vec<Hop>, ElementId)> {
        let edges = match direction {
            Direction::Backward => self.index.incoming(frame.node),
            Direction::Forward => self.index.outgoing(frame.node),
        };
        while frame.edge_cursor < edges.len() {
            let i = edges[frame.edge_cursor];
            frame.edge_cursor += 1;
            let edge = self.index.edge(i);

            // Immediate back-and-forth over two opposite flows.
            if let Some(Hop::Edge(prev)) = frame.path.last() {
                let prev = self.index.edge(*prev);
                let oscillates = match direction {
                    Direction::Backward => edge.src == prev.dst,
                    Direction::Forward => edge.dst == prev.src,
                };
                if oscillates {
                    continue;
                }
            }

            // Earlier flows on the path were checked when they were added.
            let (loops_back, next) = match direction {
                Direction::Backward => (edge.src == origin, edge.src),
                Direction::Forward => (edge.dst == origin, edge.dst),
            };
            if loops_back {
                continue;
            }

            let mut path = frame.path.clone();
            path.push(Hop::Edge(i));
            return Some((path, next));
        }

        let links: &[ElementId] = match (direction, self.model.element(frame.node)) {
            (Direction::Backward, Some(e)) => e.parent.as_slice(),
            (Direction::Forward, Some(e)) => e.children(),
            (_, None) => &[],
        };
        while frame.link_cursor < links.len() {
            let link = links[frame.link_cursor];
            frame.link_cursor += 1;
            if frame.visited.contains(&link) {
                continue;
            }
            let mut path = frame.path.clone();
            path.push(Hop::Link(link));
            return Some((path, link));
        }

        None
    }

    /// Convert a walk-order hop list into a public path.
    fn finish(&self, hops: &[Hop], endpoint: ElementId, direction: Direction) -> AttackPath {
        let to_step = |hop: &Hop| match (*hop, direction) {
            (Hop::Edge(i), _) => PathStep::Flow(self.index.edge(i).flow),
            (Hop::Link(id), Direction::Backward) => PathStep::Parent(id),
            (Hop::Link(id), Direction::Forward) => PathStep::Child(id),
        };
        let steps = match direction {
            Direction::Backward => hops.iter().rev().map(to_step).collect(),
            Direction::Forward => hops.iter().map(to_step).collect(),
        };
        AttackPath { steps, endpoint }
    }
}
