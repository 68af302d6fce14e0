//! Parent/child containment between elements.
//!
//! Both sides of a link are always updated together, so for every pair of
//! elements `c ∈ p.children ⟺ c.parent == p`.

use tm_core::{ContainmentPolicy, ElementId, TmError, TmResult};
use tracing::debug;

use crate::model::ThreatModel;

impl ThreatModel {
    /// Make `parent` the parent of `child`.
    ///
    /// Fails if they are the same element, if `parent` is a descendant of `child`,
    /// or if `child` already has a parent (clear it first).
    pub fn set_parent(&mut self, child: ElementId, parent: ElementId) -> TmResult<()> {
        self.check_link(parent, child)?;
        self.link(parent, child)
    }

    /// Make `child` a child of `parent`. Same rules as [`ThreatModel::set_parent`].
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> TmResult<()> {
        self.check_link(parent, child)?;
        self.link(parent, child)
    }

    /// Detach `child` from `parent`. Fails if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> TmResult<()> {
        let p = self.get(parent)?;
        if !p.has_child(child) {
            return Err(TmError::invalid_relationship(format!(
                "{} is not a child of {}",
                self.label(child),
                self.label(parent)
            )));
        }
        self.unlink(parent, child);
        Ok(())
    }

    /// Detach `child` from its parent. Fails if it has none.
    pub fn clear_parent(&mut self, child: ElementId) -> TmResult<()> {
        let Some(parent) = self.get(child)?.parent else {
            return Err(TmError::invalid_relationship(format!(
                "{} has no parent",
                self.label(child)
            )));
        };
        self.unlink(parent, child);
        Ok(())
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut current = self.element(id).and_then(|e| e.parent);
        // Bounded by the element count so a corrupted chain cannot spin forever.
        while let Some(p) = current {
            if out.len() > self.len() || out.contains(&p) {
                break;
            }
            out.push(p);
            current = self.element(p).and_then(|e| e.parent);
        }
        out
    }

    /// Descendants of `id` in depth-first order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out: Vec<ElementId> = Vec::new();
        let mut stack: Vec<ElementId> = match self.element(id) {
            Some(e) => e.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(c) = stack.pop() {
            if c == id || out.contains(&c) {
                continue;
            }
            out.push(c);
            if let Some(e) = self.element(c) {
                stack.extend(e.children.iter().rev().copied());
            }
        }
        out
    }

    /// Whether `ancestor` is above `id` in the containment tree.
    pub fn is_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    fn check_link(&self, parent: ElementId, child: ElementId) -> TmResult<()> {
        let p = self.get(parent)?;
        let c = self.get(child)?;
        if parent == child {
            return Err(TmError::invalid_relationship(format!(
                "{} cannot be a parent of itself",
                self.label(child)
            )));
        }
        if self.is_ancestor(child, parent) {
            return Err(TmError::invalid_relationship(format!(
                "{} cannot be both a child and a parent of {}",
                self.label(parent),
                self.label(child)
            )));
        }
        if let Some(existing) = c.parent {
            let what = if existing == parent {
                format!("{} is already a child of {}", self.label(child), self.label(parent))
            } else {
                format!(
                    "{} already has parent {}; clear it before re-parenting",
                    self.label(child),
                    self.label(existing)
                )
            };
            return Err(TmError::invalid_relationship(what));
        }
        if self.policy() == ContainmentPolicy::NoGrandparents {
            if !c.children.is_empty() {
                return Err(TmError::invalid_relationship(format!(
                    "{} has children, so {} would become a grandparent",
                    self.label(child),
                    self.label(parent)
                )));
            }
            if p.parent.is_some() {
                return Err(TmError::invalid_relationship(format!(
                    "{} already has a parent, so it cannot take children",
                    self.label(parent)
                )));
            }
        }
        Ok(())
    }

    fn link(&mut self, parent: ElementId, child: ElementId) -> TmResult<()> {
        self.elements
            .get_mut(&parent)
            .ok_or(TmError::NotRegistered { id: parent })?
            .children
            .push(child);
        self.elements
            .get_mut(&child)
            .ok_or(TmError::NotRegistered { id: child })?
            .parent = Some(parent);
        debug!(%parent, %child, "linked containment");
        Ok(())
    }

    fn unlink(&mut self, parent: ElementId, child: ElementId) {
        if let Some(p) = self.elements.get_mut(&parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.elements.get_mut(&child) {
            c.parent = None;
        }
        debug!(%parent, %child, "unlinked containment");
    }
}
