//! Findings: assessed threats against specific model elements.
//!
//! A finding ties one or more affected components (flows included) to the
//! threats identified on them and the controls that answer those threats.
//! Threats and controls are referenced by id and must be attached to at least
//! one affected element; the model checks this when the finding is added and
//! again in `validate`.

use std::collections::HashSet;
use std::hash::Hash;

use tm_core::{ElementId, FindingId, TmError, TmResult};

use crate::element::SecurityProperty;

/// Free-text risk assessment of a finding. `None` means not evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assessment {
    pub relevance: Option<String>,
    /// Overall likelihood.
    pub likelihood: Option<String>,
    pub likelihood_event_occurrence: Option<String>,
    pub likelihood_adverse_event: Option<String>,
    /// Overall impact.
    pub impact: Option<String>,
    pub technical_impact: SecurityProperty,
    pub business_impact: Option<String>,
    pub predispositions: Vec<String>,
    pub severity: Option<String>,
    pub pervasiveness: Option<String>,
    pub risk: Option<String>,
    pub residual_risk: Option<String>,
}

/// One assessed finding.
///
/// Equality is identity: two findings with the same content are still two
/// findings.
#[derive(Debug, Clone)]
pub struct Finding {
    pub(crate) id: FindingId,
    pub(crate) affected: Vec<ElementId>,
    pub(crate) threats: Vec<String>,
    pub(crate) controls: Vec<String>,
    pub assessment: Assessment,
}

impl Finding {
    pub fn new<S: Into<String>>(
        affected: impl IntoIterator<Item = ElementId>,
        threats: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            id: FindingId::fresh(),
            affected: affected.into_iter().collect(),
            threats: threats.into_iter().map(Into::into).collect(),
            controls: Vec::new(),
            assessment: Assessment::default(),
        }
    }

    pub fn with_controls<S: Into<String>>(mut self, controls: impl IntoIterator<Item = S>) -> Self {
        self.controls.extend(controls.into_iter().map(Into::into));
        self
    }

    pub fn with_assessment(mut self, assessment: Assessment) -> Self {
        self.assessment = assessment;
        self
    }

    pub fn id(&self) -> FindingId {
        self.id
    }

    pub fn affected(&self) -> &[ElementId] {
        &self.affected
    }

    /// Threat ids, in the order given.
    pub fn threats(&self) -> &[String] {
        &self.threats
    }

    /// Control ids, in the order given.
    pub fn controls(&self) -> &[String] {
        &self.controls
    }

    pub fn affects(&self, element: ElementId) -> bool {
        self.affected.contains(&element)
    }

    /// Checks that need no model: something is affected, at least one threat
    /// is named, and nothing is listed twice.
    pub(crate) fn check_shape(&self) -> TmResult<()> {
        if self.affected.is_empty() {
            return Err(TmError::invalid_argument(format!(
                "finding {} affects no element",
                self.id
            )));
        }
        if self.threats.is_empty() {
            return Err(TmError::invalid_argument(format!(
                "finding {} names no threat",
                self.id
            )));
        }
        if let Some(dup) = first_duplicate(self.affected.iter()) {
            return Err(TmError::invalid_argument(format!(
                "finding {} lists element {} twice",
                self.id, dup
            )));
        }
        for (what, ids) in [("threat", &self.threats), ("control", &self.controls)] {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(TmError::invalid_argument(format!(
                    "finding {} has an empty {} id",
                    self.id, what
                )));
            }
            if let Some(dup) = first_duplicate(ids.iter()) {
                return Err(TmError::invalid_argument(format!(
                    "finding {} lists {} '{}' twice",
                    self.id, what, dup
                )));
            }
        }
        Ok(())
    }
}

impl PartialEq for Finding {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Finding {}

fn first_duplicate<T: Eq + Hash + Copy>(mut items: impl Iterator<Item = T>) -> Option<T> {
    let mut seen = HashSet::new();
    items.find(|&item| !seen.insert(item))
}
