//! Tunable rules for containment and attack-path enumeration.

/// How deep parent/child containment may nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ContainmentPolicy {
    /// Arbitrary nesting depth; only cycles are rejected.
    #[default]
    Nested,
    /// Two levels at most: a child may not have children and a parent may not have a parent.
    NoGrandparents,
}

/// Bounds on path enumeration.
///
/// Path enumeration is exponential on dense graphs; these limits cut it off.
/// A trace that hits a limit reports itself as truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceLimits {
    /// Maximum number of steps in a single path.
    pub max_depth: Option<usize>,
    /// Maximum number of paths collected by one trace.
    pub max_paths: Option<usize>,
}

impl TraceLimits {
    pub const DEFAULT_MAX_PATHS: usize = 100_000;

    /// No bounds at all.
    pub fn unbounded() -> Self {
        Self {
            max_depth: None,
            max_paths: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_paths(mut self, paths: usize) -> Self {
        self.max_paths = Some(paths);
        self
    }

    /// Whether a path of `len` steps is allowed.
    pub fn allows_depth(&self, len: usize) -> bool {
        self.max_depth.is_none_or(|max| len <= max)
    }

    /// Whether another path can be collected when `collected` are already held.
    pub fn allows_another_path(&self, collected: usize) -> bool {
        self.max_paths.is_none_or(|max| collected < max)
    }
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_paths: Some(Self::DEFAULT_MAX_PATHS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let limits = TraceLimits::default();
        assert!(limits.allows_depth(10_000));
        assert!(limits.allows_another_path(TraceLimits::DEFAULT_MAX_PATHS - 1));
        assert!(!limits.allows_another_path(TraceLimits::DEFAULT_MAX_PATHS));
    }

    #[test]
    fn explicit_limits() {
        let limits = TraceLimits::unbounded().with_max_depth(2).with_max_paths(3);
        assert!(limits.allows_depth(2));
        assert!(!limits.allows_depth(3));
        assert!(limits.allows_another_path(2));
        assert!(!limits.allows_another_path(3));
    }

    #[test]
    fn default_policy_allows_nesting() {
        assert_eq!(ContainmentPolicy::default(), ContainmentPolicy::Nested);
    }
}
