use core::fmt;
use core::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for a model element.
///
/// - allocated from a single atomic counter, never reused (not even after a model reset)
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(NonZeroU64);

impl Id {
    /// Allocate the next identifier.
    pub fn fresh() -> Self {
        let raw = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        // counter starts at 1 and would need 2^64 allocations to wrap
        Self(NonZeroU64::new(raw).expect("id counter is nonzero"))
    }

    /// Rebuild an Id from its raw value (None for 0).
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw counter value.
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.raw())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw())
    }
}

/// Domain-specific ID alias for clarity (no runtime cost).
pub type ElementId = Id;

/// Findings draw from the same counter, so they never collide with elements.
pub type FindingId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_distinct() {
        let a = Id::fresh();
        let b = Id::fresh();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn raw_round_trip() {
        let id = Id::fresh();
        assert_eq!(Id::from_raw(id.raw()), Some(id));
        assert_eq!(Id::from_raw(0), None);
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }
}
