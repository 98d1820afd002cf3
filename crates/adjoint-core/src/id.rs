//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Allocation epoch of an arena.
///
/// Every reset of an arena starts a new epoch. Handles remember the epoch
/// they were issued in, which gives O(1) staleness checks without a lookup
/// table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(pub u32);

impl Epoch {
    /// The epoch every fresh arena starts in.
    pub const INITIAL: Epoch = Epoch(0);

    /// The epoch following this one.
    ///
    /// Wraps at `u32::MAX`; a handle would have to survive four billion
    /// resets to alias a live epoch.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Epoch {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Counter for unique [`ContextId`] allocation.
static CONTEXT_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Identity of one recording context.
///
/// Detached handles carry the id of the context that issued them, so a
/// handle presented to a different context is rejected instead of resolving
/// to whatever that context stores at the same arena position. Kept at 32
/// bits so that handles stay small enough for a node to fit a cache line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

impl ContextId {
    /// Allocate a fresh id. Thread-safe.
    ///
    /// Ids wrap after four billion allocations within one process.
    pub fn next() -> Self {
        Self(CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
