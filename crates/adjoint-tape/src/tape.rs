//! Append-only record of operations in creation order.

use adjoint_arena::Span;

use crate::node::NodeRef;

/// One recorded operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entry {
    /// A scalar node in the node arena.
    Scalar(NodeRef),
    /// A matrix operation in the matrix-op arena.
    Matrix(Span),
}

/// Ordered list of recorded operations.
///
/// Entries appear in creation order, and an operation only ever references
/// operations created before it, so iterating backwards visits every entry
/// after everything that depends on it.
#[derive(Debug, Default)]
pub struct Tape {
    entries: Vec<Entry>,
}

impl Tape {
    /// Create an empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Entries from newest to oldest.
    pub fn iter_reverse(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().rev()
    }

    /// Entries in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjoint_arena::{ArenaConfig, BlockArena};

    #[test]
    fn reverse_iteration_is_newest_first() {
        let mut arena = BlockArena::new(ArenaConfig::new()).unwrap();
        let spans: Vec<Span> = (0..3).map(|i| arena.push(i as f64).unwrap()).collect();
        let mut tape = Tape::new();
        for &s in &spans {
            tape.push(Entry::Matrix(s));
        }
        let order: Vec<Entry> = tape.iter_reverse().copied().collect();
        assert_eq!(
            order,
            vec![
                Entry::Matrix(spans[2]),
                Entry::Matrix(spans[1]),
                Entry::Matrix(spans[0]),
            ]
        );
    }

    #[test]
    fn clear_empties() {
        let mut arena = BlockArena::new(ArenaConfig::new()).unwrap();
        let mut tape = Tape::new();
        tape.push(Entry::Matrix(arena.push(0.0f64).unwrap()));
        assert_eq!(tape.len(), 1);
        tape.clear();
        assert!(tape.is_empty());
        tape.clear();
        assert!(tape.is_empty());
    }
}
