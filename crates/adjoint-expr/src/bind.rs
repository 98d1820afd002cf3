//! The bind half of the two-phase memory protocol.
//!
//! A [`Binder`] hands out slots from two cursors, one per buffer. Nodes claim
//! their own slot first and then bind their children, so a node's slot always
//! precedes its descendants' slots. The resulting [`Layout`] can be checked
//! against the [`SizeRequirement`] that sized the buffers.

use std::fmt;
use std::ops::{Add, Range};

use log::trace;
use smallvec::SmallVec;

use crate::error::ExprError;

/// Words of value and adjoint storage an expression needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeRequirement {
    /// Words in the shared value buffer.
    pub values: usize,
    /// Words in the shared adjoint buffer.
    pub adjoints: usize,
}

impl SizeRequirement {
    /// Nothing required.
    pub const ZERO: SizeRequirement = SizeRequirement {
        values: 0,
        adjoints: 0,
    };

    /// Create a requirement.
    pub const fn new(values: usize, adjoints: usize) -> Self {
        Self { values, adjoints }
    }
}

impl Add for SizeRequirement {
    type Output = SizeRequirement;

    fn add(self, rhs: SizeRequirement) -> SizeRequirement {
        SizeRequirement {
            values: self.values + rhs.values,
            adjoints: self.adjoints + rhs.adjoints,
        }
    }
}

/// A contiguous range of one buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Slot {
    /// First word.
    pub offset: usize,
    /// Number of words.
    pub len: usize,
}

impl Slot {
    /// One past the last word.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The slot as an index range.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.offset, self.end())
    }
}

/// Which node kind made a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Input matrix; value aliases caller storage.
    Leaf,
    /// Matrix product.
    MatMul,
}

impl NodeKind {
    /// Lowercase name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::MatMul => "matmul",
        }
    }
}

/// Value and adjoint slots claimed by one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Claim {
    /// Claiming node.
    pub kind: NodeKind,
    /// Slot in the value buffer (empty for leaves).
    pub value: Slot,
    /// Slot in the adjoint buffer.
    pub adjoint: Slot,
}

/// Cursor pair advanced by each node's `bind`.
#[derive(Debug, Default)]
pub struct Binder {
    value_cursor: usize,
    adjoint_cursor: usize,
    claims: SmallVec<[Claim; 8]>,
}

impl Binder {
    /// Start both cursors at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `values` and `adjoints` words at the current cursors and
    /// advance past them.
    pub fn claim(&mut self, kind: NodeKind, values: usize, adjoints: usize) -> Claim {
        let claim = Claim {
            kind,
            value: Slot {
                offset: self.value_cursor,
                len: values,
            },
            adjoint: Slot {
                offset: self.adjoint_cursor,
                len: adjoints,
            },
        };
        self.value_cursor += values;
        self.adjoint_cursor += adjoints;
        trace!(
            "bound {} value {} adjoint {}",
            kind.name(),
            claim.value,
            claim.adjoint
        );
        self.claims.push(claim);
        claim
    }

    /// Current cursor positions.
    pub fn cursors(&self) -> SizeRequirement {
        SizeRequirement::new(self.value_cursor, self.adjoint_cursor)
    }

    /// Stop binding and keep the record of every claim.
    pub fn finish(self) -> Layout {
        Layout {
            claims: self.claims,
        }
    }
}

/// Every slot claimed during one bind pass, in bind order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    claims: SmallVec<[Claim; 8]>,
}

impl Layout {
    /// Claims in bind order (parents before children).
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Total value and adjoint words claimed.
    pub fn total(&self) -> SizeRequirement {
        self.claims
            .iter()
            .fold(SizeRequirement::ZERO, |acc, c| {
                acc + SizeRequirement::new(c.value.len, c.adjoint.len)
            })
    }

    /// Check that the claimed slots tile both buffers of `required` size
    /// exactly: no overlap, no gap, nothing left over.
    pub fn verify(&self, required: SizeRequirement) -> Result<(), ExprError> {
        check_tiling("value", self.claims.iter().map(|c| c.value), required.values)?;
        check_tiling(
            "adjoint",
            self.claims.iter().map(|c| c.adjoint),
            required.adjoints,
        )
    }
}

fn check_tiling(
    buffer: &'static str,
    slots: impl Iterator<Item = Slot>,
    total: usize,
) -> Result<(), ExprError> {
    let mut slots: Vec<Slot> = slots.filter(|s| s.len > 0).collect();
    slots.sort_by_key(|s| s.offset);

    let mut cursor = 0;
    for slot in &slots {
        if slot.offset < cursor {
            return Err(ExprError::LayoutMismatch {
                buffer,
                detail: format!("slot {slot} overlaps words before {cursor}"),
            });
        }
        if slot.offset > cursor {
            return Err(ExprError::LayoutMismatch {
                buffer,
                detail: format!("gap [{cursor}..{}) before slot {slot}", slot.offset),
            });
        }
        cursor = slot.end();
    }
    if cursor != total {
        return Err(ExprError::LayoutMismatch {
            buffer,
            detail: format!("slots cover {cursor} words, buffer needs {total}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(value: (usize, usize), adjoint: (usize, usize)) -> Claim {
        Claim {
            kind: NodeKind::MatMul,
            value: Slot {
                offset: value.0,
                len: value.1,
            },
            adjoint: Slot {
                offset: adjoint.0,
                len: adjoint.1,
            },
        }
    }

    fn layout(claims: &[Claim]) -> Layout {
        Layout {
            claims: claims.iter().copied().collect(),
        }
    }

    #[test]
    fn binder_claims_are_contiguous() {
        let mut b = Binder::new();
        let first = b.claim(NodeKind::MatMul, 4, 4);
        let second = b.claim(NodeKind::Leaf, 0, 6);
        assert_eq!(first.value.range(), 0..4);
        assert_eq!(second.value, Slot { offset: 4, len: 0 });
        assert_eq!(second.adjoint.range(), 4..10);
        assert_eq!(b.cursors(), SizeRequirement::new(4, 10));
        let l = b.finish();
        assert_eq!(l.total(), SizeRequirement::new(4, 10));
        assert!(l.verify(SizeRequirement::new(4, 10)).is_ok());
    }

    #[test]
    fn overlap_detected() {
        let l = layout(&[claim((0, 4), (0, 4)), claim((2, 4), (4, 4))]);
        let err = l.verify(SizeRequirement::new(6, 8)).unwrap_err();
        assert!(matches!(err, ExprError::LayoutMismatch { buffer: "value", .. }));
    }

    #[test]
    fn gap_detected() {
        let l = layout(&[claim((0, 4), (0, 4)), claim((4, 4), (5, 4))]);
        let err = l.verify(SizeRequirement::new(8, 9)).unwrap_err();
        assert!(matches!(
            err,
            ExprError::LayoutMismatch {
                buffer: "adjoint",
                ..
            }
        ));
    }

    #[test]
    fn total_mismatch_detected() {
        let l = layout(&[claim((0, 4), (0, 4))]);
        assert!(l.verify(SizeRequirement::new(5, 4)).is_err());
        assert!(l.verify(SizeRequirement::new(4, 3)).is_err());
    }

    #[test]
    fn empty_layout_tiles_empty_buffers() {
        assert!(Layout::default().verify(SizeRequirement::ZERO).is_ok());
    }

    #[test]
    fn slot_display() {
        assert_eq!(Slot { offset: 2, len: 3 }.to_string(), "[2..5)");
    }
}
