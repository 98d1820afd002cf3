//! Allocation handles.
//!
//! A [`Span`] encodes the physical location of an allocation within a
//! [`BlockArena`](crate::BlockArena). It is epoch-scoped: the `epoch` field
//! allows O(1) staleness checks after a reset.

use std::fmt;

use adjoint_core::Epoch;

/// Location of a contiguous run of elements within an arena.
///
/// Spans are `Copy` and carry no lifetime; resolving one goes through the
/// arena, which checks the epoch first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Span {
    /// Arena epoch when this allocation was made.
    pub(crate) epoch: Epoch,
    /// Index of the block holding the data.
    pub(crate) block: u32,
    /// Element offset within the block.
    pub(crate) offset: u32,
    /// Number of elements.
    pub(crate) len: u32,
}

impl Span {
    /// `None` if any coordinate does not fit the packed `u32` fields.
    pub(crate) fn new(epoch: Epoch, block: usize, offset: usize, len: usize) -> Option<Self> {
        Some(Self {
            epoch,
            block: u32::try_from(block).ok()?,
            offset: u32::try_from(offset).ok()?,
            len: u32::try_from(len).ok()?,
        })
    }

    /// The epoch this span belongs to.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Index of the block holding the data.
    pub fn block(&self) -> usize {
        self.block as usize
    }

    /// Element offset within the block.
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Span(epoch={}, block={}, off={}, len={})",
            self.epoch, self.block, self.offset, self.len
        )
    }
}
