//! Fixed-capacity bump blocks.
//!
//! A [`Block`] is a contiguous `Vec<T>` reserved to its full capacity up
//! front. Allocation only ever appends within that reservation, so the
//! backing storage is never reallocated and offsets stay valid for the whole
//! epoch.

use crate::error::ArenaError;

/// A single contiguous block with bump allocation.
///
/// Blocks are the fundamental storage unit of the arena. The vector length
/// doubles as the bump cursor. Blocks are never freed during an epoch; they are
/// only reset or dropped on release.
pub struct Block<T> {
    /// Backing storage. `data.len()` is the cursor.
    data: Vec<T>,
    /// Capacity requested at creation; `data` never grows past it.
    capacity: usize,
}

impl<T: Copy> Block<T> {
    /// Reserve a block able to hold `capacity` elements.
    ///
    /// Uses a fallible reservation so that allocator refusal surfaces as
    /// [`ArenaError::OutOfMemory`] instead of aborting.
    pub fn with_capacity(capacity: usize) -> Result<Self, ArenaError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| ArenaError::OutOfMemory {
                requested: capacity.saturating_mul(std::mem::size_of::<T>()),
                capacity: 0,
            })?;
        Ok(Self { data, capacity })
    }

    /// Reserve a block and fill all of it with `fill`.
    pub fn filled(capacity: usize, fill: T) -> Result<Self, ArenaError> {
        let mut block = Self::with_capacity(capacity)?;
        block.data.resize(capacity, fill);
        Ok(block)
    }

    /// Bump-allocate one element.
    ///
    /// Returns the element's offset, or `None` if the block is full.
    pub fn push(&mut self, value: T) -> Option<usize> {
        if self.remaining() == 0 {
            return None;
        }
        let offset = self.data.len();
        self.data.push(value);
        Some(offset)
    }

    /// Bump-allocate `len` elements initialised to `fill`.
    ///
    /// Returns the starting offset, or `None` if there is insufficient
    /// remaining capacity.
    pub fn extend_filled(&mut self, len: usize, fill: T) -> Option<usize> {
        if len > self.remaining() {
            return None;
        }
        let offset = self.data.len();
        self.data.resize(offset + len, fill);
        Some(offset)
    }

    /// Rewind the cursor to zero without deallocating.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// The allocated prefix of the block.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The allocated prefix of the block, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Number of elements currently allocated.
    pub fn used(&self) -> usize {
        self.data.len()
    }

    /// Total capacity in elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remaining free capacity in elements.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Memory reserved for this block in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.capacity * std::mem::size_of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_sequential_offsets() {
        let mut block = Block::with_capacity(4).unwrap();
        assert_eq!(block.push(1.0f64), Some(0));
        assert_eq!(block.push(2.0), Some(1));
        assert_eq!(block.used(), 2);
        assert_eq!(block.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn push_fails_when_full() {
        let mut block = Block::with_capacity(1).unwrap();
        assert!(block.push(0u64).is_some());
        assert!(block.push(0u64).is_none());
    }

    #[test]
    fn extend_filled_fills_and_bounds() {
        let mut block = Block::with_capacity(10).unwrap();
        assert_eq!(block.extend_filled(6, 0.5f64), Some(0));
        assert_eq!(block.extend_filled(4, 1.5), Some(6));
        assert!(block.extend_filled(1, 0.0).is_none());
        assert!(block.as_slice()[..6].iter().all(|&v| v == 0.5));
        assert!(block.as_slice()[6..].iter().all(|&v| v == 1.5));
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut block = Block::with_capacity(8).unwrap();
        block.extend_filled(8, 3u32).unwrap();
        block.reset();
        assert_eq!(block.used(), 0);
        assert_eq!(block.capacity(), 8);
        assert_eq!(block.remaining(), 8);
    }

    #[test]
    fn filled_block_is_fully_used() {
        let block = Block::filled(5, 0.0f64).unwrap();
        assert_eq!(block.used(), 5);
        assert_eq!(block.remaining(), 0);
        assert_eq!(block.memory_bytes(), 40);
    }

    #[test]
    fn zero_capacity_block_is_valid() {
        let mut block = Block::<f64>::with_capacity(0).unwrap();
        assert_eq!(block.extend_filled(0, 0.0), Some(0));
        assert!(block.push(1.0).is_none());
    }
}
