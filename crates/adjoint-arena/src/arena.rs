//! Growable, epoch-scoped block arena.
//!
//! [`BlockArena`] is an ordered list of [`Block`]s plus a current-block
//! index. Allocations bump the current block; on overflow the arena scans
//! forward for an idle block with enough room, and only then reserves a new
//! block of `max(2 × last capacity, requested)` elements. That gives
//! amortised O(1) allocation and O(log N) blocks for N elements.
//!
//! The lifecycle per gradient computation is:
//! 1. `push()` / `alloc_filled()`: record nodes and payloads
//! 2. `get()` / `slice_mut()`: resolve spans during the sweeps
//! 3. `reset()`: rewind for the next epoch, keeping every block

use adjoint_core::Epoch;
use log::{debug, trace};

use crate::block::Block;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::handle::Span;
use crate::stats::ArenaStats;

/// Bump allocator over geometrically growing blocks of `T`.
///
/// Element types are `Copy`: reset never runs destructors, so payloads must
/// not own external resources.
pub struct BlockArena<T> {
    /// All blocks, in creation order.
    blocks: Vec<Block<T>>,
    /// Index of the block currently being filled.
    current: usize,
    /// Stamped into every span; bumped on reset and release.
    epoch: Epoch,
    /// Number of resets since construction.
    resets: u64,
    config: ArenaConfig,
}

impl<T: Copy> BlockArena<T> {
    /// Create an arena holding one initial block.
    ///
    /// Returns `Err(ArenaError::InvalidConfig)` if `config` fails validation,
    /// or `Err(ArenaError::OutOfMemory)` if the first block cannot be
    /// reserved.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let first = Block::with_capacity(config.block_len::<T>())?;
        Ok(Self {
            blocks: vec![first],
            current: 0,
            epoch: Epoch::INITIAL,
            resets: 0,
            config,
        })
    }

    /// Allocate a single element.
    pub fn push(&mut self, value: T) -> Result<Span, ArenaError> {
        let block = self.block_for(1)?;
        let offset = self.blocks[block]
            .push(value)
            .ok_or(ArenaError::OutOfMemory {
                requested: std::mem::size_of::<T>(),
                capacity: self.memory_bytes(),
            })?;
        self.span(block, offset, 1)
    }

    /// Allocate `len` contiguous elements initialised to `fill`.
    ///
    /// An allocation is never split across blocks. Zero-length requests
    /// succeed and return an empty span at the current cursor.
    pub fn alloc_filled(&mut self, len: usize, fill: T) -> Result<Span, ArenaError> {
        if len > u32::MAX as usize {
            return Err(ArenaError::OutOfMemory {
                requested: len.saturating_mul(std::mem::size_of::<T>()),
                capacity: self.memory_bytes(),
            });
        }
        let block = self.block_for(len)?;
        let offset = self.blocks[block]
            .extend_filled(len, fill)
            .ok_or(ArenaError::OutOfMemory {
                requested: len * std::mem::size_of::<T>(),
                capacity: self.memory_bytes(),
            })?;
        self.span(block, offset, len)
    }

    fn span(&self, block: usize, offset: usize, len: usize) -> Result<Span, ArenaError> {
        Span::new(self.epoch, block, offset, len).ok_or(ArenaError::OutOfMemory {
            requested: len.saturating_mul(std::mem::size_of::<T>()),
            capacity: self.memory_bytes(),
        })
    }

    /// Pick the block that will serve a request of `len` elements, growing
    /// the arena if no existing block has room.
    fn block_for(&mut self, len: usize) -> Result<usize, ArenaError> {
        if self.blocks[self.current].remaining() >= len {
            return Ok(self.current);
        }

        // Scan forward through blocks left idle by an earlier reset.
        if let Some(idle) = (self.current + 1..self.blocks.len())
            .find(|&i| self.blocks[i].remaining() >= len)
        {
            self.current = idle;
            return Ok(idle);
        }

        let elem = std::mem::size_of::<T>().max(1);
        let last = self
            .blocks
            .last()
            .map_or(self.config.block_len::<T>(), Block::capacity);
        let mut new_len = last.saturating_mul(2).max(len);

        if let Some(max) = self.config.max_bytes {
            let budget = max.saturating_sub(self.memory_bytes()) / elem;
            if budget < len {
                return Err(ArenaError::OutOfMemory {
                    requested: len.saturating_mul(elem),
                    capacity: self.memory_bytes(),
                });
            }
            // Doubling past the cap falls back to whatever budget is left.
            new_len = new_len.min(budget);
        }

        let block = Block::with_capacity(new_len).map_err(|_| ArenaError::OutOfMemory {
            requested: new_len.saturating_mul(elem),
            capacity: self.memory_bytes(),
        })?;
        self.blocks.push(block);
        self.current = self.blocks.len() - 1;
        debug!(
            "arena grew to {} blocks (+{} elements, {} bytes total)",
            self.blocks.len(),
            new_len,
            self.memory_bytes()
        );
        Ok(self.current)
    }

    fn check(&self, span: Span) -> Result<&Block<T>, ArenaError> {
        if span.epoch != self.epoch {
            return Err(ArenaError::StaleHandle {
                handle_epoch: span.epoch,
                current_epoch: self.epoch,
            });
        }
        let block = self
            .blocks
            .get(span.block())
            .ok_or(ArenaError::InvalidSpan { span })?;
        if span.offset() + span.len() > block.used() {
            return Err(ArenaError::InvalidSpan { span });
        }
        Ok(block)
    }

    /// Resolve a single-element span.
    pub fn get(&self, span: Span) -> Result<&T, ArenaError> {
        self.slice(span)?
            .first()
            .ok_or(ArenaError::InvalidSpan { span })
    }

    /// Resolve a single-element span mutably.
    pub fn get_mut(&mut self, span: Span) -> Result<&mut T, ArenaError> {
        self.slice_mut(span)?
            .first_mut()
            .ok_or(ArenaError::InvalidSpan { span })
    }

    /// Resolve a span to its elements.
    pub fn slice(&self, span: Span) -> Result<&[T], ArenaError> {
        let block = self.check(span)?;
        let start = span.offset();
        Ok(&block.as_slice()[start..start + span.len()])
    }

    /// Resolve a span to its elements, mutably.
    pub fn slice_mut(&mut self, span: Span) -> Result<&mut [T], ArenaError> {
        self.check(span)?;
        let start = span.offset();
        let block = &mut self.blocks[span.block()];
        Ok(&mut block.as_mut_slice()[start..start + span.len()])
    }

    /// Iterate mutably over every element allocated in the current epoch,
    /// in allocation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.blocks
            .iter_mut()
            .flat_map(|block| block.as_mut_slice().iter_mut())
    }

    /// Rewind to the first block without releasing memory.
    ///
    /// Every span issued before the reset becomes stale. Block count and
    /// capacities are preserved; calling this on a fresh arena is a no-op
    /// apart from the epoch bump.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.reset();
        }
        self.current = 0;
        self.epoch = self.epoch.next();
        self.resets += 1;
        trace!(
            "arena reset to epoch {} ({} blocks kept)",
            self.epoch,
            self.blocks.len()
        );
    }

    /// Full teardown: drop every block and start over with a fresh initial
    /// block.
    pub fn release(&mut self) -> Result<(), ArenaError> {
        let freed = self.memory_bytes();
        self.blocks.clear();
        self.blocks
            .push(Block::with_capacity(self.config.block_len::<T>())?);
        self.current = 0;
        self.epoch = self.epoch.next();
        debug!("arena released {freed} bytes");
        Ok(())
    }

    /// The current epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Index of the block currently being filled.
    pub fn current_block(&self) -> usize {
        self.current
    }

    /// Number of blocks held.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Capacity of each block in elements, in creation order.
    pub fn block_capacities(&self) -> Vec<usize> {
        self.blocks.iter().map(Block::capacity).collect()
    }

    /// Elements allocated in the current epoch.
    pub fn used(&self) -> usize {
        self.blocks.iter().map(Block::used).sum()
    }

    /// Total capacity in elements.
    pub fn capacity(&self) -> usize {
        self.blocks.iter().map(Block::capacity).sum()
    }

    /// Total reserved memory in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.blocks.iter().map(Block::memory_bytes).sum()
    }

    /// The configuration this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            block_count: self.blocks.len(),
            capacity_bytes: self.memory_bytes(),
            used_bytes: self.used() * std::mem::size_of::<T>(),
            resets: self.resets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(bytes: usize) -> ArenaConfig {
        ArenaConfig::new().with_initial_block_bytes(bytes)
    }

    #[test]
    fn push_and_get_roundtrip() {
        let mut arena = BlockArena::new(ArenaConfig::new()).unwrap();
        let a = arena.push(1.5f64).unwrap();
        let b = arena.push(2.5f64).unwrap();
        assert_eq!(*arena.get(a).unwrap(), 1.5);
        assert_eq!(*arena.get(b).unwrap(), 2.5);
        *arena.get_mut(a).unwrap() += 1.0;
        assert_eq!(*arena.get(a).unwrap(), 2.5);
    }

    #[test]
    fn grows_by_doubling_last_block() {
        // 4 f64 per initial block.
        let mut arena = BlockArena::new(small(32)).unwrap();
        for i in 0..4 {
            arena.push(i as f64).unwrap();
        }
        assert_eq!(arena.block_count(), 1);
        arena.push(4.0).unwrap();
        assert_eq!(arena.block_capacities(), vec![4, 8]);
        for i in 0..8 {
            arena.push(i as f64).unwrap();
        }
        assert_eq!(arena.block_capacities(), vec![4, 8, 16]);
    }

    #[test]
    fn oversized_request_gets_exact_block() {
        let mut arena = BlockArena::new(small(32)).unwrap();
        let span = arena.alloc_filled(100, 0.0f64).unwrap();
        assert_eq!(span.block(), 1);
        assert_eq!(arena.block_capacities(), vec![4, 100]);
    }

    #[test]
    fn slices_never_split_across_blocks() {
        let mut arena = BlockArena::new(small(32)).unwrap();
        arena.alloc_filled(3, 1.0f64).unwrap();
        let span = arena.alloc_filled(3, 2.0f64).unwrap();
        assert_eq!(span.block(), 1);
        assert_eq!(span.offset(), 0);
        assert_eq!(arena.slice(span).unwrap(), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn reset_preserves_blocks_and_rewinds() {
        let mut arena = BlockArena::new(small(32)).unwrap();
        for i in 0..20 {
            arena.push(i as f64).unwrap();
        }
        let before = arena.block_capacities();
        arena.reset();
        assert_eq!(arena.block_capacities(), before);
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.current_block(), 0);
        let span = arena.push(9.0).unwrap();
        assert_eq!((span.block(), span.offset()), (0, 0));
    }

    #[test]
    fn reset_reuses_idle_blocks_before_growing() {
        let mut arena = BlockArena::new(small(32)).unwrap();
        for _ in 0..12 {
            arena.push(0.0f64).unwrap();
        }
        assert_eq!(arena.block_count(), 2);
        arena.reset();
        for _ in 0..12 {
            arena.push(0.0f64).unwrap();
        }
        assert_eq!(arena.block_count(), 2);
    }

    #[test]
    fn forward_scan_skips_blocks_too_small() {
        let mut arena = BlockArena::new(small(32)).unwrap();
        arena.alloc_filled(4, 0.0f64).unwrap();
        arena.alloc_filled(8, 0.0f64).unwrap();
        arena.alloc_filled(16, 0.0f64).unwrap();
        arena.reset();
        arena.alloc_filled(4, 0.0f64).unwrap();
        // Block 1 holds 8: too small for 12, so block 2 (16) serves it.
        let span = arena.alloc_filled(12, 0.0f64).unwrap();
        assert_eq!(span.block(), 2);
        assert_eq!(arena.block_count(), 3);
    }

    #[test]
    fn reset_is_idempotent_and_safe_when_empty() {
        let mut arena = BlockArena::<f64>::new(ArenaConfig::new()).unwrap();
        arena.reset();
        arena.reset();
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.stats().resets, 2);
    }

    #[test]
    fn stale_span_is_detected() {
        let mut arena = BlockArena::new(ArenaConfig::new()).unwrap();
        let span = arena.push(1.0f64).unwrap();
        arena.reset();
        let err = arena.get(span).unwrap_err();
        assert_eq!(
            err,
            ArenaError::StaleHandle {
                handle_epoch: Epoch(0),
                current_epoch: Epoch(1),
            }
        );
    }

    #[test]
    fn span_from_other_arena_is_invalid() {
        let mut a = BlockArena::new(ArenaConfig::new()).unwrap();
        let b = BlockArena::<f64>::new(ArenaConfig::new()).unwrap();
        let span = a.alloc_filled(3, 0.0f64).unwrap();
        assert!(matches!(
            b.slice(span),
            Err(ArenaError::InvalidSpan { .. })
        ));
    }

    #[test]
    fn cap_is_enforced_as_out_of_memory() {
        let mut arena = BlockArena::new(small(32).with_max_bytes(64)).unwrap();
        arena.alloc_filled(4, 0.0f64).unwrap();
        // Doubling would want 8 elements (64 bytes); only 32 bytes remain,
        // so the new block is clamped to 4 elements.
        arena.alloc_filled(4, 0.0f64).unwrap();
        assert_eq!(arena.block_capacities(), vec![4, 4]);
        let err = arena.push(0.0f64).unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { capacity: 64, .. }));
    }

    #[test]
    fn release_drops_to_single_initial_block() {
        let mut arena = BlockArena::new(small(32)).unwrap();
        let span = arena.alloc_filled(100, 0.0f64).unwrap();
        arena.release().unwrap();
        assert_eq!(arena.block_capacities(), vec![4]);
        assert!(matches!(
            arena.slice(span),
            Err(ArenaError::StaleHandle { .. })
        ));
    }

    #[test]
    fn zero_len_alloc_is_valid() {
        let mut arena = BlockArena::new(ArenaConfig::new()).unwrap();
        let span = arena.alloc_filled(0, 0.0f64).unwrap();
        assert!(span.is_empty());
        assert!(arena.slice(span).unwrap().is_empty());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn iter_mut_visits_every_live_element() {
        let mut arena = BlockArena::new(small(16)).unwrap();
        for i in 0..7 {
            arena.push(i as f64).unwrap();
        }
        arena.iter_mut().for_each(|v| *v = 0.0);
        assert_eq!(arena.used(), 7);
        assert_eq!(arena.stats().used_bytes, 56);
    }

    #[test]
    fn memory_bytes_tracks_capacity() {
        let arena = BlockArena::<f64>::new(ArenaConfig::new()).unwrap();
        assert_eq!(arena.memory_bytes(), 64 * 1024);
        assert_eq!(arena.stats().capacity_bytes, 64 * 1024);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn block_count_logarithmic_in_monotone_growth(
                sizes in proptest::collection::vec(1usize..64, 1..200),
            ) {
                let mut arena = BlockArena::new(small(32)).unwrap();
                let mut total = 0usize;
                for &len in &sizes {
                    arena.alloc_filled(len, 0.0f64).unwrap();
                    total += len;
                }
                // Each new block at least doubles the previous one, so the
                // total capacity reaches `total` within ~log2 blocks, plus
                // one slack block per oversized request.
                let bound = (total as f64).log2().ceil() as usize + 2;
                prop_assert!(arena.block_count() <= bound + sizes.len().min(bound));
                prop_assert_eq!(arena.used(), total);
            }

            #[test]
            fn spans_never_overlap(
                sizes in proptest::collection::vec(0usize..40, 1..60),
            ) {
                let mut arena = BlockArena::new(small(64)).unwrap();
                let spans: Vec<Span> = sizes
                    .iter()
                    .map(|&len| arena.alloc_filled(len, 0.0f64).unwrap())
                    .collect();
                for (i, a) in spans.iter().enumerate() {
                    for b in &spans[i + 1..] {
                        if a.block() == b.block() && !a.is_empty() && !b.is_empty() {
                            let disjoint = a.offset() + a.len() <= b.offset()
                                || b.offset() + b.len() <= a.offset();
                            prop_assert!(disjoint);
                        }
                    }
                }
            }

            #[test]
            fn reset_never_changes_block_layout(
                sizes in proptest::collection::vec(1usize..50, 1..50),
                rounds in 1usize..4,
            ) {
                let mut arena = BlockArena::new(small(32)).unwrap();
                for &len in &sizes {
                    arena.alloc_filled(len, 0.0f64).unwrap();
                }
                let layout = arena.block_capacities();
                for _ in 0..rounds {
                    arena.reset();
                    prop_assert_eq!(arena.block_capacities(), layout.clone());
                    for &len in &sizes {
                        arena.alloc_filled(len, 0.0f64).unwrap();
                    }
                    prop_assert_eq!(arena.block_capacities(), layout.clone());
                }
            }
        }
    }
}
