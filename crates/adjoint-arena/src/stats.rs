//! Arena occupancy counters.

/// Snapshot of an arena's block layout and occupancy.
///
/// Byte figures are `elements × size_of::<T>()` for the arena's element type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of blocks currently held (live or idle).
    pub block_count: usize,
    /// Total capacity across all blocks, in bytes.
    pub capacity_bytes: usize,
    /// Bytes handed out in the current epoch.
    pub used_bytes: usize,
    /// Number of resets performed since construction.
    pub resets: u64,
}
