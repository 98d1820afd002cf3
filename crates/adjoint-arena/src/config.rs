//! Arena configuration parameters.

use crate::error::ArenaError;

/// Configuration for a [`BlockArena`](crate::BlockArena).
///
/// Controls the size of the first block and an optional cap on total
/// capacity. Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size of the first block in bytes.
    ///
    /// Default: 65_536 (64KB). Later blocks grow geometrically from the
    /// last block's capacity, so this mostly matters for small graphs.
    pub initial_block_bytes: usize,

    /// Upper bound on the total capacity of all blocks, in bytes.
    ///
    /// `None` (the default) leaves growth bounded only by the system
    /// allocator. Must be at least `initial_block_bytes` when set.
    pub max_bytes: Option<usize>,
}

impl ArenaConfig {
    /// Default first-block size: 64KB.
    pub const DEFAULT_INITIAL_BLOCK_BYTES: usize = 1 << 16;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            initial_block_bytes: Self::DEFAULT_INITIAL_BLOCK_BYTES,
            max_bytes: None,
        }
    }

    /// Set the first-block size in bytes.
    pub fn with_initial_block_bytes(mut self, bytes: usize) -> Self {
        self.initial_block_bytes = bytes;
        self
    }

    /// Cap the total capacity in bytes.
    pub fn with_max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes = Some(bytes);
        self
    }

    /// Check the invariants documented on each field.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.initial_block_bytes == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "initial_block_bytes must be > 0".into(),
            });
        }
        if let Some(max) = self.max_bytes {
            if max < self.initial_block_bytes {
                return Err(ArenaError::InvalidConfig {
                    reason: format!(
                        "max_bytes ({max}) must be >= initial_block_bytes ({})",
                        self.initial_block_bytes
                    ),
                });
            }
        }
        Ok(())
    }

    /// First-block capacity in elements of `T` (at least one).
    pub fn block_len<T>(&self) -> usize {
        (self.initial_block_bytes / std::mem::size_of::<T>().max(1)).max(1)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_initial_block_is_64kb() {
        let config = ArenaConfig::new();
        assert_eq!(config.initial_block_bytes, 64 * 1024);
        assert_eq!(config.block_len::<f64>(), 8192);
    }

    #[test]
    fn block_len_never_zero() {
        let config = ArenaConfig::new().with_initial_block_bytes(3);
        assert_eq!(config.block_len::<f64>(), 1);
    }

    #[test]
    fn zero_initial_block_rejected() {
        let config = ArenaConfig::new().with_initial_block_bytes(0);
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn cap_below_initial_block_rejected() {
        let config = ArenaConfig::new()
            .with_initial_block_bytes(1024)
            .with_max_bytes(512);
        assert!(config.validate().is_err());
        assert!(config.with_max_bytes(1024).validate().is_ok());
    }
}
