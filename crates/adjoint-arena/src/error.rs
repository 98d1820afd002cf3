//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use adjoint_core::Epoch;

use crate::handle::Span;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A block could not be grown: either the system allocator refused the
    /// reservation or the configured byte cap would be exceeded.
    ///
    /// Fatal for the computation that triggered it; never retried.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Total capacity held by the arena when the request failed.
        capacity: usize,
    },
    /// A [`Span`] from an epoch that has since been reset.
    StaleHandle {
        /// The epoch encoded in the handle.
        handle_epoch: Epoch,
        /// The arena's current epoch.
        current_epoch: Epoch,
    },
    /// A [`Span`] that does not address live data in this arena.
    InvalidSpan {
        /// The offending span.
        span: Span,
    },
    /// Configuration rejected at construction.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "arena out of memory: requested {requested} bytes, capacity {capacity} bytes"
                )
            }
            Self::StaleHandle {
                handle_epoch,
                current_epoch,
            } => {
                write!(
                    f,
                    "stale handle: epoch {handle_epoch}, current epoch {current_epoch}"
                )
            }
            Self::InvalidSpan { span } => write!(f, "invalid span: {span}"),
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}
