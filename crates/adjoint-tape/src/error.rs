//! Tape error types.

use std::error::Error;
use std::fmt;

use adjoint_arena::ArenaError;
use adjoint_core::ShapeError;

/// Errors from recording or sweeping the tape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TapeError {
    /// The node or matrix arena failed: out of memory, stale handle, or a
    /// handle that does not belong to this context's current epoch.
    Arena(ArenaError),
    /// Matrix operands have incompatible shapes.
    Shape(ShapeError),
    /// Operands were recorded on different contexts.
    ForeignHandle,
}

impl fmt::Display for TapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arena(e) => write!(f, "tape arena error: {e}"),
            Self::Shape(e) => write!(f, "{e}"),
            Self::ForeignHandle => write!(f, "handle belongs to a different context"),
        }
    }
}

impl Error for TapeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::Shape(e) => Some(e),
            Self::ForeignHandle => None,
        }
    }
}

impl From<ArenaError> for TapeError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

impl From<ShapeError> for TapeError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}

/// Abort on an error that cannot be reported through an operator.
///
/// Allocation failure is fatal at the call site; operators and accessors
/// have no `Result` to carry it.
pub(crate) fn fatal<T>(err: TapeError) -> T {
    panic!("{err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjoint_core::Epoch;

    #[test]
    fn arena_errors_chain_as_source() {
        let err = TapeError::from(ArenaError::StaleHandle {
            handle_epoch: Epoch(0),
            current_epoch: Epoch(2),
        });
        assert!(err.source().is_some());
        assert!(err.to_string().contains("stale handle"));
    }

    #[test]
    #[should_panic(expected = "different context")]
    fn fatal_panics_with_message() {
        let _: () = fatal(TapeError::ForeignHandle);
    }
}
