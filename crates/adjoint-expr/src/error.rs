//! Expression graph error types.

use std::error::Error;
use std::fmt;

use adjoint_arena::ArenaError;
use adjoint_core::{Shape, ShapeError};

use crate::bind::Slot;

/// Errors from composing, binding or evaluating an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprError {
    /// Operand shapes are incompatible.
    Shape(ShapeError),
    /// A node that needs buffer storage was evaluated before `bind`.
    Unbound {
        /// Kind of the offending node.
        node: &'static str,
    },
    /// Slots claimed during `bind` do not tile the buffers.
    LayoutMismatch {
        /// `"value"` or `"adjoint"`.
        buffer: &'static str,
        /// What went wrong.
        detail: String,
    },
    /// A bound slot lies outside the buffer it is read from.
    SlotOutOfBounds {
        /// The offending slot.
        slot: Slot,
        /// Length of the buffer or window.
        len: usize,
    },
    /// The root must be 1×1 to seed a gradient.
    NotScalar {
        /// Shape of the root.
        shape: Shape,
    },
    /// The buffers could not be reserved.
    Arena(ArenaError),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(e) => write!(f, "{e}"),
            Self::Unbound { node } => write!(f, "{node} node evaluated before bind"),
            Self::LayoutMismatch { buffer, detail } => {
                write!(f, "{buffer} buffer layout mismatch: {detail}")
            }
            Self::SlotOutOfBounds { slot, len } => {
                write!(f, "slot {slot} outside buffer of length {len}")
            }
            Self::NotScalar { shape } => {
                write!(f, "gradient root must be 1x1, got {shape}")
            }
            Self::Arena(e) => write!(f, "buffer allocation failed: {e}"),
        }
    }
}

impl Error for ExprError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(e) => Some(e),
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for ExprError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}

impl From<ArenaError> for ExprError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
