//! Error types shared across the workspace.

use std::error::Error;
use std::fmt;

use crate::shape::Shape;

/// Operand shapes are incompatible for an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeError {
    /// Name of the operation that rejected the operands.
    pub op: &'static str,
    /// Shape of the left (or only) operand.
    pub left: Shape,
    /// Shape of the right operand, or the expected shape.
    pub right: Shape,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shape mismatch in {}: {} vs {}",
            self.op, self.left, self.right
        )
    }
}

impl Error for ShapeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_op_and_shapes() {
        let err = ShapeError {
            op: "matmul",
            left: Shape::new(2, 3),
            right: Shape::new(2, 2),
        };
        assert_eq!(err.to_string(), "shape mismatch in matmul: 2x3 vs 2x2");
    }
}
