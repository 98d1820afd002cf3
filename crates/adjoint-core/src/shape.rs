//! Dense matrix shapes.

use std::fmt;

/// Row/column extent of a dense matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl Shape {
    /// A `1 × 1` shape, used for scalar reductions.
    pub const SCALAR: Shape = Shape { rows: 1, cols: 1 };

    /// Create a shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of elements (`rows × cols`).
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the shape has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Result shape of `self × rhs`, or `None` if the inner dimensions differ.
    pub fn matmul(&self, rhs: Shape) -> Option<Shape> {
        (self.cols == rhs.rows).then(|| Shape::new(self.rows, rhs.cols))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
