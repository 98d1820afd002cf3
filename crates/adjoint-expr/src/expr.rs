//! The [`Expr`] node protocol.

use adjoint_core::{Shape, ShapeError};
use nalgebra::{DMatrix, DMatrixView};

use crate::bind::{Binder, SizeRequirement, Slot};
use crate::buffers::{resolve, Buffers};
use crate::error::ExprError;

/// Incoming adjoint for [`Expr::backward_evaluate`].
#[derive(Clone, Copy, Debug)]
pub enum Seed<'s> {
    /// The same scalar for every element.
    Broadcast(f64),
    /// One value per element; must match the receiving node's shape.
    Matrix(&'s DMatrix<f64>),
}

impl Seed<'_> {
    /// Add the seed element-wise into column-major `target` of `shape`.
    pub fn accumulate_into(&self, target: &mut [f64], shape: Shape) -> Result<(), ExprError> {
        match *self {
            Seed::Broadcast(s) => target.iter_mut().for_each(|g| *g += s),
            Seed::Matrix(m) => {
                let seed_shape = Shape::new(m.nrows(), m.ncols());
                if seed_shape != shape {
                    return Err(ShapeError {
                        op: "seed",
                        left: shape,
                        right: seed_shape,
                    }
                    .into());
                }
                for (g, s) in target.iter_mut().zip(m.as_slice()) {
                    *g += s;
                }
            }
        }
        Ok(())
    }

    /// The seed as a single number; matrix seeds must be 1×1.
    pub fn as_scalar(&self) -> Result<f64, ExprError> {
        match *self {
            Seed::Broadcast(s) => Ok(s),
            Seed::Matrix(m) if m.nrows() == 1 && m.ncols() == 1 => Ok(m[0]),
            Seed::Matrix(m) => Err(ShapeError {
                op: "scalar seed",
                left: Shape::SCALAR,
                right: Shape::new(m.nrows(), m.ncols()),
            }
            .into()),
        }
    }
}

/// Read-only window onto the tail of the value buffer.
///
/// During the forward pass a node writes its own slot while reading its
/// children's values. Children are bound after their parent, so the window
/// starting at the end of the parent's slot covers every descendant.
#[derive(Clone, Copy, Debug)]
pub struct ValueWindow<'w> {
    data: &'w [f64],
    base: usize,
}

impl<'w> ValueWindow<'w> {
    /// A window whose first word is buffer offset `base`.
    pub fn new(data: &'w [f64], base: usize) -> Self {
        Self { data, base }
    }

    /// The whole value buffer.
    pub fn full(buffers: &'w Buffers) -> Self {
        Self::new(buffers.values(), 0)
    }

    /// Resolve a slot given in whole-buffer offsets.
    pub fn slot(&self, slot: Slot) -> Result<&'w [f64], ExprError> {
        let out_of_bounds = ExprError::SlotOutOfBounds {
            slot,
            len: self.base + self.data.len(),
        };
        if slot.offset < self.base {
            return Err(out_of_bounds);
        }
        let local = Slot {
            offset: slot.offset - self.base,
            len: slot.len,
        };
        resolve(self.data, local).map_err(|_| out_of_bounds)
    }
}

/// A node of a statically composed matrix expression.
///
/// Evaluation follows a fixed protocol:
/// 1. [`size_requirement`](Expr::size_requirement) totals the words the
///    subtree needs in the value and adjoint buffers.
/// 2. [`bind`](Expr::bind) claims this node's slots, then binds children.
/// 3. [`forward_evaluate`](Expr::forward_evaluate) fills values bottom-up.
/// 4. [`backward_evaluate`](Expr::backward_evaluate) accumulates the seed
///    into this node's adjoint and pushes operand seeds top-down.
///
/// Shapes are fixed when the tree is composed.
pub trait Expr {
    /// Shape of this node's value.
    fn shape(&self) -> Shape;

    /// Buffer words required by this subtree.
    fn size_requirement(&self) -> SizeRequirement;

    /// Claim slots for this node and then for its children, in the same
    /// order [`size_requirement`](Expr::size_requirement) counted them.
    fn bind(&mut self, binder: &mut Binder);

    /// Compute values, children first.
    fn forward_evaluate(&mut self, buffers: &mut Buffers) -> Result<(), ExprError>;

    /// Accumulate `seed` and propagate operand seeds, parent first.
    fn backward_evaluate(&mut self, seed: Seed<'_>, buffers: &mut Buffers)
        -> Result<(), ExprError>;

    /// View of this node's current value.
    fn value<'w>(&'w self, window: ValueWindow<'w>) -> Result<DMatrixView<'w, f64>, ExprError>;

    /// Append the adjoint of every leaf in the subtree, in bind order.
    fn collect_leaf_adjoints(
        &self,
        buffers: &Buffers,
        out: &mut Vec<DMatrix<f64>>,
    ) -> Result<(), ExprError>;

    /// Reset adjoints kept inside nodes rather than in the buffer.
    fn zero_local_adjoints(&mut self) {}
}

impl<E: Expr + ?Sized> Expr for &mut E {
    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn size_requirement(&self) -> SizeRequirement {
        (**self).size_requirement()
    }

    fn bind(&mut self, binder: &mut Binder) {
        (**self).bind(binder)
    }

    fn forward_evaluate(&mut self, buffers: &mut Buffers) -> Result<(), ExprError> {
        (**self).forward_evaluate(buffers)
    }

    fn backward_evaluate(
        &mut self,
        seed: Seed<'_>,
        buffers: &mut Buffers,
    ) -> Result<(), ExprError> {
        (**self).backward_evaluate(seed, buffers)
    }

    fn value<'w>(&'w self, window: ValueWindow<'w>) -> Result<DMatrixView<'w, f64>, ExprError> {
        (**self).value(window)
    }

    fn collect_leaf_adjoints(
        &self,
        buffers: &Buffers,
        out: &mut Vec<DMatrix<f64>>,
    ) -> Result<(), ExprError> {
        (**self).collect_leaf_adjoints(buffers, out)
    }

    fn zero_local_adjoints(&mut self) {
        (**self).zero_local_adjoints()
    }
}
