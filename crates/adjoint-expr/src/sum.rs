//! Full reductions.

use std::slice;

use adjoint_core::Shape;
use nalgebra::{DMatrix, DMatrixView};

use crate::bind::{Binder, SizeRequirement};
use crate::buffers::Buffers;
use crate::error::ExprError;
use crate::expr::{Expr, Seed, ValueWindow};

/// Sum of every element of the child.
///
/// The scalar value and adjoint live in the node, not in the buffers, so a
/// `Sum` needs exactly what its child needs.
#[derive(Debug)]
pub struct Sum<C> {
    child: C,
    value: f64,
    adjoint: f64,
}

impl<C: Expr> Sum<C> {
    /// Reduce `child`.
    pub fn new(child: C) -> Self {
        Self {
            child,
            value: 0.0,
            adjoint: 0.0,
        }
    }

    /// The reduced subexpression.
    pub fn child(&self) -> &C {
        &self.child
    }

    /// Value from the last forward pass.
    pub fn scalar(&self) -> f64 {
        self.value
    }

    /// Adjoint accumulated by backward passes.
    pub fn adjoint(&self) -> f64 {
        self.adjoint
    }
}

impl<C: Expr> Expr for Sum<C> {
    fn shape(&self) -> Shape {
        Shape::SCALAR
    }

    fn size_requirement(&self) -> SizeRequirement {
        self.child.size_requirement()
    }

    fn bind(&mut self, binder: &mut Binder) {
        self.child.bind(binder);
    }

    fn forward_evaluate(&mut self, buffers: &mut Buffers) -> Result<(), ExprError> {
        self.child.forward_evaluate(buffers)?;
        self.value = self.child.value(ValueWindow::full(buffers))?.sum();
        Ok(())
    }

    fn backward_evaluate(
        &mut self,
        seed: Seed<'_>,
        buffers: &mut Buffers,
    ) -> Result<(), ExprError> {
        let s = seed.as_scalar()?;
        self.adjoint += s;
        self.child.backward_evaluate(Seed::Broadcast(s), buffers)
    }

    fn value<'w>(&'w self, _window: ValueWindow<'w>) -> Result<DMatrixView<'w, f64>, ExprError> {
        Ok(DMatrixView::from_slice(slice::from_ref(&self.value), 1, 1))
    }

    fn collect_leaf_adjoints(
        &self,
        buffers: &Buffers,
        out: &mut Vec<DMatrix<f64>>,
    ) -> Result<(), ExprError> {
        self.child.collect_leaf_adjoints(buffers, out)
    }

    fn zero_local_adjoints(&mut self) {
        self.adjoint = 0.0;
        self.child.zero_local_adjoints();
    }
}
