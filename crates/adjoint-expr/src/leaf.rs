//! Input matrices.

use adjoint_core::Shape;
use nalgebra::{DMatrix, DMatrixView};

use crate::bind::{Binder, Claim, NodeKind, SizeRequirement};
use crate::buffers::Buffers;
use crate::error::ExprError;
use crate::expr::{Expr, Seed, ValueWindow};

/// An input wrapping caller-owned matrix storage.
///
/// The value is read in place and never copied into the value buffer; only
/// the adjoint occupies buffer words.
#[derive(Debug)]
pub struct Leaf<'a> {
    value: &'a DMatrix<f64>,
    claim: Option<Claim>,
}

impl<'a> Leaf<'a> {
    /// Wrap `value`.
    pub fn new(value: &'a DMatrix<f64>) -> Self {
        Self { value, claim: None }
    }

    /// The slots claimed by the last bind, if any.
    pub fn claim(&self) -> Option<Claim> {
        self.claim
    }

    /// Copy of the accumulated adjoint.
    pub fn adjoint(&self, buffers: &Buffers) -> Result<DMatrix<f64>, ExprError> {
        let claim = self.claim.ok_or(ExprError::Unbound { node: "leaf" })?;
        let shape = self.shape();
        Ok(DMatrix::from_column_slice(
            shape.rows,
            shape.cols,
            buffers.adjoint_slot(claim.adjoint)?,
        ))
    }
}

impl Expr for Leaf<'_> {
    fn shape(&self) -> Shape {
        Shape::new(self.value.nrows(), self.value.ncols())
    }

    fn size_requirement(&self) -> SizeRequirement {
        SizeRequirement::new(0, self.value.len())
    }

    fn bind(&mut self, binder: &mut Binder) {
        self.claim = Some(binder.claim(NodeKind::Leaf, 0, self.value.len()));
    }

    fn forward_evaluate(&mut self, _buffers: &mut Buffers) -> Result<(), ExprError> {
        Ok(())
    }

    fn backward_evaluate(
        &mut self,
        seed: Seed<'_>,
        buffers: &mut Buffers,
    ) -> Result<(), ExprError> {
        let claim = self.claim.ok_or(ExprError::Unbound { node: "leaf" })?;
        let shape = self.shape();
        seed.accumulate_into(buffers.adjoint_slot_mut(claim.adjoint)?, shape)
    }

    fn value<'w>(&'w self, _window: ValueWindow<'w>) -> Result<DMatrixView<'w, f64>, ExprError> {
        let shape = self.shape();
        Ok(DMatrixView::from_slice(
            self.value.as_slice(),
            shape.rows,
            shape.cols,
        ))
    }

    fn collect_leaf_adjoints(
        &self,
        buffers: &Buffers,
        out: &mut Vec<DMatrix<f64>>,
    ) -> Result<(), ExprError> {
        out.push(self.adjoint(buffers)?);
        Ok(())
    }
}
