//! Matrix product nodes.

use adjoint_core::{Shape, ShapeError};
use nalgebra::{DMatrix, DMatrixView, DMatrixViewMut};

use crate::bind::{Binder, Claim, NodeKind, SizeRequirement};
use crate::buffers::{resolve_mut, Buffers};
use crate::error::ExprError;
use crate::expr::{Expr, Seed, ValueWindow};

/// `lhs × rhs`, with its value and adjoint in the shared buffers.
#[derive(Debug)]
pub struct MatMul<L, R> {
    lhs: L,
    rhs: R,
    shape: Shape,
    claim: Option<Claim>,
}

impl<L: Expr, R: Expr> MatMul<L, R> {
    /// Compose a product, checking inner dimensions.
    pub fn try_new(lhs: L, rhs: R) -> Result<Self, ExprError> {
        let shape = lhs.shape().matmul(rhs.shape()).ok_or(ShapeError {
            op: "matmul",
            left: lhs.shape(),
            right: rhs.shape(),
        })?;
        Ok(Self {
            lhs,
            rhs,
            shape,
            claim: None,
        })
    }

    /// Left operand.
    pub fn lhs(&self) -> &L {
        &self.lhs
    }

    /// Right operand.
    pub fn rhs(&self) -> &R {
        &self.rhs
    }

    /// The slots claimed by the last bind, if any.
    pub fn claim(&self) -> Option<Claim> {
        self.claim
    }

    fn bound(&self) -> Result<Claim, ExprError> {
        self.claim.ok_or(ExprError::Unbound { node: "matmul" })
    }
}

impl<L: Expr, R: Expr> Expr for MatMul<L, R> {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn size_requirement(&self) -> SizeRequirement {
        let own = self.shape.len();
        SizeRequirement::new(own, own) + self.lhs.size_requirement() + self.rhs.size_requirement()
    }

    fn bind(&mut self, binder: &mut Binder) {
        let own = self.shape.len();
        self.claim = Some(binder.claim(NodeKind::MatMul, own, own));
        self.lhs.bind(binder);
        self.rhs.bind(binder);
    }

    fn forward_evaluate(&mut self, buffers: &mut Buffers) -> Result<(), ExprError> {
        self.lhs.forward_evaluate(buffers)?;
        self.rhs.forward_evaluate(buffers)?;

        let claim = self.bound()?;
        let (values, _) = buffers.split_mut();
        let end = claim.value.end();
        if end > values.len() {
            return Err(ExprError::SlotOutOfBounds {
                slot: claim.value,
                len: values.len(),
            });
        }
        // Own slot in the head, every operand value in the tail.
        let (head, tail) = values.split_at_mut(end);
        let window = ValueWindow::new(tail, end);
        let l = self.lhs.value(window)?;
        let r = self.rhs.value(window)?;
        let mut out = DMatrixViewMut::from_slice(
            &mut head[claim.value.offset..],
            self.shape.rows,
            self.shape.cols,
        );
        out.gemm(1.0, &l, &r, 0.0);
        Ok(())
    }

    fn backward_evaluate(
        &mut self,
        seed: Seed<'_>,
        buffers: &mut Buffers,
    ) -> Result<(), ExprError> {
        let claim = self.bound()?;
        let (lhs_seed, rhs_seed) = {
            let (values, adjoints) = buffers.split_mut();
            let own = resolve_mut(adjoints, claim.adjoint)?;
            seed.accumulate_into(own, self.shape)?;
            let adj = DMatrixView::from_slice(own, self.shape.rows, self.shape.cols);
            let window = ValueWindow::new(values, 0);
            let l = self.lhs.value(window)?;
            let r = self.rhs.value(window)?;
            (&adj * r.transpose(), l.transpose() * &adj)
        };
        self.lhs
            .backward_evaluate(Seed::Matrix(&lhs_seed), buffers)?;
        self.rhs
            .backward_evaluate(Seed::Matrix(&rhs_seed), buffers)
    }

    fn value<'w>(&'w self, window: ValueWindow<'w>) -> Result<DMatrixView<'w, f64>, ExprError> {
        let claim = self.bound()?;
        Ok(DMatrixView::from_slice(
            window.slot(claim.value)?,
            self.shape.rows,
            self.shape.cols,
        ))
    }

    fn collect_leaf_adjoints(
        &self,
        buffers: &Buffers,
        out: &mut Vec<DMatrix<f64>>,
    ) -> Result<(), ExprError> {
        self.lhs.collect_leaf_adjoints(buffers, out)?;
        self.rhs.collect_leaf_adjoints(buffers, out)
    }

    fn zero_local_adjoints(&mut self) {
        self.lhs.zero_local_adjoints();
        self.rhs.zero_local_adjoints();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::Leaf;

    #[test]
    fn inner_dimension_checked() {
        let a = DMatrix::zeros(2, 3);
        let b = DMatrix::zeros(2, 3);
        let err = MatMul::try_new(Leaf::new(&a), Leaf::new(&b)).unwrap_err();
        assert_eq!(
            err,
            ExprError::Shape(ShapeError {
                op: "matmul",
                left: Shape::new(2, 3),
                right: Shape::new(2, 3),
            })
        );
    }

    #[test]
    fn requirement_counts_own_slot_and_operands() {
        let a = DMatrix::zeros(2, 3);
        let b = DMatrix::zeros(3, 4);
        let m = MatMul::try_new(Leaf::new(&a), Leaf::new(&b)).unwrap();
        assert_eq!(m.shape(), Shape::new(2, 4));
        assert_eq!(m.size_requirement(), SizeRequirement::new(8, 8 + 6 + 12));
    }

    #[test]
    fn forward_before_bind_fails() {
        let a = DMatrix::zeros(1, 1);
        let mut m = MatMul::try_new(Leaf::new(&a), Leaf::new(&a)).unwrap();
        let mut buffers = Buffers::new(m.size_requirement()).unwrap();
        assert_eq!(
            m.forward_evaluate(&mut buffers),
            Err(ExprError::Unbound { node: "matmul" })
        );
    }

    #[test]
    fn nested_product_forward() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = DMatrix::identity(2, 2);
        let c = DMatrix::from_row_slice(2, 1, &[1.0, -1.0]);
        let inner = MatMul::try_new(Leaf::new(&a), Leaf::new(&b)).unwrap();
        let mut outer = MatMul::try_new(inner, Leaf::new(&c)).unwrap();
        let mut binder = Binder::new();
        outer.bind(&mut binder);
        let mut buffers = Buffers::new(outer.size_requirement()).unwrap();
        outer.forward_evaluate(&mut buffers).unwrap();
        let v = outer.value(ValueWindow::full(&buffers)).unwrap();
        assert_eq!(v, DMatrix::from_row_slice(2, 1, &[-1.0, -1.0]));
    }
}
