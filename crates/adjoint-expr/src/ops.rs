//! Composition operators.
//!
//! `a * b` builds a [`MatMul`] and panics on an inner-dimension mismatch,
//! the way `nalgebra` products do. Use [`matmul`] to get the error instead.

use std::ops::Mul;

use crate::error::ExprError;
use crate::expr::Expr;
use crate::leaf::Leaf;
use crate::matmul::MatMul;
use crate::sum::Sum;

/// `lhs × rhs`, checking inner dimensions.
pub fn matmul<L: Expr, R: Expr>(lhs: L, rhs: R) -> Result<MatMul<L, R>, ExprError> {
    MatMul::try_new(lhs, rhs)
}

/// Sum of every element of `child`.
pub fn sum<C: Expr>(child: C) -> Sum<C> {
    Sum::new(child)
}

fn compose<L: Expr, R: Expr>(lhs: L, rhs: R) -> MatMul<L, R> {
    MatMul::try_new(lhs, rhs).unwrap_or_else(|e| panic!("{e}"))
}

impl<'a, X: Expr> Mul<X> for Leaf<'a> {
    type Output = MatMul<Leaf<'a>, X>;

    fn mul(self, rhs: X) -> Self::Output {
        compose(self, rhs)
    }
}

impl<'r, 'a, X: Expr> Mul<X> for &'r mut Leaf<'a> {
    type Output = MatMul<&'r mut Leaf<'a>, X>;

    fn mul(self, rhs: X) -> Self::Output {
        compose(self, rhs)
    }
}

impl<L: Expr, R: Expr, X: Expr> Mul<X> for MatMul<L, R> {
    type Output = MatMul<MatMul<L, R>, X>;

    fn mul(self, rhs: X) -> Self::Output {
        compose(self, rhs)
    }
}

impl<C: Expr, X: Expr> Mul<X> for Sum<C> {
    type Output = MatMul<Sum<C>, X>;

    fn mul(self, rhs: X) -> Self::Output {
        compose(self, rhs)
    }
}
