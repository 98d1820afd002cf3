//! Matrix-valued variables on the dynamic tape.
//!
//! A [`MatVar`] records its value and adjoint as column-major spans in the
//! context's word arenas. Products go on the tape as [`MatOp`]s; [`sum`]
//! reduces a matrix to a scalar [`Var`] so the ordinary reverse sweep can
//! start from it.

use std::fmt;
use std::ops::Mul;

use adjoint_core::{Shape, ShapeError};
use nalgebra::DMatrix;

use crate::context::Context;
use crate::error::{fatal, TapeError};
use crate::node::{view, MatOp, MatrixRef, Op};
use crate::var::Var;

/// A matrix recorded on a [`Context`].
#[derive(Clone, Copy)]
pub struct MatVar<'c> {
    ctx: &'c Context,
    matrix: MatrixRef,
}

impl<'c> MatVar<'c> {
    pub(crate) fn new(ctx: &'c Context, matrix: MatrixRef) -> Self {
        Self { ctx, matrix }
    }

    /// Shape of the matrix.
    pub fn shape(&self) -> Shape {
        self.matrix.shape()
    }

    /// Detached handle to the recorded storage.
    pub fn matrix_ref(&self) -> MatrixRef {
        self.matrix
    }

    /// Copy of the forward value.
    pub fn try_value(&self) -> Result<DMatrix<f64>, TapeError> {
        self.ctx.matrix_value_of(self.matrix)
    }

    /// Copy of the accumulated adjoint.
    pub fn try_adjoint(&self) -> Result<DMatrix<f64>, TapeError> {
        self.ctx.matrix_adjoint_of(self.matrix)
    }

    /// Copy of the forward value.
    pub fn value(&self) -> DMatrix<f64> {
        self.try_value().unwrap_or_else(fatal)
    }

    /// Copy of the accumulated adjoint.
    pub fn adjoint(&self) -> DMatrix<f64> {
        self.try_adjoint().unwrap_or_else(fatal)
    }

    /// Matrix product `self × rhs`.
    ///
    /// Fails with [`TapeError::Shape`] when `self.cols != rhs.rows`.
    pub fn try_matmul(&self, rhs: MatVar<'c>) -> Result<MatVar<'c>, TapeError> {
        if !std::ptr::eq(self.ctx, rhs.ctx) {
            return Err(TapeError::ForeignHandle);
        }
        let out_shape = self.shape().matmul(rhs.shape()).ok_or(ShapeError {
            op: "matmul",
            left: self.shape(),
            right: rhs.shape(),
        })?;

        let product = self.ctx.with_state(|s| -> Result<DMatrix<f64>, TapeError> {
            let l = view(&s.values, self.matrix.value, self.shape())?;
            let r = view(&s.values, rhs.matrix.value, rhs.shape())?;
            Ok(l * r)
        })?;

        let out = self.ctx.alloc_matrix(out_shape.rows, out_shape.cols)?;
        self.ctx.with_state_mut(|s| -> Result<(), TapeError> {
            s.values
                .slice_mut(out.value)?
                .copy_from_slice(product.as_slice());
            Ok(())
        })?;
        self.ctx.record_matrix(MatOp::MatMul {
            lhs: self.matrix,
            rhs: rhs.matrix,
            out,
        })?;
        Ok(MatVar::new(self.ctx, out))
    }

    /// Sum of every element as a scalar variable.
    pub fn try_sum(&self) -> Result<Var<'c>, TapeError> {
        let total = self
            .ctx
            .with_state(|s| -> Result<f64, TapeError> {
                Ok(s.values.slice(self.matrix.value)?.iter().sum())
            })?;
        let node = self.ctx.record(
            total,
            Op::Sum {
                operand: self.matrix,
            },
        )?;
        Ok(Var::new(self.ctx, node))
    }
}

impl<'c> Mul for MatVar<'c> {
    type Output = MatVar<'c>;

    fn mul(self, rhs: MatVar<'c>) -> MatVar<'c> {
        self.try_matmul(rhs).unwrap_or_else(fatal)
    }
}

/// Sum of every element of `m`.
pub fn sum(m: MatVar<'_>) -> Var<'_> {
    m.try_sum().unwrap_or_else(fatal)
}

impl fmt::Debug for MatVar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatVar")
            .field("shape", &self.shape())
            .field("epoch", &self.matrix.epoch())
            .finish()
    }
}
