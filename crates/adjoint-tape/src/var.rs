//! User-facing scalar handle.

use std::fmt;

use crate::context::Context;
use crate::error::{fatal, TapeError};
use crate::node::{NodeRef, Op};

/// A scalar recorded on a [`Context`].
///
/// `Var` is a cheap `Copy` handle: copying it never copies the node, and
/// many handles may observe the same node. The borrow of the context keeps
/// every handle from outliving the epoch it was created in.
#[derive(Clone, Copy)]
pub struct Var<'c> {
    ctx: &'c Context,
    node: NodeRef,
}

impl<'c> Var<'c> {
    pub(crate) fn new(ctx: &'c Context, node: NodeRef) -> Self {
        Self { ctx, node }
    }

    /// Forward value.
    pub fn value(&self) -> f64 {
        self.ctx.value_of(self.node).unwrap_or_else(fatal)
    }

    /// Adjoint accumulated by the last reverse sweep(s).
    pub fn adjoint(&self) -> f64 {
        self.ctx.adjoint_of(self.node).unwrap_or_else(fatal)
    }

    /// Overwrite the adjoint.
    pub fn set_adjoint(&self, adjoint: f64) {
        self.ctx
            .set_adjoint_of(self.node, adjoint)
            .unwrap_or_else(fatal)
    }

    /// Add to the adjoint, e.g. to seed several outputs before a sweep.
    pub fn add_adjoint(&self, delta: f64) {
        self.ctx
            .add_adjoint_of(self.node, delta)
            .unwrap_or_else(fatal)
    }

    /// Detached handle to the underlying node.
    ///
    /// Unlike the `Var` itself, a `NodeRef` does not borrow the context; it
    /// is checked against the current epoch on every access.
    pub fn node_ref(&self) -> NodeRef {
        self.node
    }

    /// The context this variable was recorded on.
    pub fn context(&self) -> &'c Context {
        self.ctx
    }

    fn same_context(&self, other: &Var<'_>) -> Result<(), TapeError> {
        if std::ptr::eq(self.ctx, other.ctx) {
            Ok(())
        } else {
            Err(TapeError::ForeignHandle)
        }
    }

    fn unary(&self, value: f64, op: Op) -> Result<Var<'c>, TapeError> {
        let node = self.ctx.record(value, op)?;
        Ok(Var::new(self.ctx, node))
    }

    /// `self + rhs`, reporting allocation failure or mixed contexts.
    pub fn try_add(&self, rhs: Var<'c>) -> Result<Var<'c>, TapeError> {
        self.same_context(&rhs)?;
        let value = self.value() + rhs.value();
        self.unary(
            value,
            Op::Add {
                lhs: self.node,
                rhs: rhs.node,
            },
        )
    }

    /// `self * rhs`, reporting allocation failure or mixed contexts.
    pub fn try_mul(&self, rhs: Var<'c>) -> Result<Var<'c>, TapeError> {
        self.same_context(&rhs)?;
        let value = self.value() * rhs.value();
        self.unary(
            value,
            Op::Mul {
                lhs: self.node,
                rhs: rhs.node,
            },
        )
    }

    /// `self + c`.
    pub fn try_add_const(&self, c: f64) -> Result<Var<'c>, TapeError> {
        self.unary(self.value() + c, Op::AddConst { operand: self.node })
    }

    /// `self * c`.
    pub fn try_mul_const(&self, c: f64) -> Result<Var<'c>, TapeError> {
        self.unary(
            self.value() * c,
            Op::MulConst {
                operand: self.node,
                factor: c,
            },
        )
    }

    /// Natural logarithm, reporting allocation failure.
    ///
    /// Non-positive inputs follow IEEE semantics: `ln(0) = -inf`, negative
    /// inputs give NaN.
    pub fn try_ln(&self) -> Result<Var<'c>, TapeError> {
        self.unary(self.value().ln(), Op::Log { operand: self.node })
    }

    /// Sine, reporting allocation failure.
    pub fn try_sin(&self) -> Result<Var<'c>, TapeError> {
        self.unary(self.value().sin(), Op::Sin { operand: self.node })
    }

    /// Natural logarithm.
    pub fn ln(self) -> Var<'c> {
        self.try_ln().unwrap_or_else(fatal)
    }

    /// Sine.
    pub fn sin(self) -> Var<'c> {
        self.try_sin().unwrap_or_else(fatal)
    }
}

impl fmt::Debug for Var<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Var");
        match (self.ctx.value_of(self.node), self.ctx.adjoint_of(self.node)) {
            (Ok(value), Ok(adjoint)) => s.field("value", &value).field("adjoint", &adjoint),
            _ => s.field("node", &self.node),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_share_the_node() {
        let ctx = Context::new();
        let x = ctx.var(2.0);
        let y = x;
        y.set_adjoint(3.0);
        x.add_adjoint(0.5);
        assert_eq!(y.adjoint(), 3.5);
        assert_eq!(x.node_ref(), y.node_ref());
    }

    #[test]
    fn mixed_contexts_are_rejected() {
        let a = Context::new();
        let b = Context::new();
        let x = a.var(1.0);
        let y = b.var(2.0);
        assert_eq!(x.try_add(y).unwrap_err(), TapeError::ForeignHandle);
        assert_eq!(x.try_mul(y).unwrap_err(), TapeError::ForeignHandle);
    }

    #[test]
    fn forward_values() {
        let ctx = Context::new();
        let x = ctx.var(2.0);
        assert_eq!(x.try_add_const(1.5).unwrap().value(), 3.5);
        assert_eq!(x.try_mul_const(-2.0).unwrap().value(), -4.0);
        assert_eq!(x.ln().value(), 2f64.ln());
        assert_eq!(x.sin().value(), 2f64.sin());
    }

    #[test]
    fn log_of_negative_is_nan() {
        let ctx = Context::new();
        let x = ctx.var(-1.0);
        let z = x.ln();
        assert!(z.value().is_nan());
        ctx.grad(z).unwrap();
        assert_eq!(x.adjoint(), -1.0);
    }

    #[test]
    fn debug_prints_value() {
        let ctx = Context::new();
        let x = ctx.var(1.5);
        assert!(format!("{x:?}").contains("1.5"));
    }
}
