//! Operator overloads for [`Var`].
//!
//! Operators cannot return `Result`, so allocation failure inside one
//! panics. Use the `try_*` methods on [`Var`] to observe it instead.

use std::ops::{Add, AddAssign, Mul};

use crate::error::fatal;
use crate::var::Var;

impl<'c> Add for Var<'c> {
    type Output = Var<'c>;

    fn add(self, rhs: Var<'c>) -> Var<'c> {
        self.try_add(rhs).unwrap_or_else(fatal)
    }
}

impl<'c> Add<f64> for Var<'c> {
    type Output = Var<'c>;

    fn add(self, rhs: f64) -> Var<'c> {
        self.try_add_const(rhs).unwrap_or_else(fatal)
    }
}

impl<'c> Add<Var<'c>> for f64 {
    type Output = Var<'c>;

    fn add(self, rhs: Var<'c>) -> Var<'c> {
        rhs.try_add_const(self).unwrap_or_else(fatal)
    }
}

impl<'c> Mul for Var<'c> {
    type Output = Var<'c>;

    fn mul(self, rhs: Var<'c>) -> Var<'c> {
        self.try_mul(rhs).unwrap_or_else(fatal)
    }
}

impl<'c> Mul<f64> for Var<'c> {
    type Output = Var<'c>;

    fn mul(self, rhs: f64) -> Var<'c> {
        self.try_mul_const(rhs).unwrap_or_else(fatal)
    }
}

impl<'c> Mul<Var<'c>> for f64 {
    type Output = Var<'c>;

    fn mul(self, rhs: Var<'c>) -> Var<'c> {
        rhs.try_mul_const(self).unwrap_or_else(fatal)
    }
}

// `a += b` rebinds `a` to a fresh node; the old node stays on the tape and
// still receives its adjoint.
impl<'c> AddAssign for Var<'c> {
    fn add_assign(&mut self, rhs: Var<'c>) {
        *self = *self + rhs;
    }
}

impl AddAssign<f64> for Var<'_> {
    fn add_assign(&mut self, rhs: f64) {
        *self = *self + rhs;
    }
}

/// Natural logarithm of a variable.
pub fn log(x: Var<'_>) -> Var<'_> {
    x.ln()
}

/// Sine of a variable.
pub fn sin(x: Var<'_>) -> Var<'_> {
    x.sin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::node::Op;

    #[test]
    fn constant_on_either_side() {
        let ctx = Context::new();
        let x = ctx.var(3.0);
        let a = x * 2.0;
        let b = 2.0 * x;
        let c = x + 1.0;
        let d = 1.0 + x;
        assert_eq!(a.value(), b.value());
        assert_eq!(c.value(), d.value());
        ctx.grad(a + b + c + d).unwrap();
        assert_eq!(x.adjoint(), 6.0);
    }

    #[test]
    fn constants_are_folded_into_the_node() {
        let ctx = Context::new();
        let x = ctx.var(3.0);
        let y = x * 4.0;
        let op = ctx.with_state(|s| s.nodes.get(y.node_ref().span).unwrap().op());
        assert_eq!(
            op,
            Op::MulConst {
                operand: x.node_ref(),
                factor: 4.0
            }
        );
        // Only the two nodes above exist: no leaf was made for the constant.
        assert_eq!(ctx.stats().nodes.used_bytes, 2 * std::mem::size_of::<crate::Node>());
    }

    #[test]
    fn add_assign_rebinds() {
        let ctx = Context::new();
        let x = ctx.var(1.0);
        let mut z = x;
        z += x;
        z += 2.0;
        assert_eq!(z.value(), 4.0);
        assert_ne!(z.node_ref(), x.node_ref());
        ctx.grad(z).unwrap();
        assert_eq!(x.adjoint(), 2.0);
    }

    #[test]
    fn sin_derivative_is_cos() {
        let ctx = Context::new();
        let x = ctx.var(0.7);
        let z = sin(x);
        ctx.grad(z).unwrap();
        assert!((x.adjoint() - 0.7f64.cos()).abs() < 1e-15);
    }

    #[test]
    fn log_of_zero_is_negative_infinity() {
        let ctx = Context::new();
        let x = ctx.var(0.0);
        let z = log(x);
        assert_eq!(z.value(), f64::NEG_INFINITY);
        ctx.grad(z).unwrap();
        assert_eq!(x.adjoint(), f64::INFINITY);
    }
}
