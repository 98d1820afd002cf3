//! Statically composed matrix expressions for reverse-mode AD.
//!
//! An expression is a tree of [`Leaf`], [`MatMul`] and [`Sum`] nodes whose
//! shapes are fixed when the tree is built. Instead of allocating per
//! operation, the whole tree shares one value buffer and one adjoint buffer,
//! sized and partitioned by a two-phase protocol:
//!
//! ```text
//! size_requirement()  bottom-up   → SizeRequirement { values, adjoints }
//! Buffers::new(req)               → two zeroed blocks
//! bind(&mut Binder)   self first  → each node claims its slots
//! forward_evaluate()  bottom-up   → MatMul writes into its value slot
//! backward_evaluate() top-down    → seeds accumulate into adjoint slots
//! ```
//!
//! [`Expression`] runs the protocol and owns the result:
//!
//! ```
//! use adjoint_expr::{sum, Expression, Leaf};
//! use nalgebra::DMatrix;
//!
//! let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
//! let b = DMatrix::from_row_slice(2, 2, &[5.0, 6.0, 7.0, 8.0]);
//! let mut f = Expression::new(sum(Leaf::new(&a) * Leaf::new(&b))).unwrap();
//! assert_eq!(f.autodiff().unwrap(), 134.0);
//! let grads = f.leaf_gradients().unwrap();
//! assert_eq!(grads[0], DMatrix::from_row_slice(2, 2, &[11.0, 15.0, 11.0, 15.0]));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bind;
pub mod buffers;
pub mod error;
pub mod expr;
pub mod expression;
pub mod leaf;
pub mod matmul;
mod ops;
pub mod sum;

pub use bind::{Binder, Claim, Layout, NodeKind, SizeRequirement, Slot};
pub use buffers::Buffers;
pub use error::ExprError;
pub use expr::{Expr, Seed, ValueWindow};
pub use expression::Expression;
pub use leaf::Leaf;
pub use matmul::MatMul;
pub use ops::{matmul, sum};
pub use sum::Sum;
