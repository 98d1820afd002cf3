//! Arena-backed dynamic tape for reverse-mode automatic differentiation.
//!
//! Records every arithmetic operation of a forward evaluation as a [`Node`]
//! in a [`BlockArena`](adjoint_arena::BlockArena), appends it to the
//! [`Tape`], and computes gradients of a scalar output with one reverse
//! sweep over the tape.
//!
//! # Architecture
//!
//! ```text
//! Context (explicit, one per thread)
//! ├── BlockArena<Node>    scalar nodes: value, adjoint, Op
//! ├── BlockArena<MatOp>   matrix-valued operations
//! ├── BlockArena<f64> × 2 matrix values / matrix adjoints
//! └── Tape                Entry refs in creation order
//! ```
//!
//! [`Var`] and [`MatVar`] are `Copy` handles borrowing the context. Every
//! node references only nodes created before it, so walking the tape
//! backwards is a valid reverse-topological order.
//!
//! # Epochs
//!
//! [`Context::clear_epoch`] resets the arenas for the next independent
//! computation. It takes `&mut self`, so handles cannot outlive it; detached
//! [`NodeRef`]s carry their epoch and fail with `StaleHandle` instead.
//!
//! ```
//! use adjoint_tape::{log, Context};
//!
//! let ctx = Context::new();
//! let x = ctx.var(2.0);
//! let y = ctx.var(4.0);
//! let z = log(x * y) + y;
//! ctx.grad(z).unwrap();
//! assert!((x.adjoint() - 0.5).abs() < 1e-12);
//! assert!((y.adjoint() - 1.25).abs() < 1e-12);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod matrix;
pub mod node;
mod ops;
pub mod tape;
pub mod var;

pub use context::{Context, TapeStats};
pub use error::TapeError;
pub use matrix::{sum, MatVar};
pub use node::{MatOp, MatrixRef, Node, NodeRef, Op};
pub use ops::{log, sin};
pub use tape::{Entry, Tape};
pub use var::Var;
