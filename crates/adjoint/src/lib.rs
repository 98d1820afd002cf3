//! Adjoint: arena-backed reverse-mode automatic differentiation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! adjoint sub-crates. Two strategies are offered side by side:
//!
//! - the **dynamic tape** records every scalar (or matrix) operation as it
//!   runs, so ordinary control flow just works;
//! - the **static expression graph** fixes a matrix expression's shape up
//!   front and evaluates it inside two preallocated buffers.
//!
//! # Quick start
//!
//! ```rust
//! use adjoint::prelude::*;
//!
//! let mut ctx = Context::new();
//! {
//!     let x = ctx.var(2.0);
//!     let y = ctx.var(4.0);
//!     let mut z = x * log(y * x);
//!     while z.value() < 10.0 {
//!         z += x * log(y) + log(x * y) * y;
//!     }
//!     ctx.grad(z).unwrap();
//!     assert!(x.adjoint() > 0.0 && y.adjoint() > 0.0);
//! }
//! // Reuse the same blocks for the next computation.
//! ctx.clear_epoch();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `adjoint-core` | `Epoch`, `Shape`, `ShapeError` |
//! | [`arena`] | `adjoint-arena` | Block arena, spans, config and stats |
//! | [`tape`] | `adjoint-tape` | `Context`, `Var`, `MatVar`, nodes and the reverse sweep |
//! | [`expr`] | `adjoint-expr` | `Expr` nodes, the size/bind protocol, `Expression` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Shared identifiers and shapes (`adjoint-core`).
pub use adjoint_core as types;

/// Epoch-scoped block allocation (`adjoint-arena`).
///
/// Most users only configure it through [`arena::ArenaConfig`].
pub use adjoint_arena as arena;

/// Dynamic tape (`adjoint-tape`).
///
/// [`tape::Context`] owns the arenas; [`tape::Var`] and [`tape::MatVar`] are
/// the handles operators work on.
pub use adjoint_tape as tape;

/// Static expression graph (`adjoint-expr`).
///
/// Compose [`expr::Leaf`]s with `*` and [`expr::sum`], then drive the result
/// with [`expr::Expression`].
pub use adjoint_expr as expr;

/// Common imports for typical usage.
///
/// ```rust
/// use adjoint::prelude::*;
/// ```
pub mod prelude {
    // Configuration
    pub use adjoint_arena::ArenaConfig;

    // Dynamic tape
    pub use adjoint_tape::{log, sin, sum, Context, MatVar, Var};

    // Static graph
    pub use adjoint_expr::{matmul, Expr, Expression, Leaf, Seed};

    // Errors
    pub use adjoint_arena::ArenaError;
    pub use adjoint_core::ShapeError;
    pub use adjoint_expr::ExprError;
    pub use adjoint_tape::TapeError;
}
