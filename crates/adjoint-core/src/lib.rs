//! Core types for the adjoint reverse-mode AD workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! identifiers and shape descriptors shared by the arena, the dynamic tape
//! and the static expression graph.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod shape;

pub use error::ShapeError;
pub use id::{ContextId, Epoch};
pub use shape::Shape;
