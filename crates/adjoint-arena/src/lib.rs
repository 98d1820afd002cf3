//! Epoch-scoped block arena allocation for reverse-mode AD.
//!
//! Provides a bump allocator over geometrically growing blocks, with bulk
//! reset between gradient computations and epoch tracking so that handles
//! issued before a reset are detected instead of silently aliasing new data.
//!
//! # Architecture
//!
//! ```text
//! BlockArena<T> (one per element type)
//! ├── Block<T> × n (fixed-capacity, bump cursor, never reallocated)
//! │   capacities: initial, then max(2 × last, requested)
//! ├── current block index (rewound to 0 on reset)
//! └── Epoch (bumped on reset / release, stamped into every Span)
//! ```
//!
//! # Lifecycle
//!
//! - **Allocate:** `push` / `alloc_filled` bump the cursor of the current
//!   block, scanning forward or growing when it is full.
//! - **Reset:** rewinds every cursor to zero. Blocks are kept for the next
//!   epoch; nothing is freed individually and no destructors run, so element
//!   types are restricted to `Copy`.
//! - **Release:** full teardown back to a single initial block.
//!
//! All storage is typed `Vec<T>`: no `unsafe`, and every element is aligned
//! for its type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod block;
pub mod config;
pub mod error;
pub mod handle;
pub mod stats;

// Public re-exports for the primary API surface.
pub use arena::BlockArena;
pub use block::Block;
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use handle::Span;
pub use stats::ArenaStats;
