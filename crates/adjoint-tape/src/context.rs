//! The explicit recording context.
//!
//! [`Context`] replaces the global tape/arena pair of a classic operator
//! overloading AD tool. It owns the arenas and the [`Tape`] for one epoch
//! of gradient computation and is passed, by reference, to every handle.
//!
//! The lifecycle per computation is:
//! 1. `var()` / `matrix()`: create leaves
//! 2. operators on [`Var`] / [`MatVar`]: record nodes
//! 3. `grad()`: seed the output and sweep the tape backwards
//! 4. `clear_epoch()`: reset everything for the next computation

use std::cell::RefCell;
use std::fmt;

use adjoint_arena::{ArenaConfig, ArenaError, ArenaStats, BlockArena, Span};
use adjoint_core::{ContextId, Epoch};
use log::debug;
use nalgebra::DMatrix;

use crate::error::{fatal, TapeError};
use crate::matrix::MatVar;
use crate::node::{view, MatOp, MatrixRef, Node, NodeRef, Op};
use crate::tape::{Entry, Tape};
use crate::var::Var;

/// Counters describing the current epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TapeStats {
    /// The current epoch.
    pub epoch: Epoch,
    /// Entries recorded on the tape this epoch.
    pub tape_len: usize,
    /// Scalar node arena occupancy.
    pub nodes: ArenaStats,
    /// Matrix value arena occupancy (the adjoint arena mirrors it).
    pub matrix_values: ArenaStats,
}

pub(crate) struct State {
    pub(crate) nodes: BlockArena<Node>,
    pub(crate) matrix_ops: BlockArena<MatOp>,
    pub(crate) values: BlockArena<f64>,
    pub(crate) adjoints: BlockArena<f64>,
    pub(crate) tape: Tape,
}

/// Owner of the arenas and tape for one thread's gradient computations.
///
/// Handles borrow the context, and recording goes through a `RefCell`, so
/// the context is neither `Sync` nor shareable across threads. Callers
/// needing parallel gradients use one context per thread.
pub struct Context {
    id: ContextId,
    state: RefCell<State>,
}

impl Context {
    /// Create a context with the default [`ArenaConfig`].
    ///
    /// # Panics
    ///
    /// Panics if the initial blocks cannot be reserved.
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default()).unwrap_or_else(fatal)
    }

    /// Create a context whose arenas all use `config`.
    pub fn with_config(config: ArenaConfig) -> Result<Self, TapeError> {
        let state = State {
            nodes: BlockArena::new(config.clone())?,
            matrix_ops: BlockArena::new(config.clone())?,
            values: BlockArena::new(config.clone())?,
            adjoints: BlockArena::new(config)?,
            tape: Tape::new(),
        };
        Ok(Self {
            id: ContextId::next(),
            state: RefCell::new(state),
        })
    }

    /// Create a leaf variable.
    ///
    /// # Panics
    ///
    /// Panics if the node arena cannot grow.
    pub fn var(&self, value: f64) -> Var<'_> {
        self.try_var(value).unwrap_or_else(fatal)
    }

    /// Create a leaf variable, reporting allocation failure.
    pub fn try_var(&self, value: f64) -> Result<Var<'_>, TapeError> {
        let span = self.state.borrow_mut().nodes.push(Node::new(value, Op::Leaf))?;
        Ok(Var::new(self, self.node_ref(span)))
    }

    /// Create a matrix leaf holding a copy of `value`.
    ///
    /// # Panics
    ///
    /// Panics if the matrix arenas cannot grow.
    pub fn matrix(&self, value: &DMatrix<f64>) -> MatVar<'_> {
        self.try_matrix(value).unwrap_or_else(fatal)
    }

    /// Create a matrix leaf, reporting allocation failure.
    pub fn try_matrix(&self, value: &DMatrix<f64>) -> Result<MatVar<'_>, TapeError> {
        let matrix = self.alloc_matrix(value.nrows(), value.ncols())?;
        self.state
            .borrow_mut()
            .values
            .slice_mut(matrix.value)?
            .copy_from_slice(value.as_slice());
        Ok(MatVar::new(self, matrix))
    }

    /// Reserve zeroed value and adjoint storage for a `rows × cols` matrix.
    ///
    /// Extents that do not fit a `u32`, or whose product overflows, are
    /// reported as out of memory before anything is allocated.
    pub(crate) fn alloc_matrix(&self, rows: usize, cols: usize) -> Result<MatrixRef, TapeError> {
        let mut state = self.state.borrow_mut();
        let extents = (u32::try_from(rows), u32::try_from(cols), rows.checked_mul(cols));
        let (Ok(r), Ok(c), Some(len)) = extents else {
            return Err(ArenaError::OutOfMemory {
                requested: rows
                    .saturating_mul(cols)
                    .saturating_mul(std::mem::size_of::<f64>()),
                capacity: state.values.memory_bytes(),
            }
            .into());
        };
        let value = state.values.alloc_filled(len, 0.0)?;
        let adjoint = state.adjoints.alloc_filled(len, 0.0)?;
        Ok(MatrixRef {
            context: self.id,
            value,
            adjoint,
            rows: r,
            cols: c,
        })
    }

    fn node_ref(&self, span: Span) -> NodeRef {
        NodeRef {
            context: self.id,
            span,
        }
    }

    /// The arena span behind `node`, provided this context issued it.
    fn own(&self, node: NodeRef) -> Result<Span, TapeError> {
        if node.context == self.id {
            Ok(node.span)
        } else {
            Err(TapeError::ForeignHandle)
        }
    }

    fn own_matrix(&self, matrix: MatrixRef) -> Result<MatrixRef, TapeError> {
        if matrix.context == self.id {
            Ok(matrix)
        } else {
            Err(TapeError::ForeignHandle)
        }
    }

    /// Allocate a scalar node and append it to the tape.
    pub(crate) fn record(&self, value: f64, op: Op) -> Result<NodeRef, TapeError> {
        let mut state = self.state.borrow_mut();
        let node = self.node_ref(state.nodes.push(Node::new(value, op))?);
        state.tape.push(Entry::Scalar(node));
        Ok(node)
    }

    /// Allocate a matrix operation and append it to the tape.
    pub(crate) fn record_matrix(&self, op: MatOp) -> Result<(), TapeError> {
        let mut state = self.state.borrow_mut();
        let span = state.matrix_ops.push(op)?;
        state.tape.push(Entry::Matrix(span));
        Ok(())
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.state.borrow())
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    /// The identity stamped into every handle this context issues.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Forward value of a node.
    ///
    /// Fails with [`TapeError::ForeignHandle`] if another context issued
    /// `node`, and with a stale-handle error if it was recorded before the
    /// last [`clear_epoch`](Self::clear_epoch).
    pub fn value_of(&self, node: NodeRef) -> Result<f64, TapeError> {
        let span = self.own(node)?;
        Ok(self.state.borrow().nodes.get(span)?.value)
    }

    /// Accumulated adjoint of a node.
    pub fn adjoint_of(&self, node: NodeRef) -> Result<f64, TapeError> {
        let span = self.own(node)?;
        Ok(self.state.borrow().nodes.get(span)?.adjoint)
    }

    /// Overwrite the adjoint of a node.
    pub fn set_adjoint_of(&self, node: NodeRef, adjoint: f64) -> Result<(), TapeError> {
        let span = self.own(node)?;
        self.state.borrow_mut().nodes.get_mut(span)?.adjoint = adjoint;
        Ok(())
    }

    /// Add `delta` to the adjoint of a node.
    pub fn add_adjoint_of(&self, node: NodeRef, delta: f64) -> Result<(), TapeError> {
        let span = self.own(node)?;
        self.state.borrow_mut().nodes.get_mut(span)?.adjoint += delta;
        Ok(())
    }

    /// Copy of a recorded matrix's forward value.
    pub fn matrix_value_of(&self, matrix: MatrixRef) -> Result<DMatrix<f64>, TapeError> {
        let matrix = self.own_matrix(matrix)?;
        let state = self.state.borrow();
        Ok(view(&state.values, matrix.value, matrix.shape())?.into_owned())
    }

    /// Copy of a recorded matrix's accumulated adjoint.
    pub fn matrix_adjoint_of(&self, matrix: MatrixRef) -> Result<DMatrix<f64>, TapeError> {
        let matrix = self.own_matrix(matrix)?;
        let state = self.state.borrow();
        Ok(view(&state.adjoints, matrix.adjoint, matrix.shape())?.into_owned())
    }

    /// Compute the gradient of `output` with respect to every recorded node.
    ///
    /// Sets the output adjoint to 1, then invokes every reverse step on the
    /// tape exactly once, newest first. Afterwards `v.adjoint()` holds
    /// `∂output/∂v`. Adjoints accumulate: call
    /// [`zero_adjoints`](Self::zero_adjoints) before sweeping the same graph
    /// again.
    pub fn grad(&self, output: Var<'_>) -> Result<(), TapeError> {
        if !std::ptr::eq(output.context(), self) {
            return Err(TapeError::ForeignHandle);
        }
        self.grad_node(output.node_ref())
    }

    /// [`grad`](Self::grad) for a detached node handle.
    pub fn grad_node(&self, output: NodeRef) -> Result<(), TapeError> {
        let output = self.own(output)?;
        let mut guard = self.state.borrow_mut();
        let State {
            nodes,
            matrix_ops,
            values,
            adjoints,
            tape,
        } = &mut *guard;

        nodes.get_mut(output)?.adjoint = 1.0;
        debug!("reverse sweep over {} tape entries", tape.len());

        for entry in tape.iter_reverse() {
            match *entry {
                Entry::Scalar(node) => {
                    let node = *nodes.get(node.span)?;
                    node.apply_reverse_step(nodes, adjoints)?;
                }
                Entry::Matrix(span) => {
                    let op = *matrix_ops.get(span)?;
                    op.apply_reverse_step(values, adjoints)?;
                }
            }
        }
        Ok(())
    }

    /// Reset every adjoint recorded this epoch to zero, keeping values.
    pub fn zero_adjoints(&self) {
        let mut state = self.state.borrow_mut();
        state.nodes.iter_mut().for_each(|n| n.adjoint = 0.0);
        state.adjoints.iter_mut().for_each(|g| *g = 0.0);
    }

    /// Empty the tape and reset every arena for the next computation.
    ///
    /// Memory is kept for reuse. Taking `&mut self` means no [`Var`] can
    /// survive the call; detached [`NodeRef`]s become stale. Idempotent and
    /// safe before anything was recorded.
    pub fn clear_epoch(&mut self) {
        let state = self.state.get_mut();
        let recorded = state.tape.len();
        state.tape.clear();
        state.nodes.reset();
        state.matrix_ops.reset();
        state.values.reset();
        state.adjoints.reset();
        debug!(
            "cleared epoch: {recorded} entries dropped, now epoch {}",
            state.nodes.epoch()
        );
    }

    /// Full teardown: clear the epoch and return every block beyond the
    /// initial ones to the system.
    pub fn release(&mut self) -> Result<(), TapeError> {
        let state = self.state.get_mut();
        state.tape.clear();
        state.nodes.release()?;
        state.matrix_ops.release()?;
        state.values.release()?;
        state.adjoints.release()?;
        Ok(())
    }

    /// The current epoch.
    pub fn epoch(&self) -> Epoch {
        self.state.borrow().nodes.epoch()
    }

    /// Number of entries on the tape.
    pub fn tape_len(&self) -> usize {
        self.state.borrow().tape.len()
    }

    /// Occupancy counters for the current epoch.
    pub fn stats(&self) -> TapeStats {
        let state = self.state.borrow();
        TapeStats {
            epoch: state.nodes.epoch(),
            tape_len: state.tape.len(),
            nodes: state.nodes.stats(),
            matrix_values: state.values.stats(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Context")
                .field("id", &self.id)
                .field("epoch", &state.nodes.epoch())
                .field("tape_len", &state.tape.len())
                .field("node_blocks", &state.nodes.block_count())
                .finish(),
            Err(_) => f.debug_struct("Context").finish_non_exhaustive(),
        }
    }
}
