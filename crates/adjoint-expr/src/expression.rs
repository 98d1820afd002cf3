//! Owning driver for a composed expression.

use adjoint_core::Shape;
use log::debug;
use nalgebra::DMatrix;

use crate::bind::{Binder, Layout, SizeRequirement};
use crate::buffers::Buffers;
use crate::error::ExprError;
use crate::expr::{Expr, Seed, ValueWindow};

/// An expression tree together with the buffers it is bound to.
///
/// Construction runs the whole memory protocol once: size the tree, reserve
/// both buffers, bind, and verify that the claimed slots tile the buffers.
/// After that, evaluation allocates nothing.
#[derive(Debug)]
pub struct Expression<E> {
    root: E,
    buffers: Buffers,
    layout: Layout,
}

impl<E: Expr> Expression<E> {
    /// Size, allocate, bind and verify.
    pub fn new(mut root: E) -> Result<Self, ExprError> {
        let required = root.size_requirement();
        let buffers = Buffers::new(required)?;
        let mut binder = Binder::new();
        root.bind(&mut binder);
        let layout = binder.finish();
        layout.verify(required)?;
        debug!(
            "bound {} expression: {} slots, {} value / {} adjoint words",
            root.shape(),
            layout.claims().len(),
            required.values,
            required.adjoints
        );
        Ok(Self {
            root,
            buffers,
            layout,
        })
    }

    /// Gradient of a scalar root: zero adjoints, run the forward pass, then
    /// seed the root with 1 and run the backward pass. Returns the value.
    pub fn autodiff(&mut self) -> Result<f64, ExprError> {
        let shape = self.root.shape();
        if shape != Shape::SCALAR {
            return Err(ExprError::NotScalar { shape });
        }
        self.zero_adjoints();
        self.forward()?;
        self.backward(Seed::Broadcast(1.0))?;
        Ok(self.root.value(ValueWindow::full(&self.buffers))?[0])
    }

    /// Forward pass only.
    pub fn forward(&mut self) -> Result<(), ExprError> {
        self.root.forward_evaluate(&mut self.buffers)
    }

    /// Backward pass only; adjoints accumulate onto whatever is there.
    pub fn backward(&mut self, seed: Seed<'_>) -> Result<(), ExprError> {
        self.root.backward_evaluate(seed, &mut self.buffers)
    }

    /// Reset the adjoint buffer and node-local adjoints.
    pub fn zero_adjoints(&mut self) {
        self.buffers.zero_adjoints();
        self.root.zero_local_adjoints();
    }

    /// Copy of the root's value from the last forward pass.
    pub fn value(&self) -> Result<DMatrix<f64>, ExprError> {
        Ok(self
            .root
            .value(ValueWindow::full(&self.buffers))?
            .into_owned())
    }

    /// Adjoint of every leaf, in bind order (left to right).
    pub fn leaf_gradients(&self) -> Result<Vec<DMatrix<f64>>, ExprError> {
        let mut out = Vec::new();
        self.root.collect_leaf_adjoints(&self.buffers, &mut out)?;
        Ok(out)
    }

    /// The expression tree.
    pub fn root(&self) -> &E {
        &self.root
    }

    /// The bound buffers.
    pub fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    /// Slots claimed at construction.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Words reserved in each buffer.
    pub fn size(&self) -> SizeRequirement {
        self.buffers.size()
    }

    /// Drop the tree, keeping the buffers so borrowed leaves can read their
    /// adjoints.
    pub fn into_buffers(self) -> Buffers {
        self.buffers
    }
}
