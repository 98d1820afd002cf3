//! Recorded operations and their reverse steps.
//!
//! A [`Node`] is one scalar primitive: its forward value, its adjoint
//! accumulator and an [`Op`] tag naming the operands. A [`MatOp`] is the
//! matrix-valued counterpart, whose values and adjoints live in the word
//! arenas rather than in the node itself.
//!
//! Both are `Copy` and own nothing: an arena reset reclaims them in bulk.

use adjoint_arena::{ArenaError, BlockArena, Span};
use adjoint_core::{ContextId, Epoch, Shape};
use nalgebra::DMatrixView;

/// Handle to a scalar node in the context's node arena.
///
/// Remembers both the issuing context and the epoch, so resolving it
/// anywhere else fails instead of reading an unrelated node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub(crate) context: ContextId,
    pub(crate) span: Span,
}

impl NodeRef {
    /// The context this node was recorded on.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// The epoch this node was recorded in.
    pub fn epoch(&self) -> Epoch {
        self.span.epoch()
    }
}

/// Location and shape of a matrix recorded on the tape.
///
/// Values and adjoints are separate spans of equal length in the context's
/// value and adjoint arenas, stored column-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatrixRef {
    pub(crate) context: ContextId,
    pub(crate) value: Span,
    pub(crate) adjoint: Span,
    pub(crate) rows: u32,
    pub(crate) cols: u32,
}

impl MatrixRef {
    /// Shape of the matrix.
    pub fn shape(&self) -> Shape {
        Shape::new(self.rows as usize, self.cols as usize)
    }

    /// The context this matrix was recorded on.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// The epoch this matrix was recorded in.
    pub fn epoch(&self) -> Epoch {
        self.value.epoch()
    }
}

/// Operator tag of a scalar node.
///
/// Mixed variable/constant forms are separate kinds: the constant is folded
/// in and never receives an adjoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    /// Independent input; nothing to propagate.
    Leaf,
    /// `lhs + rhs`.
    Add {
        /// Left operand.
        lhs: NodeRef,
        /// Right operand.
        rhs: NodeRef,
    },
    /// `operand + c` or `c + operand`.
    AddConst {
        /// The variable operand.
        operand: NodeRef,
    },
    /// `lhs * rhs`.
    Mul {
        /// Left operand.
        lhs: NodeRef,
        /// Right operand.
        rhs: NodeRef,
    },
    /// `operand * factor` or `factor * operand`.
    MulConst {
        /// The variable operand.
        operand: NodeRef,
        /// The folded constant.
        factor: f64,
    },
    /// Natural logarithm.
    Log {
        /// The operand.
        operand: NodeRef,
    },
    /// Sine.
    Sin {
        /// The operand.
        operand: NodeRef,
    },
    /// Sum of every element of a matrix.
    Sum {
        /// The reduced matrix.
        operand: MatrixRef,
    },
}

/// One recorded scalar primitive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub(crate) value: f64,
    pub(crate) adjoint: f64,
    pub(crate) op: Op,
}

impl Node {
    pub(crate) fn new(value: f64, op: Op) -> Self {
        Self {
            value,
            adjoint: 0.0,
            op,
        }
    }

    /// Forward value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Accumulated adjoint.
    pub fn adjoint(&self) -> f64 {
        self.adjoint
    }

    /// Operator tag.
    pub fn op(&self) -> Op {
        self.op
    }

    /// Propagate this node's adjoint into its operands.
    ///
    /// Operand values are read as they are now; a node is only ever
    /// recorded after its operands, so they are final by the time the
    /// reverse sweep reaches it. Non-finite values are not special-cased.
    pub(crate) fn apply_reverse_step(
        &self,
        nodes: &mut BlockArena<Node>,
        adjoints: &mut BlockArena<f64>,
    ) -> Result<(), ArenaError> {
        let a = self.adjoint;
        match self.op {
            Op::Leaf => {}
            Op::Add { lhs, rhs } => {
                accumulate(nodes, lhs, a)?;
                accumulate(nodes, rhs, a)?;
            }
            Op::AddConst { operand } => accumulate(nodes, operand, a)?,
            Op::Mul { lhs, rhs } => {
                let l = nodes.get(lhs.span)?.value;
                let r = nodes.get(rhs.span)?.value;
                accumulate(nodes, lhs, r * a)?;
                accumulate(nodes, rhs, l * a)?;
            }
            Op::MulConst { operand, factor } => accumulate(nodes, operand, factor * a)?,
            Op::Log { operand } => {
                let v = nodes.get(operand.span)?.value;
                accumulate(nodes, operand, a / v)?;
            }
            Op::Sin { operand } => {
                let v = nodes.get(operand.span)?.value;
                accumulate(nodes, operand, v.cos() * a)?;
            }
            Op::Sum { operand } => {
                for g in adjoints.slice_mut(operand.adjoint)? {
                    *g += a;
                }
            }
        }
        Ok(())
    }
}

fn accumulate(nodes: &mut BlockArena<Node>, target: NodeRef, delta: f64) -> Result<(), ArenaError> {
    nodes.get_mut(target.span)?.adjoint += delta;
    Ok(())
}

/// Matrix-valued recorded operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatOp {
    /// `out = lhs × rhs`.
    MatMul {
        /// Left factor.
        lhs: MatrixRef,
        /// Right factor.
        rhs: MatrixRef,
        /// The product.
        out: MatrixRef,
    },
}

impl MatOp {
    /// Propagate the output adjoint into the operands:
    /// `adj(L) += adj(out)·Rᵗ`, `adj(R) += Lᵗ·adj(out)`.
    pub(crate) fn apply_reverse_step(
        &self,
        values: &BlockArena<f64>,
        adjoints: &mut BlockArena<f64>,
    ) -> Result<(), ArenaError> {
        match *self {
            MatOp::MatMul { lhs, rhs, out } => {
                let (lhs_seed, rhs_seed) = {
                    let out_adj = view(adjoints, out.adjoint, out.shape())?;
                    let l = view(values, lhs.value, lhs.shape())?;
                    let r = view(values, rhs.value, rhs.shape())?;
                    (&out_adj * r.transpose(), l.transpose() * &out_adj)
                };
                accumulate_matrix(adjoints, lhs.adjoint, lhs_seed.as_slice())?;
                accumulate_matrix(adjoints, rhs.adjoint, rhs_seed.as_slice())?;
            }
        }
        Ok(())
    }
}

/// Non-owning column-major view over arena-resident memory.
pub(crate) fn view(
    arena: &BlockArena<f64>,
    span: Span,
    shape: Shape,
) -> Result<DMatrixView<'_, f64>, ArenaError> {
    let data = arena.slice(span)?;
    Ok(DMatrixView::from_slice(data, shape.rows, shape.cols))
}

fn accumulate_matrix(
    adjoints: &mut BlockArena<f64>,
    target: Span,
    seed: &[f64],
) -> Result<(), ArenaError> {
    for (g, s) in adjoints.slice_mut(target)?.iter_mut().zip(seed) {
        *g += s;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjoint_arena::ArenaConfig;

    fn arenas() -> (BlockArena<Node>, BlockArena<f64>) {
        (
            BlockArena::new(ArenaConfig::new()).unwrap(),
            BlockArena::new(ArenaConfig::new()).unwrap(),
        )
    }

    fn leaf(nodes: &mut BlockArena<Node>, v: f64) -> NodeRef {
        NodeRef {
            context: ContextId::next(),
            span: nodes.push(Node::new(v, Op::Leaf)).unwrap(),
        }
    }

    fn seeded(v: f64, op: Op) -> Node {
        Node {
            value: v,
            adjoint: 1.0,
            op,
        }
    }

    fn adjoint(nodes: &BlockArena<Node>, n: NodeRef) -> f64 {
        nodes.get(n.span).unwrap().adjoint
    }

    #[test]
    fn add_passes_adjoint_through() {
        let (mut nodes, mut adj) = arenas();
        let x = leaf(&mut nodes, 3.0);
        let y = leaf(&mut nodes, 5.0);
        seeded(8.0, Op::Add { lhs: x, rhs: y })
            .apply_reverse_step(&mut nodes, &mut adj)
            .unwrap();
        assert_eq!(adjoint(&nodes, x), 1.0);
        assert_eq!(adjoint(&nodes, y), 1.0);
    }

    #[test]
    fn mul_scales_by_other_operand() {
        let (mut nodes, mut adj) = arenas();
        let x = leaf(&mut nodes, 3.0);
        let y = leaf(&mut nodes, 5.0);
        seeded(15.0, Op::Mul { lhs: x, rhs: y })
            .apply_reverse_step(&mut nodes, &mut adj)
            .unwrap();
        assert_eq!(adjoint(&nodes, x), 5.0);
        assert_eq!(adjoint(&nodes, y), 3.0);
    }

    #[test]
    fn mul_of_node_with_itself_doubles() {
        let (mut nodes, mut adj) = arenas();
        let x = leaf(&mut nodes, 3.0);
        seeded(9.0, Op::Mul { lhs: x, rhs: x })
            .apply_reverse_step(&mut nodes, &mut adj)
            .unwrap();
        assert_eq!(adjoint(&nodes, x), 6.0);
    }

    #[test]
    fn const_kinds_only_touch_the_variable() {
        let (mut nodes, mut adj) = arenas();
        let x = leaf(&mut nodes, 2.0);
        seeded(
            6.0,
            Op::MulConst {
                operand: x,
                factor: 3.0,
            },
        )
        .apply_reverse_step(&mut nodes, &mut adj)
        .unwrap();
        seeded(7.0, Op::AddConst { operand: x })
            .apply_reverse_step(&mut nodes, &mut adj)
            .unwrap();
        assert_eq!(adjoint(&nodes, x), 4.0);
    }

    #[test]
    fn log_divides_by_operand_value() {
        let (mut nodes, mut adj) = arenas();
        let x = leaf(&mut nodes, 4.0);
        seeded(4f64.ln(), Op::Log { operand: x })
            .apply_reverse_step(&mut nodes, &mut adj)
            .unwrap();
        assert_eq!(adjoint(&nodes, x), 0.25);
    }

    #[test]
    fn log_of_zero_propagates_infinity() {
        let (mut nodes, mut adj) = arenas();
        let x = leaf(&mut nodes, 0.0);
        seeded(f64::NEG_INFINITY, Op::Log { operand: x })
            .apply_reverse_step(&mut nodes, &mut adj)
            .unwrap();
        assert!(adjoint(&nodes, x).is_infinite());
    }

    #[test]
    fn leaf_is_a_no_op() {
        let (mut nodes, mut adj) = arenas();
        let x = leaf(&mut nodes, 1.0);
        seeded(1.0, Op::Leaf)
            .apply_reverse_step(&mut nodes, &mut adj)
            .unwrap();
        assert_eq!(adjoint(&nodes, x), 0.0);
    }

    #[test]
    fn node_stays_small() {
        assert!(std::mem::size_of::<Node>() <= 64);
    }
}
