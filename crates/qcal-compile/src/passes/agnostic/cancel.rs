//! CX cancellation pass.

use petgraph::Direction;
use petgraph::visit::EdgeRef;
use qcal_ir::{CircuitDag, DagNode, GateKind, Instruction, NodeIndex, StandardGate, WireId};
use rustc_hash::FxHashSet;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// CX cancellation pass.
///
/// Cancels pairs of adjacent CX gates on the same control and target.
/// CX · CX = I
pub struct CancelCX;

impl CancelCX {
    /// Create a new CX cancellation pass.
    pub fn new() -> Self {
        Self
    }

    fn is_cx(inst: &Instruction) -> bool {
        matches!(
            inst.as_gate().map(|g| &g.kind),
            Some(GateKind::Standard(StandardGate::CX))
        )
    }

    /// Find pairs of adjacent CX gates that can be cancelled.
    fn find_cancellable_pairs(dag: &CircuitDag) -> Vec<(NodeIndex, NodeIndex)> {
        let graph = dag.graph();
        let mut pairs = Vec::new();
        let mut processed: FxHashSet<NodeIndex> = FxHashSet::default();

        for (node_idx, inst) in dag.topological_ops() {
            if processed.contains(&node_idx) || !Self::is_cx(inst) {
                continue;
            }

            let successor = graph
                .edges_directed(node_idx, Direction::Outgoing)
                .map(|e| e.target())
                .find(|&succ| match &graph[succ] {
                    DagNode::Op(next) => {
                        Self::is_cx(next)
                            && next.qubits == inst.qubits
                            && Self::is_truly_adjacent(dag, node_idx, succ, &inst.qubits)
                    }
                    _ => false,
                });

            if let Some(succ) = successor {
                if !processed.contains(&succ) {
                    pairs.push((node_idx, succ));
                    processed.insert(node_idx);
                    processed.insert(succ);
                }
            }
        }

        pairs
    }

    /// Check that `node2` directly follows `node1` on every given wire.
    fn is_truly_adjacent(
        dag: &CircuitDag,
        node1: NodeIndex,
        node2: NodeIndex,
        qubits: &[qcal_ir::QubitId],
    ) -> bool {
        let graph = dag.graph();
        qubits.iter().all(|&qubit| {
            let wire = WireId::Qubit(qubit);
            graph
                .edges_directed(node1, Direction::Outgoing)
                .any(|e| e.weight().wire == wire && e.target() == node2)
        })
    }
}

impl Default for CancelCX {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for CancelCX {
    fn name(&self) -> &'static str {
        "CancelCX"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        const MAX_ITERATIONS: usize = 100;
        for _ in 0..MAX_ITERATIONS {
            let pairs = Self::find_cancellable_pairs(dag);
            if pairs.is_empty() {
                break;
            }

            let mut to_remove: Vec<NodeIndex> =
                pairs.into_iter().flat_map(|(a, b)| [a, b]).collect();
            to_remove.sort_unstable_by(|a, b| b.index().cmp(&a.index()));
            for node_idx in to_remove {
                dag.remove_op(node_idx)?;
            }
        }

        Ok(())
    }
}
