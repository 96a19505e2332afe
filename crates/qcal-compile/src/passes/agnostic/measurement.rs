//! Removal of terminal measurements.

use petgraph::Direction;
use petgraph::visit::EdgeRef;
use qcal_ir::{CircuitDag, DagNode, NodeIndex};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Removes measurements that are the last operation on every wire they touch.
///
/// Barriers standing between a measurement and the end of the circuit do not
/// protect it. Classical bits stay declared but are never written.
pub struct RemoveFinalMeasurements;

impl RemoveFinalMeasurements {
    fn is_final(dag: &CircuitDag, node: NodeIndex) -> bool {
        let graph = dag.graph();
        graph
            .edges_directed(node, Direction::Outgoing)
            .all(|e| match &graph[e.target()] {
                DagNode::Out(_) => true,
                DagNode::Op(inst) => inst.is_barrier() && Self::is_final(dag, e.target()),
                DagNode::In(_) => false,
            })
    }
}

impl Pass for RemoveFinalMeasurements {
    fn name(&self) -> &'static str {
        "RemoveFinalMeasurements"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut finals: Vec<NodeIndex> = dag
            .topological_ops()
            .filter(|(idx, inst)| inst.is_measure() && Self::is_final(dag, *idx))
            .map(|(idx, _)| idx)
            .collect();
        finals.sort_unstable_by(|a, b| b.index().cmp(&a.index()));
        for node_idx in finals {
            dag.remove_op(node_idx)?;
        }
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.topological_ops().any(|(_, inst)| inst.is_measure())
    }
}
