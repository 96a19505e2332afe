//! Single-qubit gate optimization pass.

use qcal_ir::{
    CircuitDag, GateKind, Instruction, InstructionKind, NodeIndex, QubitId, StandardGate,
};
use rustc_hash::FxHashMap;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;
use crate::unitary::{EPSILON, Unitary2x2};

/// Single-qubit gate optimization pass.
///
/// Merges runs of consecutive bound single-qubit gates on one qubit into a
/// single `U` gate, folding the leftover phase into the circuit's global
/// phase. Runs that multiply to the identity are removed. Symbolic gates,
/// barriers, measurements and switches all end a run.
pub struct Optimize1qGates;

impl Default for Optimize1qGates {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimize1qGates {
    /// Create a new 1q gate optimizer.
    pub fn new() -> Self {
        Self
    }

    /// Matrix of a mergeable single-qubit instruction.
    fn instruction_unitary(inst: &Instruction) -> Option<Unitary2x2> {
        if inst.qubits.len() != 1 {
            return None;
        }
        let InstructionKind::Gate(gate) = &inst.kind else {
            return None;
        };
        match &gate.kind {
            GateKind::Standard(std_gate) => Unitary2x2::from_gate(std_gate),
            GateKind::Custom(custom) => custom.matrix.as_deref().and_then(Unitary2x2::from_slice),
        }
    }

    /// Whether a run of one gate is already in its merged form.
    fn is_canonical(inst: &Instruction) -> bool {
        matches!(
            inst.as_gate().map(|g| &g.kind),
            Some(GateKind::Standard(StandardGate::U(..)))
        )
    }

    /// Find runs of consecutive mergeable gates on each qubit.
    ///
    /// Computes the topological order once and indexes operations by qubit.
    fn find_1q_runs(dag: &CircuitDag) -> Vec<(QubitId, Vec<NodeIndex>)> {
        let mut qubit_ops: FxHashMap<QubitId, Vec<(NodeIndex, &Instruction)>> =
            FxHashMap::default();
        for (node_idx, inst) in dag.topological_ops() {
            for &qubit in &inst.qubits {
                qubit_ops.entry(qubit).or_default().push((node_idx, inst));
            }
        }

        let mut qubits: Vec<_> = qubit_ops.keys().copied().collect();
        qubits.sort_unstable();

        let mut runs = Vec::new();
        for qubit in qubits {
            let mut current_run: Vec<NodeIndex> = Vec::new();
            for &(node_idx, inst) in &qubit_ops[&qubit] {
                if Self::instruction_unitary(inst).is_some() {
                    current_run.push(node_idx);
                } else if !current_run.is_empty() {
                    runs.push((qubit, std::mem::take(&mut current_run)));
                }
            }
            if !current_run.is_empty() {
                runs.push((qubit, current_run));
            }
        }

        runs
    }

    /// Merge one run. Returns `false` if it was already optimal.
    fn merge_run(dag: &mut CircuitDag, qubit: QubitId, nodes: &[NodeIndex]) -> CompileResult<bool> {
        if let [only] = nodes {
            if dag.get_instruction(*only).is_some_and(Self::is_canonical) {
                return Ok(false);
            }
        }

        let mut combined = Unitary2x2::identity();
        for &node_idx in nodes {
            if let Some(u) = dag.get_instruction(node_idx).and_then(Self::instruction_unitary) {
                combined = u * combined;
            }
        }

        let (theta, phi, lambda, phase) = combined.u3_decomposition();
        dag.set_global_phase(Unitary2x2::normalize_angle(dag.global_phase() + phase));

        let is_identity =
            theta.abs() < EPSILON && Unitary2x2::normalize_angle(phi + lambda).abs() < EPSILON;

        let to_remove: &[NodeIndex] = if is_identity {
            nodes
        } else {
            if let Some(inst) = dag.get_instruction_mut(nodes[0]) {
                *inst = Instruction::single_qubit_gate(
                    StandardGate::U(theta.into(), phi.into(), lambda.into()),
                    qubit,
                );
            }
            &nodes[1..]
        };

        // Descending index order so swap-remove never moves a node still
        // queued for removal.
        let mut to_remove = to_remove.to_vec();
        to_remove.sort_unstable_by(|a, b| b.index().cmp(&a.index()));
        for node_idx in to_remove {
            dag.remove_op(node_idx)?;
        }
        Ok(true)
    }
}

impl Pass for Optimize1qGates {
    fn name(&self) -> &'static str {
        "Optimize1qGates"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        // Node removal invalidates indices, so runs are rediscovered after
        // every merge. Bounded to prevent pathological cases.
        const MAX_ITERATIONS: usize = 200;
        for _ in 0..MAX_ITERATIONS {
            let mut merged = false;
            for (qubit, nodes) in Self::find_1q_runs(dag) {
                if Self::merge_run(dag, qubit, &nodes)? {
                    merged = true;
                    break;
                }
            }
            if !merged {
                break;
            }
        }
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.num_ops() > 0
    }
}
