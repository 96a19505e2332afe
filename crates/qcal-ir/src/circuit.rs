//! High-level circuit builder API.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use crate::control::{ClassicalInput, SwitchOp};
use crate::dag::CircuitDag;
use crate::error::{IrError, IrResult};
use crate::gate::{CustomGate, Gate, StandardGate};
use crate::instruction::Instruction;
use crate::parameter::ParameterExpression;
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};

/// A quantum circuit.
///
/// Wraps a [`CircuitDag`] with the qubit and classical-bit declarations,
/// register names, and runtime classical inputs needed to execute it.
/// Qubit ids need not be contiguous: circuits reduced to a causal cone keep
/// the ids of the qubits they were reduced from.
#[derive(Debug, Clone)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Qubits in ascending id order.
    qubits: Vec<Qubit>,
    /// Classical bits in declaration order.
    clbits: Vec<Clbit>,
    /// Classical inputs read by switches.
    inputs: Vec<ClassicalInput>,
    /// The underlying DAG representation.
    dag: CircuitDag,
    /// Counter for generating qubit IDs.
    next_qubit_id: u32,
    /// Counter for generating classical bit IDs.
    next_clbit_id: u32,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qubits: vec![],
            clbits: vec![],
            inputs: vec![],
            dag: CircuitDag::new(),
            next_qubit_id: 0,
            next_clbit_id: 0,
        }
    }

    /// Create a circuit with a given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        for _ in 0..num_qubits {
            circuit.add_qubit();
        }
        for _ in 0..num_clbits {
            circuit.add_clbit();
        }
        circuit
    }

    /// Create a circuit on an explicit set of qubit ids.
    pub fn with_qubits(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
        num_clbits: u32,
    ) -> Self {
        let mut circuit = Self::new(name);
        let ids: BTreeSet<QubitId> = qubits.into_iter().collect();
        for id in ids {
            circuit.insert_qubit(id);
        }
        for _ in 0..num_clbits {
            circuit.add_clbit();
        }
        circuit
    }

    fn insert_qubit(&mut self, id: QubitId) {
        if self.dag.contains_qubit(id) {
            return;
        }
        let pos = self.qubits.partition_point(|q| q.id < id);
        self.qubits.insert(pos, Qubit::new(id));
        self.dag.add_qubit(id);
        self.next_qubit_id = self.next_qubit_id.max(id.0 + 1);
    }

    /// Add a single qubit to the circuit.
    pub fn add_qubit(&mut self) -> QubitId {
        let id = QubitId(self.next_qubit_id);
        self.insert_qubit(id);
        id
    }

    /// Add a single classical bit to the circuit.
    pub fn add_clbit(&mut self) -> ClbitId {
        let id = ClbitId(self.next_clbit_id);
        self.next_clbit_id += 1;
        self.clbits.push(Clbit::new(id));
        self.dag.add_clbit(id);
        id
    }

    /// Add a classical register with multiple bits.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> Vec<ClbitId> {
        let name = name.into();
        let mut ids = vec![];
        for i in 0..size {
            let id = ClbitId(self.next_clbit_id);
            self.next_clbit_id += 1;
            self.clbits.push(Clbit::with_register(id, &name, i));
            self.dag.add_clbit(id);
            ids.push(id);
        }
        ids
    }

    /// Declare a classical input.
    ///
    /// Redeclaring an input with the same width is a no-op.
    pub fn add_input(&mut self, name: impl Into<String>, bits: u32) -> IrResult<&mut Self> {
        let name = name.into();
        if let Some(existing) = self.inputs.iter().find(|i| i.name == name) {
            if existing.bits != bits {
                return Err(IrError::ConflictingInput {
                    name,
                    existing: existing.bits,
                    requested: bits,
                });
            }
            return Ok(self);
        }
        self.inputs.push(ClassicalInput::new(name, bits));
        Ok(self)
    }

    fn apply_gate(&mut self, gate: StandardGate, qubits: &[QubitId]) -> IrResult<&mut Self> {
        self.dag
            .apply(Instruction::gate(gate, qubits.iter().copied()))?;
        Ok(self)
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply identity gate.
    pub fn id(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::I, &[qubit])
    }

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::H, &[qubit])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::X, &[qubit])
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Y, &[qubit])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Z, &[qubit])
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::S, &[qubit])
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Sdg, &[qubit])
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::T, &[qubit])
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Tdg, &[qubit])
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::SX, &[qubit])
    }

    /// Apply sqrt(X)-dagger gate.
    pub fn sxdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::SXdg, &[qubit])
    }

    /// Apply Rx rotation gate.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Rx(theta.into()), &[qubit])
    }

    /// Apply Ry rotation gate.
    pub fn ry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Ry(theta.into()), &[qubit])
    }

    /// Apply Rz rotation gate.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Rz(theta.into()), &[qubit])
    }

    /// Apply phase gate.
    pub fn p(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::P(theta.into()), &[qubit])
    }

    /// Apply universal U gate.
    pub fn u(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(
            StandardGate::U(theta.into(), phi.into(), lambda.into()),
            &[qubit],
        )
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CX, &[control, target])
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CY, &[control, target])
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CZ, &[control, target])
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Swap, &[q1, q2])
    }

    /// Apply controlled-Rz gate.
    pub fn crz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CRz(theta.into()), &[control, target])
    }

    /// Apply controlled-phase gate.
    pub fn cp(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CP(theta.into()), &[control, target])
    }

    /// Apply RZZ (ZZ rotation) gate.
    pub fn rzz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: QubitId,
        q2: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::RZZ(theta.into()), &[q1, q2])
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Apply an arbitrary gate.
    pub fn gate(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::gate(gate, qubits))?;
        Ok(self)
    }

    /// Apply an explicit unitary, row-major and little-endian over `qubits`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn unitary(
        &mut self,
        matrix: Vec<Complex64>,
        qubits: &[QubitId],
        label: impl Into<String>,
    ) -> IrResult<&mut Self> {
        let gate = CustomGate::unitary(label, qubits.len() as u32, matrix)?;
        self.dag
            .apply(Instruction::gate(gate, qubits.iter().copied()))?;
        Ok(self)
    }

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::measure(qubit, clbit))?;
        Ok(self)
    }

    /// Measure qubits into the given classical bits, pairwise.
    pub fn measure_into(&mut self, qubits: &[QubitId], clbits: &[ClbitId]) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::measure_all(
            qubits.iter().copied(),
            clbits.iter().copied(),
        )?)?;
        Ok(self)
    }

    /// Measure every qubit into a fresh `meas` register.
    ///
    /// Bit `k` of the register records the `k`-th qubit in ascending id order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        let qubits = self.qubit_ids();
        let clbits = self.add_creg("meas", qubits.len() as u32);
        self.measure_into(&qubits, &clbits)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::reset(qubit))?;
        Ok(self)
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::barrier(qubits))?;
        Ok(self)
    }

    /// Apply a barrier to all qubits.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let qubits = self.qubit_ids();
        self.dag.apply(Instruction::barrier(qubits))?;
        Ok(self)
    }

    /// Apply a delay to a qubit.
    pub fn delay(&mut self, qubit: QubitId, duration: u64) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::delay(qubit, duration))?;
        Ok(self)
    }

    /// Apply a runtime switch over declared classical inputs.
    pub fn switch(&mut self, op: SwitchOp) -> IrResult<&mut Self> {
        op.validate_keys(&self.inputs)?;
        self.dag.apply(Instruction::switch(op))?;
        Ok(self)
    }

    /// Append a prebuilt instruction.
    pub fn append(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        if let crate::instruction::InstructionKind::Switch(op) = &instruction.kind {
            op.validate_keys(&self.inputs)?;
        }
        self.dag.apply(instruction)?;
        Ok(self)
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// Append `other`, mapping its `k`-th qubit onto `qubits[k]`.
    ///
    /// Classical bits are matched by position; bits `other` has beyond this
    /// circuit's are added with their register names. Classical inputs are
    /// merged and global phases add.
    #[allow(clippy::cast_possible_truncation)]
    pub fn compose(&mut self, other: &Circuit, qubits: &[QubitId]) -> IrResult<&mut Self> {
        if other.num_qubits() != qubits.len() {
            return Err(IrError::ComposeWidthMismatch {
                expected: other.num_qubits(),
                got: qubits.len(),
            });
        }

        let qmap: FxHashMap<QubitId, QubitId> = other
            .qubit_ids()
            .into_iter()
            .zip(qubits.iter().copied())
            .collect();

        let mut cmap = FxHashMap::default();
        for (pos, clbit) in other.clbits.iter().enumerate() {
            let target = match self.clbits.get(pos) {
                Some(own) => own.id,
                None => {
                    let id = ClbitId(self.next_clbit_id);
                    self.next_clbit_id += 1;
                    self.clbits.push(Clbit {
                        id,
                        register: clbit.register.clone(),
                        index: clbit.index,
                    });
                    self.dag.add_clbit(id);
                    id
                }
            };
            cmap.insert(clbit.id, target);
        }

        for input in &other.inputs {
            self.add_input(input.name.clone(), input.bits)?;
        }

        for inst in other.instructions() {
            self.append(inst.remap(&qmap, &cmap))?;
        }

        let phase = self.global_phase() + other.global_phase();
        self.set_global_phase(phase);
        Ok(self)
    }

    /// Empty circuit with the same qubits, classical bits, inputs and phase.
    pub fn copy_empty_like(&self, name: impl Into<String>) -> Circuit {
        let mut dag = CircuitDag::new();
        for q in &self.qubits {
            dag.add_qubit(q.id);
        }
        for c in &self.clbits {
            dag.add_clbit(c.id);
        }
        dag.set_global_phase(self.dag.global_phase());
        dag.set_level(self.dag.level());
        Circuit {
            name: name.into(),
            qubits: self.qubits.clone(),
            clbits: self.clbits.clone(),
            inputs: self.inputs.clone(),
            dag,
            next_qubit_id: self.next_qubit_id,
            next_clbit_id: self.next_clbit_id,
        }
    }

    /// Empty circuit on `qubits` only, keeping classical bits, inputs and phase.
    pub fn copy_empty_on(&self, name: impl Into<String>, qubits: &[QubitId]) -> Circuit {
        let mut out = self.copy_empty_like(name);
        let keep: BTreeSet<QubitId> = qubits.iter().copied().collect();
        let mut dag = CircuitDag::new();
        for &q in &keep {
            dag.add_qubit(q);
        }
        for c in &self.clbits {
            dag.add_clbit(c.id);
        }
        dag.set_global_phase(self.dag.global_phase());
        dag.set_level(self.dag.level());
        out.qubits = keep.into_iter().map(Qubit::new).collect();
        out.dag = dag;
        out
    }

    /// Circuit with this circuit's classical bits and inputs around a new DAG.
    ///
    /// Qubits are taken from the DAG. Used by compiler passes that rebuild
    /// the graph, possibly on different qubit ids.
    pub fn with_dag(&self, dag: CircuitDag) -> Circuit {
        let qubits: Vec<Qubit> = dag.qubits().into_iter().map(Qubit::new).collect();
        let next_qubit_id = qubits.last().map_or(0, |q| q.id.0 + 1);
        Circuit {
            name: self.name.clone(),
            qubits,
            clbits: self.clbits.clone(),
            inputs: self.inputs.clone(),
            dag,
            next_qubit_id,
            next_clbit_id: self.next_clbit_id,
        }
    }

    /// This circuit applied `n` times in sequence.
    pub fn repeat(&self, n: usize) -> IrResult<Circuit> {
        let mut out = self.copy_empty_like(format!("{}_x{n}", self.name));
        out.set_global_phase(0.0);
        let qubits = self.qubit_ids();
        for _ in 0..n {
            out.compose(self, &qubits)?;
        }
        Ok(out)
    }

    /// The inverse circuit.
    ///
    /// Fails if the circuit measures, resets, or holds an opaque gate.
    pub fn inverse(&self) -> IrResult<Circuit> {
        let mut out = self.copy_empty_like(format!("{}_dg", self.name));
        out.set_global_phase(-self.global_phase());
        let ops: Vec<&Instruction> = self.instructions().collect();
        for inst in ops.into_iter().rev() {
            out.dag.apply(inst.inverse()?)?;
        }
        Ok(out)
    }

    /// Names of all unbound parameters, sorted.
    pub fn parameters(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        for inst in self.instructions() {
            inst.collect_parameters(&mut set);
        }
        set
    }

    /// Copy of the circuit with the given parameters bound.
    pub fn bind_parameters(&self, bindings: &FxHashMap<String, f64>) -> IrResult<Circuit> {
        let mut out = self.copy_empty_like(self.name.clone());
        for inst in self.instructions() {
            out.dag.apply(inst.bind(bindings))?;
        }
        Ok(out)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the circuit.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Get the circuit depth.
    pub fn depth(&self) -> usize {
        self.dag.depth()
    }

    /// Instructions in topological order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.dag.topological_ops().map(|(_, inst)| inst)
    }

    /// Whether any instruction is a runtime switch.
    pub fn has_control_flow(&self) -> bool {
        self.instructions().any(Instruction::is_switch)
    }

    /// Get a reference to the underlying DAG.
    pub fn dag(&self) -> &CircuitDag {
        &self.dag
    }

    /// Consume the circuit and return the DAG.
    pub fn into_dag(self) -> CircuitDag {
        self.dag
    }

    /// Get the qubits in the circuit.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Qubit ids in ascending order.
    pub fn qubit_ids(&self) -> Vec<QubitId> {
        self.qubits.iter().map(|q| q.id).collect()
    }

    /// Get the classical bits in the circuit.
    pub fn clbits(&self) -> &[Clbit] {
        &self.clbits
    }

    /// Declared classical inputs.
    pub fn inputs(&self) -> &[ClassicalInput] {
        &self.inputs
    }

    /// Global phase in radians.
    pub fn global_phase(&self) -> f64 {
        self.dag.global_phase()
    }

    /// Set the global phase.
    pub fn set_global_phase(&mut self, phase: f64) {
        self.dag.set_global_phase(phase);
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 0);
        circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?;
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::InstructionKind;

    #[test]
    fn test_measure_all_adds_meas_register() {
        let mut circuit = Circuit::bell().unwrap();
        circuit.measure_all().unwrap();
        assert_eq!(circuit.num_clbits(), 2);
        assert!(circuit.clbits().iter().all(|c| c.register_name() == "meas"));
        assert_eq!(circuit.clbits()[1].index, Some(1));
    }

    #[test]
    fn test_with_qubits_sparse_ids() {
        let mut circuit = Circuit::with_qubits("cone", [QubitId(4), QubitId(1)], 0);
        assert_eq!(circuit.qubit_ids(), vec![QubitId(1), QubitId(4)]);
        let fresh = circuit.add_qubit();
        assert_eq!(fresh, QubitId(5));
    }

    #[test]
    fn test_copy_empty_on_subset() {
        let mut circuit = Circuit::with_size("full", 3, 0);
        circuit.add_creg("c", 2);
        circuit.set_global_phase(0.25);
        let sub = circuit.copy_empty_on("sub", &[QubitId(2), QubitId(0)]);
        assert_eq!(sub.qubit_ids(), vec![QubitId(0), QubitId(2)]);
        assert_eq!(sub.num_clbits(), 2);
        assert_eq!(sub.clbits()[0].register_name(), "c");
        assert!((sub.global_phase() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_compose_maps_by_position() {
        let mut small = Circuit::with_size("small", 2, 0);
        small.cx(QubitId(0), QubitId(1)).unwrap();
        small.set_global_phase(0.5);

        let mut big = Circuit::with_size("big", 3, 0);
        big.compose(&small, &[QubitId(2), QubitId(0)]).unwrap();

        let inst = big.instructions().next().unwrap();
        assert_eq!(inst.qubits, vec![QubitId(2), QubitId(0)]);
        assert!((big.global_phase() - 0.5).abs() < 1e-12);

        let err = big.compose(&small, &[QubitId(0)]).unwrap_err();
        assert!(matches!(err, IrError::ComposeWidthMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_compose_adds_missing_clbits() {
        let mut measured = Circuit::with_size("m", 1, 0);
        measured.measure_all().unwrap();

        let mut host = Circuit::with_size("host", 2, 0);
        host.compose(&measured, &[QubitId(1)]).unwrap();
        assert_eq!(host.num_clbits(), 1);
        assert_eq!(host.clbits()[0].register_name(), "meas");
    }

    #[test]
    fn test_inverse_and_repeat() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit.h(QubitId(0)).unwrap().s(QubitId(0)).unwrap();
        circuit.set_global_phase(0.25);

        let inv = circuit.inverse().unwrap();
        let names: Vec<_> = inv.instructions().map(Instruction::name).collect();
        assert_eq!(names, vec!["sdg", "h"]);
        assert!((inv.global_phase() + 0.25).abs() < 1e-12);

        let rep = circuit.repeat(3).unwrap();
        assert_eq!(rep.dag().num_ops(), 6);
        assert!((rep.global_phase() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_parameters_and_binding() {
        let mut circuit = Circuit::with_size("p", 2, 0);
        circuit
            .rx(ParameterExpression::symbol("b"), QubitId(0))
            .unwrap()
            .rzz(ParameterExpression::symbol("a"), QubitId(0), QubitId(1))
            .unwrap();
        let names: Vec<_> = circuit.parameters().into_iter().collect();
        assert_eq!(names, vec!["a", "b"]);

        let mut bindings = FxHashMap::default();
        bindings.insert("a".to_string(), 0.1);
        bindings.insert("b".to_string(), 0.2);
        let bound = circuit.bind_parameters(&bindings).unwrap();
        assert!(bound.parameters().is_empty());
    }

    #[test]
    fn test_switch_requires_declared_input() {
        let mut circuit = Circuit::with_size("sw", 1, 0);
        let op = SwitchOp::new(["sel"])
            .with_case(vec![1], vec![Instruction::single_qubit_gate(StandardGate::X, QubitId(0))])
            .unwrap();
        assert!(matches!(
            circuit.switch(op.clone()),
            Err(IrError::UndeclaredInput(_))
        ));

        circuit.add_input("sel", 2).unwrap();
        circuit.switch(op).unwrap();
        assert!(circuit.has_control_flow());
        assert!(matches!(
            circuit.instructions().next().map(|i| &i.kind),
            Some(InstructionKind::Switch(_))
        ));
        assert!(matches!(
            circuit.add_input("sel", 3),
            Err(IrError::ConflictingInput { existing: 2, requested: 3, .. })
        ));
    }

    #[test]
    fn test_unitary_size_checked() {
        let mut circuit = Circuit::with_size("u", 1, 0);
        let err = circuit
            .unitary(vec![Complex64::new(1.0, 0.0); 3], &[QubitId(0)], "bad")
            .unwrap_err();
        assert!(matches!(err, IrError::MatrixSizeMismatch { expected: 4, .. }));
    }
}
