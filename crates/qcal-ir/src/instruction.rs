//! Circuit instructions combining gates with operands.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::control::SwitchOp;
use crate::error::{IrError, IrResult};
use crate::gate::{Gate, StandardGate};
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(Gate),
    /// Measurement operation; `qubits[i]` is recorded into `clbits[i]`.
    Measure,
    /// Reset qubit to |0⟩.
    Reset,
    /// Barrier (scheduling boundary).
    Barrier,
    /// Delay instruction.
    Delay {
        /// Duration in device-specific units.
        duration: u64,
    },
    /// Runtime dispatch on classical inputs.
    Switch(SwitchOp),
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction operates on (for measure).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: impl Into<Gate>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate.into()),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: StandardGate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a multi-qubit measurement instruction.
    ///
    /// Returns an error if the number of qubits and classical bits do not match.
    pub fn measure_all(
        qubits: impl IntoIterator<Item = QubitId>,
        clbits: impl IntoIterator<Item = ClbitId>,
    ) -> IrResult<Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        let clbits: Vec<_> = clbits.into_iter().collect();
        if qubits.len() != clbits.len() {
            return Err(IrError::InvalidDag(format!(
                "measure_all: qubit count ({}) does not match clbit count ({})",
                qubits.len(),
                clbits.len(),
            )));
        }
        Ok(Self {
            kind: InstructionKind::Measure,
            qubits,
            clbits,
        })
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a delay instruction.
    pub fn delay(qubit: QubitId, duration: u64) -> Self {
        Self {
            kind: InstructionKind::Delay { duration },
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create a switch instruction spanning every qubit its arms touch.
    pub fn switch(op: SwitchOp) -> Self {
        Self {
            qubits: op.qubits(),
            kind: InstructionKind::Switch(op),
            clbits: vec![],
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, InstructionKind::Barrier)
    }

    /// Check if this is a runtime switch.
    pub fn is_switch(&self) -> bool {
        matches!(self.kind, InstructionKind::Switch(_))
    }

    /// Barriers and delays: they order operations but do not act on state.
    pub fn is_directive(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Barrier | InstructionKind::Delay { .. }
        )
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// Get the name of the instruction.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure",
            InstructionKind::Reset => "reset",
            InstructionKind::Barrier => "barrier",
            InstructionKind::Delay { .. } => "delay",
            InstructionKind::Switch(_) => "switch",
        }
    }

    /// Relabel operands, including those inside switch arms.
    ///
    /// Operands missing from a map are left unchanged.
    pub fn remap(
        &self,
        qubits: &FxHashMap<QubitId, QubitId>,
        clbits: &FxHashMap<ClbitId, ClbitId>,
    ) -> Instruction {
        let kind = match &self.kind {
            InstructionKind::Switch(op) => InstructionKind::Switch(SwitchOp {
                selectors: op.selectors.clone(),
                cases: op
                    .cases
                    .iter()
                    .map(|case| crate::control::SwitchCase {
                        key: case.key.clone(),
                        body: case.body.iter().map(|i| i.remap(qubits, clbits)).collect(),
                    })
                    .collect(),
            }),
            other => other.clone(),
        };
        Instruction {
            kind,
            qubits: self
                .qubits
                .iter()
                .map(|q| qubits.get(q).copied().unwrap_or(*q))
                .collect(),
            clbits: self
                .clbits
                .iter()
                .map(|c| clbits.get(c).copied().unwrap_or(*c))
                .collect(),
        }
    }

    /// The inverse instruction.
    ///
    /// Directives are self-inverse; a switch inverts each arm body in reverse
    /// order. Measurement and reset have no inverse.
    pub fn inverse(&self) -> IrResult<Instruction> {
        let kind = match &self.kind {
            InstructionKind::Gate(g) => InstructionKind::Gate(g.inverse()?),
            InstructionKind::Barrier | InstructionKind::Delay { .. } => self.kind.clone(),
            InstructionKind::Switch(op) => {
                let mut inverted = SwitchOp::new(op.selectors.clone());
                for case in &op.cases {
                    let body = case
                        .body
                        .iter()
                        .rev()
                        .map(Instruction::inverse)
                        .collect::<IrResult<Vec<_>>>()?;
                    inverted.add_case(case.key.clone(), body)?;
                }
                InstructionKind::Switch(inverted)
            }
            InstructionKind::Measure | InstructionKind::Reset => {
                return Err(IrError::NotInvertible(self.name().to_string()));
            }
        };
        Ok(Instruction {
            kind,
            qubits: self.qubits.clone(),
            clbits: self.clbits.clone(),
        })
    }

    /// Bind gate parameters, descending into switch arms.
    pub fn bind(&self, bindings: &FxHashMap<String, f64>) -> Instruction {
        let kind = match &self.kind {
            InstructionKind::Gate(g) => InstructionKind::Gate(g.bind(bindings)),
            InstructionKind::Switch(op) => InstructionKind::Switch(SwitchOp {
                selectors: op.selectors.clone(),
                cases: op
                    .cases
                    .iter()
                    .map(|case| crate::control::SwitchCase {
                        key: case.key.clone(),
                        body: case.body.iter().map(|i| i.bind(bindings)).collect(),
                    })
                    .collect(),
            }),
            other => other.clone(),
        };
        Instruction {
            kind,
            qubits: self.qubits.clone(),
            clbits: self.clbits.clone(),
        }
    }

    /// Collect symbolic parameter names, descending into switch arms.
    pub(crate) fn collect_parameters(&self, set: &mut std::collections::BTreeSet<String>) {
        match &self.kind {
            InstructionKind::Gate(g) => {
                if let crate::gate::GateKind::Standard(std_gate) = &g.kind {
                    for p in std_gate.parameters() {
                        p.collect_symbols(set);
                    }
                }
            }
            InstructionKind::Switch(op) => {
                for case in &op.cases {
                    for inst in &case.body {
                        inst.collect_parameters(set);
                    }
                }
            }
            _ => {}
        }
    }
}
