//! Exact unitary extraction.

use ndarray::Array2;
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use qcal_hal::{HalError, HalResult, UnitaryBackend};
use qcal_ir::{Circuit, GateKind, InstructionKind, QubitId};

use crate::statevector::Statevector;

/// Largest circuit the unitary simulator accepts by default.
const DEFAULT_MAX_QUBITS: usize = 12;

/// Builds a circuit's unitary one column at a time by simulating every
/// computational basis state.
#[derive(Debug, Clone)]
pub struct UnitarySimulator {
    max_qubits: usize,
}

impl UnitarySimulator {
    /// Create a simulator with the default size limit.
    pub fn new() -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
        }
    }

    /// Set the qubit limit.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    fn not_simulable(circuit: &Circuit, reason: impl Into<String>) -> HalError {
        HalError::NotSimulable {
            circuit: circuit.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl Default for UnitarySimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitaryBackend for UnitarySimulator {
    #[instrument(skip_all, fields(circuit = circuit.name(), qubits = circuit.num_qubits()))]
    fn unitary(&self, circuit: &Circuit) -> HalResult<Array2<Complex64>> {
        let num_qubits = circuit.num_qubits();
        if num_qubits > self.max_qubits {
            return Err(HalError::CircuitTooLarge(format!(
                "unitary of {} qubits exceeds limit {}",
                num_qubits, self.max_qubits
            )));
        }
        if let Some(param) = circuit.parameters().into_iter().next() {
            return Err(Self::not_simulable(
                circuit,
                format!("unbound parameter '{param}'"),
            ));
        }

        let positions: FxHashMap<QubitId, usize> = circuit
            .qubit_ids()
            .into_iter()
            .enumerate()
            .map(|(i, q)| (q, i))
            .collect();

        let mut gates: Vec<(&GateKind, Vec<usize>)> = Vec::new();
        for inst in circuit.instructions() {
            match &inst.kind {
                InstructionKind::Gate(gate) => {
                    if let GateKind::Custom(c) = &gate.kind {
                        if c.matrix.is_none() {
                            return Err(Self::not_simulable(
                                circuit,
                                format!("opaque gate '{}'", c.name),
                            ));
                        }
                    }
                    let qubits = inst.qubits.iter().map(|q| positions[q]).collect();
                    gates.push((&gate.kind, qubits));
                }
                InstructionKind::Barrier | InstructionKind::Delay { .. } => {}
                InstructionKind::Measure | InstructionKind::Reset | InstructionKind::Switch(_) => {
                    return Err(Self::not_simulable(
                        circuit,
                        format!("non-unitary '{}'", inst.name()),
                    ));
                }
            }
        }

        let dim = 1usize << num_qubits;
        let mut unitary = Array2::<Complex64>::zeros((dim, dim));
        for col in 0..dim {
            let mut sv = Statevector::basis_state(num_qubits, col);
            for (gate, qubits) in &gates {
                sv.apply_gate(gate, qubits)?;
            }
            sv.apply_global_phase(circuit.global_phase());
            for (row, amp) in sv.into_amplitudes().into_iter().enumerate() {
                unitary[[row, col]] = amp;
            }
        }

        debug!("Extracted {}x{} unitary from {} gates", dim, dim, gates.len());
        Ok(unitary)
    }
}
