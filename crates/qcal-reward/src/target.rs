//! The operation under calibration and its circuit context.

use qcal_compile::Layout;
use qcal_ir::{Circuit, QubitId};

use crate::causal_cone::causal_cone;
use crate::error::{RewardError, RewardResult};
use crate::input_states::{InputStateFamily, InputStateLibrary};

/// A gate target: the calibrated gate's qubits, their causal cone through
/// the context circuit, and the placement on the device.
#[derive(Debug, Clone)]
pub struct GateTarget {
    gate_qubits: Vec<QubitId>,
    causal_cone_qubits: Vec<QubitId>,
    physical_qubits: Vec<QubitId>,
    layout: Layout,
}

impl GateTarget {
    /// Build a target for the gate acting on `gate_qubits` within `context`.
    ///
    /// Every causal-cone qubit must be placed by `layout`.
    pub fn new(context: &Circuit, gate_qubits: &[QubitId], layout: Layout) -> RewardResult<Self> {
        if gate_qubits.is_empty() {
            return Err(RewardError::Configuration(
                "a gate target needs at least one qubit".to_string(),
            ));
        }
        let cone = causal_cone(context, gate_qubits)?;
        let physical_qubits = cone
            .qubits
            .iter()
            .map(|&q| {
                layout.get_physical(q).map(QubitId).ok_or_else(|| {
                    RewardError::Configuration(format!("layout does not place causal-cone qubit {q}"))
                })
            })
            .collect::<RewardResult<Vec<_>>>()?;

        Ok(Self {
            gate_qubits: gate_qubits.to_vec(),
            causal_cone_qubits: cone.qubits,
            physical_qubits,
            layout,
        })
    }

    /// Qubits the calibrated gate acts on.
    pub fn gate_qubits(&self) -> &[QubitId] {
        &self.gate_qubits
    }

    /// Logical causal-cone qubits, ascending.
    pub fn causal_cone_qubits(&self) -> &[QubitId] {
        &self.causal_cone_qubits
    }

    /// Device qubits of the causal cone, in causal-cone order.
    pub fn physical_qubits(&self) -> &[QubitId] {
        &self.physical_qubits
    }

    /// Number of causal-cone qubits.
    pub fn causal_cone_size(&self) -> usize {
        self.causal_cone_qubits.len()
    }

    /// Logical-to-physical placement.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Input states of the given family.
    pub fn input_states(&self, family: InputStateFamily, seed: u64) -> RewardResult<InputStateLibrary> {
        InputStateLibrary::new(family, seed)
    }
}

/// A circuit under test together with its ideal reference.
#[derive(Debug, Clone)]
pub struct ContextCircuit {
    circuit: Circuit,
    baseline: Option<Circuit>,
}

impl ContextCircuit {
    /// A test circuit with no reference attached.
    pub fn new(circuit: Circuit) -> Self {
        Self {
            circuit,
            baseline: None,
        }
    }

    /// A test circuit and its reference.
    ///
    /// Both must act on the same qubits.
    pub fn with_baseline(circuit: Circuit, baseline: Circuit) -> RewardResult<Self> {
        if circuit.qubit_ids() != baseline.qubit_ids() {
            return Err(RewardError::Configuration(format!(
                "baseline '{}' and circuit '{}' act on different qubits",
                baseline.name(),
                circuit.name()
            )));
        }
        Ok(Self {
            circuit,
            baseline: Some(baseline),
        })
    }

    /// The circuit under test.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The reference circuit.
    pub fn baseline(&self) -> RewardResult<&Circuit> {
        self.baseline
            .as_ref()
            .ok_or_else(|| RewardError::MissingBaseline(self.circuit.name().to_string()))
    }

    /// Name of the circuit under test.
    pub fn name(&self) -> &str {
        self.circuit.name()
    }
}
