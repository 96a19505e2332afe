//! Exact inversion of reference circuits.
//!
//! The reference circuit is reduced to its causal cone, simulated to an exact
//! unitary, and the adjoint is resynthesized on the device. There is no
//! approximate fallback: a cone that cannot be simulated fails the call.

use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use qcal_compile::{Layout, TranspileOptions, Transpiler};
use qcal_hal::{HalError, UnitaryBackend};
use qcal_ir::{Circuit, QubitId};

use crate::causal_cone::causal_cone;
use crate::error::{RewardError, RewardResult};

/// Optimization level for resynthesized inverses.
const INVERSE_OPTIMIZATION_LEVEL: u8 = 3;

/// Label of the adjoint unitary before synthesis.
const INVERSE_LABEL: &str = "U_inv";

/// A resynthesized inverse on device qubits.
#[derive(Debug, Clone)]
pub struct InverseCircuit {
    /// Inverse acting on exactly `physical_qubits`.
    pub circuit: Circuit,
    /// Device qubits, ascending.
    pub physical_qubits: Vec<QubitId>,
    /// Logical qubit placed on each entry of `physical_qubits`.
    pub logical_qubits: Vec<QubitId>,
}

impl InverseCircuit {
    /// Number of qubits the inverse acts on.
    pub fn num_qubits(&self) -> usize {
        self.physical_qubits.len()
    }

    /// The inverse relabelled onto its logical qubits.
    pub fn to_logical(&self) -> RewardResult<Circuit> {
        let map: FxHashMap<QubitId, QubitId> = self
            .physical_qubits
            .iter()
            .copied()
            .zip(self.logical_qubits.iter().copied())
            .collect();
        let mut dag = qcal_ir::CircuitDag::new();
        for q in &self.logical_qubits {
            dag.add_qubit(*q);
        }
        for c in self.circuit.clbits() {
            dag.add_clbit(c.id);
        }
        dag.set_global_phase(self.circuit.global_phase());
        let mut logical = self.circuit.with_dag(dag);
        let empty = FxHashMap::default();
        for inst in self.circuit.instructions() {
            logical.append(inst.remap(&map, &empty))?;
        }
        Ok(logical)
    }
}

/// Computes exact inverses of reference circuits.
pub struct ExactInverter<'a> {
    simulator: &'a dyn UnitaryBackend,
    transpiler: &'a dyn Transpiler,
}

impl<'a> ExactInverter<'a> {
    /// Create an inverter from a simulator and a device transpiler.
    pub fn new(simulator: &'a dyn UnitaryBackend, transpiler: &'a dyn Transpiler) -> Self {
        Self {
            simulator,
            transpiler,
        }
    }

    /// Inverse of `reference` restricted to the causal cone of `qubits`.
    ///
    /// The result acts on the layout images of the cone qubits. The cone may
    /// be wider than `qubits` when the reference entangles them with others.
    #[instrument(skip_all, fields(circuit = reference.name(), qubits = qubits.len()))]
    pub fn invert(
        &self,
        reference: &Circuit,
        qubits: &[QubitId],
        layout: &Layout,
    ) -> RewardResult<InverseCircuit> {
        let cone = causal_cone(reference, qubits)?;
        let unitary = self
            .simulator
            .unitary(&cone.circuit)
            .map_err(|e| match e {
                HalError::NotSimulable { circuit, reason } => {
                    RewardError::Simulation { circuit, reason }
                }
                other => RewardError::Hal(other),
            })?;

        let adjoint: Vec<_> = unitary.t().iter().map(|z| z.conj()).collect();
        let mut inverse = Circuit::with_qubits(INVERSE_LABEL, cone.qubits.iter().copied(), 0);
        inverse.unitary(adjoint, &cone.qubits, INVERSE_LABEL)?;

        let options = TranspileOptions::new(INVERSE_OPTIMIZATION_LEVEL)
            .with_initial_layout(layout.clone())
            .with_remove_final_measurements(false);
        let compiled = self.transpiler.transpile(&inverse, &options)?;

        let mut placed: Vec<(QubitId, QubitId)> = cone
            .qubits
            .iter()
            .map(|&q| {
                layout
                    .get_physical(q)
                    .map(|p| (QubitId(p), q))
                    .ok_or_else(|| {
                        RewardError::Configuration(format!("layout does not place qubit {q}"))
                    })
            })
            .collect::<RewardResult<_>>()?;
        placed.sort_unstable();
        let (physical_qubits, logical_qubits): (Vec<_>, Vec<_>) = placed.into_iter().unzip();

        // Compilation pads to the device width; keep only the cone.
        let reduced = causal_cone(&compiled, &physical_qubits)?;
        if reduced.qubits != physical_qubits {
            return Err(RewardError::Configuration(format!(
                "inverse of '{}' spreads to {} device qubits, expected {}",
                reference.name(),
                reduced.len(),
                physical_qubits.len()
            )));
        }
        debug!(
            "Inverse of '{}' on {} qubit(s): {} ops",
            reference.name(),
            physical_qubits.len(),
            reduced.circuit.dag().num_ops()
        );

        Ok(InverseCircuit {
            circuit: reduced.circuit,
            physical_qubits,
            logical_qubits,
        })
    }
}

/// Key of a cached inverse: context index and repetition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InverseKey {
    /// Index of the context circuit.
    pub context: usize,
    /// Repetition count of the cycle.
    pub n_reps: usize,
}

/// Inverses computed during one synthesis call.
#[derive(Debug, Default)]
pub struct InverseCache {
    entries: FxHashMap<InverseKey, InverseCircuit>,
}

impl InverseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached inverse for `key`, computing it on first use.
    pub fn get_or_try_insert_with(
        &mut self,
        key: InverseKey,
        compute: impl FnOnce() -> RewardResult<InverseCircuit>,
    ) -> RewardResult<&InverseCircuit> {
        if !self.entries.contains_key(&key) {
            let inverse = compute()?;
            self.entries.insert(key, inverse);
        }
        self.get(key)
    }

    /// Cached inverse for `key`.
    pub fn get(&self, key: InverseKey) -> RewardResult<&InverseCircuit> {
        self.entries.get(&key).ok_or_else(|| {
            RewardError::Configuration(format!(
                "no inverse cached for context {} with {} repetition(s)",
                key.context, key.n_reps
            ))
        })
    }

    /// Number of cached inverses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
