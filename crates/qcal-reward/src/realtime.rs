//! Real-time probe programs.
//!
//! A single program covers every (input state, context, repetition count)
//! combination. Each choice is a classical input read at runtime, and every
//! stage of the probe is a [`BranchTable`]: a complete map from selector
//! values to circuit bodies, lowered to one switch.
//!
//! ```text
//! reset ─ input_state_k ─┤├─ [circuit_choice, n_reps] cycle ─┤├─ [circuit_choice, n_reps] inverse ─┤├─ input_state_k inverse ─ measure
//! ```

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::{debug, info, instrument};

use qcal_compile::{TranspileOptions, Transpiler};
use qcal_hal::{ParameterBatch, SamplerPub, UnitaryBackend};
use qcal_ir::{Circuit, ClbitId, Instruction, QubitId, SwitchOp};

use crate::config::MAX_REPETITION_COUNTS;
use crate::data::{CafeRewardData, CafeRewardDataList};
use crate::error::{RewardError, RewardResult};
use crate::estimator::MEASUREMENT_REGISTER;
use crate::input_states::InputStateLibrary;
use crate::inverse::{ExactInverter, InverseCache, InverseKey};
use crate::target::{ContextCircuit, GateTarget};

/// Selector of the repetition count.
pub const N_REPS_VAR: &str = "n_reps";

/// Selector of the context circuit.
pub const CONTEXT_VAR: &str = "circuit_choice";

/// Width of the repetition-count selector.
const N_REPS_BITS: u32 = 8;

/// Placeholder duration for branches without gates.
const PLACEHOLDER_DELAY: u64 = 16;

/// Optimization level for programs with runtime branches.
const PROGRAM_OPTIMIZATION_LEVEL: u8 = 1;

/// Selector of the input state on the `k`-th causal-cone qubit.
pub fn input_state_var(k: usize) -> String {
    format!("input_state_{k}")
}

/// Bits needed to hold the values `0..count`.
fn selector_width(count: usize) -> u32 {
    (usize::BITS - count.saturating_sub(1).leading_zeros()).max(1)
}

/// Every key of a mixed-radix product, last selector fastest.
fn product_keys(cardinalities: &[u64]) -> Vec<Vec<u64>> {
    let mut keys = vec![vec![]];
    for &card in cardinalities {
        keys = keys
            .into_iter()
            .flat_map(|prefix| {
                (0..card).map(move |v| {
                    let mut key = prefix.clone();
                    key.push(v);
                    key
                })
            })
            .collect();
    }
    keys
}

/// Instructions of `circuit`, or a placeholder delay on `qubits` when it has
/// none.
fn body_or_placeholder(circuit: &Circuit, qubits: &[QubitId]) -> Vec<Instruction> {
    let body: Vec<Instruction> = circuit.instructions().cloned().collect();
    if body.is_empty() {
        qubits
            .iter()
            .map(|&q| Instruction::delay(q, PLACEHOLDER_DELAY))
            .collect()
    } else {
        body
    }
}

/// A complete map from selector values to branch bodies.
#[derive(Debug, Clone)]
pub struct BranchTable {
    selectors: Vec<(String, u64)>,
    bodies: BTreeMap<Vec<u64>, Vec<Instruction>>,
}

impl BranchTable {
    /// Create a table over `(name, cardinality)` selectors.
    ///
    /// With no selectors the table has a single unconditional body at key `[]`.
    pub fn new(selectors: Vec<(String, u64)>) -> Self {
        Self {
            selectors,
            bodies: BTreeMap::new(),
        }
    }

    /// Selector names.
    pub fn selector_names(&self) -> Vec<String> {
        self.selectors.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Every key the selectors can take.
    pub fn keys(&self) -> Vec<Vec<u64>> {
        let cards: Vec<u64> = self.selectors.iter().map(|(_, c)| *c).collect();
        product_keys(&cards)
    }

    /// Set the body for `key`.
    pub fn insert(&mut self, key: Vec<u64>, body: Vec<Instruction>) {
        self.bodies.insert(key, body);
    }

    /// Check that every key has a body.
    pub fn validate(&self) -> RewardResult<()> {
        for key in self.keys() {
            if !self.bodies.contains_key(&key) {
                return Err(RewardError::MissingBranchBody {
                    selectors: self.selector_names(),
                    key,
                });
            }
        }
        Ok(())
    }

    /// Append the table to `circuit` as one switch, or inline when there are
    /// no selectors.
    pub fn lower(mut self, circuit: &mut Circuit) -> RewardResult<()> {
        self.validate()?;
        if self.selectors.is_empty() {
            for inst in self.bodies.remove(&Vec::new()).unwrap_or_default() {
                circuit.append(inst)?;
            }
            return Ok(());
        }
        let mut op = SwitchOp::new(self.selector_names());
        for key in self.keys() {
            let body = self.bodies.remove(&key).unwrap_or_default();
            op.add_case(key, body)?;
        }
        circuit.switch(op)?;
        Ok(())
    }
}

/// A compiled real-time probe program.
#[derive(Debug, Clone)]
pub struct RealTimeProgram {
    circuit: Circuit,
    input_state_vars: Vec<String>,
    context_var: Option<String>,
    n_reps_var: Option<String>,
    num_contexts: usize,
    n_reps: Vec<usize>,
    library: InputStateLibrary,
    num_inverses: usize,
}

impl RealTimeProgram {
    /// The program circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Input-state selectors, one per causal-cone qubit.
    pub fn input_state_vars(&self) -> &[String] {
        &self.input_state_vars
    }

    /// Context selector, present with more than one context.
    pub fn context_var(&self) -> Option<&str> {
        self.context_var.as_deref()
    }

    /// Repetition selector, present with more than one repetition count.
    pub fn n_reps_var(&self) -> Option<&str> {
        self.n_reps_var.as_deref()
    }

    /// States per causal-cone qubit.
    pub fn cardinality(&self) -> usize {
        self.library.cardinality()
    }

    /// Selectable repetition counts.
    pub fn n_reps(&self) -> &[usize] {
        &self.n_reps
    }

    /// Number of context circuits.
    pub fn num_contexts(&self) -> usize {
        self.num_contexts
    }

    /// Number of distinct inverses embedded.
    pub fn num_inverses(&self) -> usize {
        self.num_inverses
    }

    /// Number of causal-cone qubits.
    pub fn causal_cone_size(&self) -> usize {
        self.input_state_vars.len()
    }

    /// Input values selecting one branch.
    pub fn bindings(
        &self,
        input_indices: &[usize],
        context: usize,
        n_reps_index: usize,
    ) -> RewardResult<Vec<(String, f64)>> {
        if input_indices.len() != self.input_state_vars.len() {
            return Err(RewardError::Configuration(format!(
                "{} input-state indices for {} causal-cone qubits",
                input_indices.len(),
                self.input_state_vars.len()
            )));
        }
        if let Some(&bad) = input_indices.iter().find(|&&i| i >= self.cardinality()) {
            return Err(RewardError::Configuration(format!(
                "input state {bad} out of range for {} states",
                self.cardinality()
            )));
        }
        if context >= self.num_contexts {
            return Err(RewardError::Configuration(format!(
                "context {context} out of range for {} contexts",
                self.num_contexts
            )));
        }
        if n_reps_index >= self.n_reps.len() {
            return Err(RewardError::Configuration(format!(
                "repetition index {n_reps_index} out of range for {} counts",
                self.n_reps.len()
            )));
        }

        let mut values: Vec<(String, f64)> = self
            .input_state_vars
            .iter()
            .cloned()
            .zip(input_indices.iter().map(|&i| i as f64))
            .collect();
        if let Some(var) = &self.context_var {
            values.push((var.clone(), context as f64));
        }
        if let Some(var) = &self.n_reps_var {
            values.push((var.clone(), n_reps_index as f64));
        }
        Ok(values)
    }

    /// One probe per input-state sample, all running the program.
    pub fn reward_data(
        &self,
        samples: &[Vec<usize>],
        context: usize,
        n_reps_index: usize,
        params: &ParameterBatch,
        shots: usize,
    ) -> RewardResult<CafeRewardDataList> {
        let cone_size = self.causal_cone_size();
        let mut items = Vec::with_capacity(samples.len());
        for sample in samples {
            let mut values = params.clone();
            for (name, value) in self.bindings(sample, context, n_reps_index)? {
                values = values.with_column(name, value);
            }
            let input = self.library.product_state(sample)?;
            items.push(CafeRewardData {
                pub_: SamplerPub::new(self.circuit.clone(), values, shots),
                input_circuit: input.circuit,
                input_indices: input.indices,
                n_reps: self.n_reps[n_reps_index],
                inverse: None,
                causal_cone_qubit_indices: (0..cone_size).collect(),
                causal_cone_size: cone_size,
                measured_width: cone_size,
            });
        }
        CafeRewardDataList::new(items)
    }
}

/// Builds [`RealTimeProgram`]s.
pub struct RealTimeSynthesizer<'a> {
    inverter: ExactInverter<'a>,
    transpiler: &'a dyn Transpiler,
    skip_transpilation: bool,
}

impl<'a> RealTimeSynthesizer<'a> {
    /// Create a synthesizer from a simulator and a device transpiler.
    pub fn new(simulator: &'a dyn UnitaryBackend, transpiler: &'a dyn Transpiler) -> Self {
        Self {
            inverter: ExactInverter::new(simulator, transpiler),
            transpiler,
            skip_transpilation: false,
        }
    }

    /// Leave the program on logical qubits.
    #[must_use]
    pub fn with_skip_transpilation(mut self, skip: bool) -> Self {
        self.skip_transpilation = skip;
        self
    }

    /// Build the program for `contexts` on `target`.
    #[instrument(skip_all, fields(contexts = contexts.len(), n_reps = n_reps.len()))]
    pub fn synthesize(
        &self,
        contexts: &[ContextCircuit],
        target: &GateTarget,
        library: &InputStateLibrary,
        n_reps: &[usize],
    ) -> RewardResult<RealTimeProgram> {
        let first = contexts.first().ok_or_else(|| {
            RewardError::Configuration("a real-time program needs at least one context".to_string())
        })?;
        if n_reps.is_empty() || n_reps.len() > MAX_REPETITION_COUNTS || n_reps.contains(&0) {
            return Err(RewardError::Configuration(format!(
                "repetition counts {n_reps:?} must be 1 to {MAX_REPETITION_COUNTS} positive values"
            )));
        }
        let qubits = first.circuit().qubit_ids();
        for other in &contexts[1..] {
            if other.circuit().qubit_ids() != qubits {
                return Err(RewardError::InconsistentContexts {
                    first: first.name().to_string(),
                    other: other.name().to_string(),
                });
            }
        }
        let baselines = contexts
            .iter()
            .map(ContextCircuit::baseline)
            .collect::<RewardResult<Vec<_>>>()?;

        let cone = target.causal_cone_qubits();
        let cardinality = library.cardinality();
        let mut program = first.circuit().copy_empty_like("cafe_real_time");
        program.set_global_phase(0.0);
        let meas = Self::measurement_bits(&mut program, cone.len())?;

        let input_state_vars: Vec<String> = (0..cone.len()).map(input_state_var).collect();
        for var in &input_state_vars {
            program.add_input(var.clone(), selector_width(cardinality))?;
        }
        let mut cycle_selectors = Vec::new();
        let context_var = (contexts.len() > 1).then(|| CONTEXT_VAR.to_string());
        if let Some(var) = &context_var {
            program.add_input(var.clone(), selector_width(contexts.len()))?;
            cycle_selectors.push((var.clone(), contexts.len() as u64));
        }
        let n_reps_var = (n_reps.len() > 1).then(|| N_REPS_VAR.to_string());
        if let Some(var) = &n_reps_var {
            program.add_input(var.clone(), N_REPS_BITS)?;
            cycle_selectors.push((var.clone(), n_reps.len() as u64));
        }
        // Splits a cycle key into (context index, repetition index).
        let split = |key: &[u64]| -> (usize, usize) {
            let mut values = key.iter().map(|&v| v as usize);
            let c = if context_var.is_some() { values.next().unwrap_or(0) } else { 0 };
            let r = if n_reps_var.is_some() { values.next().unwrap_or(0) } else { 0 };
            (c, r)
        };

        for &q in &qubits {
            program.reset(q)?;
        }

        // Input-state preparation.
        for (k, &q) in cone.iter().enumerate() {
            let mut table = BranchTable::new(vec![(input_state_vars[k].clone(), cardinality as u64)]);
            for i in 0..cardinality {
                let prep = Self::on_qubit(&library.state(i)?.circuit, q)?;
                table.insert(vec![i as u64], body_or_placeholder(&prep, &[q]));
            }
            table.lower(&mut program)?;
        }
        program.barrier(qubits.iter().copied())?;

        // Cycle of the operation under test.
        let mut cycle = BranchTable::new(cycle_selectors.clone());
        for key in cycle.keys() {
            let (c, r) = split(&key);
            let body = contexts[c].circuit().repeat(n_reps[r])?;
            cycle.insert(key, body_or_placeholder(&body, &qubits));
        }
        cycle.lower(&mut program)?;
        program.barrier(qubits.iter().copied())?;

        // Exact inverse of the reference cycle.
        let mut cache = InverseCache::new();
        let mut inverse = BranchTable::new(cycle_selectors);
        for key in inverse.keys() {
            let (c, r) = split(&key);
            let cache_key = InverseKey {
                context: c,
                n_reps: n_reps[r],
            };
            let entry = cache.get_or_try_insert_with(cache_key, || {
                let reference = baselines[c].repeat(n_reps[r])?;
                self.inverter.invert(&reference, cone, target.layout())
            })?;
            let logical = entry.to_logical()?;
            inverse.insert(key, body_or_placeholder(&logical, cone));
        }
        inverse.lower(&mut program)?;
        program.barrier(qubits.iter().copied())?;

        // Undo the input states.
        for (k, &q) in cone.iter().enumerate() {
            let mut table = BranchTable::new(vec![(input_state_vars[k].clone(), cardinality as u64)]);
            for i in 0..cardinality {
                let undo = Self::on_qubit(&library.inverse(i)?, q)?;
                table.insert(vec![i as u64], body_or_placeholder(&undo, &[q]));
            }
            table.lower(&mut program)?;
        }

        program.measure_into(cone, &meas)?;

        let circuit = if self.skip_transpilation {
            program
        } else {
            let options = TranspileOptions::new(PROGRAM_OPTIMIZATION_LEVEL)
                .with_initial_layout(target.layout().clone())
                .with_control_flow(true);
            self.transpiler.transpile(&program, &options)?
        };
        info!(
            "Real-time program over {} context(s), {} repetition count(s), {} inverse(s): {} ops",
            contexts.len(),
            n_reps.len(),
            cache.len(),
            circuit.dag().num_ops()
        );

        Ok(RealTimeProgram {
            circuit,
            input_state_vars,
            context_var,
            n_reps_var,
            num_contexts: contexts.len(),
            n_reps: n_reps.to_vec(),
            library: library.clone(),
            num_inverses: cache.len(),
        })
    }

    /// Classical bits of the `meas` register, adding it when absent.
    fn measurement_bits(program: &mut Circuit, cone_size: usize) -> RewardResult<Vec<ClbitId>> {
        let mut existing: Vec<(u32, ClbitId)> = program
            .clbits()
            .iter()
            .filter(|c| c.register_name() == MEASUREMENT_REGISTER)
            .map(|c| (c.index.unwrap_or(0), c.id))
            .collect();
        if existing.is_empty() {
            let size = u32::try_from(cone_size).map_err(|_| {
                RewardError::Configuration(format!("causal cone of {cone_size} qubits is too wide"))
            })?;
            return Ok(program.add_creg(MEASUREMENT_REGISTER, size));
        }
        if existing.len() != cone_size {
            return Err(RewardError::RegisterSizeMismatch {
                register: MEASUREMENT_REGISTER.to_string(),
                expected: cone_size,
                found: existing.len(),
            });
        }
        existing.sort_unstable();
        debug!("Reusing existing '{}' register", MEASUREMENT_REGISTER);
        Ok(existing.into_iter().map(|(_, id)| id).collect())
    }

    /// A one-qubit circuit moved onto `qubit`.
    fn on_qubit(circuit: &Circuit, qubit: QubitId) -> RewardResult<Circuit> {
        let map: FxHashMap<QubitId, QubitId> = circuit
            .qubit_ids()
            .into_iter()
            .map(|q| (q, qubit))
            .collect();
        let empty = FxHashMap::default();
        let mut moved = Circuit::with_qubits(circuit.name(), [qubit], 0);
        for inst in circuit.instructions() {
            moved.append(inst.remap(&map, &empty))?;
        }
        Ok(moved)
    }
}
