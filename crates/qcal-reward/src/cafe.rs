//! Context-aware fidelity estimation (CAFE).
//!
//! Every probe prepares a product input state on the causal cone, runs the
//! context cycle, then applies the exact inverse of the ideal cycle. With a
//! perfect calibration each probe returns the cone to |0...0>, so the
//! all-zero survival probability is the reward.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

use qcal_compile::{TranspileOptions, Transpiler};
use qcal_hal::{ParameterBatch, Sampler, SamplerPub, UnitaryBackend};
use qcal_ir::{Circuit, QubitId};

use crate::config::{CafeConfig, ExecutionConfig};
use crate::data::{CafeRewardData, CafeRewardDataList};
use crate::error::{RewardError, RewardResult};
use crate::estimator;
use crate::input_states::{InputStateLibrary, InputStateSample, unravel_index};
use crate::inverse::ExactInverter;
use crate::realtime::{RealTimeProgram, RealTimeSynthesizer};
use crate::target::{ContextCircuit, GateTarget};

/// Offset between the execution seed and the input-state sampling seed.
const REWARD_SEED_OFFSET: u64 = 357;

/// Optimization level for static probes.
const PROBE_OPTIMIZATION_LEVEL: u8 = 1;

/// CAFE reward computation.
pub struct CafeReward<'a> {
    config: CafeConfig,
    simulator: &'a dyn UnitaryBackend,
    transpiler: &'a dyn Transpiler,
    rng: StdRng,
}

impl<'a> CafeReward<'a> {
    /// Create a reward from its settings, an exact simulator and a device
    /// transpiler.
    pub fn new(
        config: CafeConfig,
        simulator: &'a dyn UnitaryBackend,
        transpiler: &'a dyn Transpiler,
    ) -> Self {
        Self {
            simulator,
            transpiler,
            rng: StdRng::seed_from_u64(config.input_states_seed),
            config,
        }
    }

    /// Reward settings.
    pub fn config(&self) -> &CafeConfig {
        &self.config
    }

    /// Reseed input-state sampling. Subsequent draws repeat for a repeated
    /// seed.
    pub fn set_reward_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed.wrapping_add(REWARD_SEED_OFFSET));
    }

    /// Input-state library for the configured family.
    pub fn input_states(&self, seed: u64) -> RewardResult<InputStateLibrary> {
        InputStateLibrary::new(self.config.input_states_choice, seed)
    }

    /// Draw up to `count` distinct product input states on `cone_size` qubits.
    ///
    /// Draws are uniform over all product states and duplicates collapse, so
    /// fewer than `count` samples may come back. Samples are in ascending
    /// flat-index order.
    pub fn sample_input_states(
        &mut self,
        library: &InputStateLibrary,
        cone_size: usize,
        count: usize,
    ) -> RewardResult<Vec<Vec<usize>>> {
        let total = library.num_product_states(cone_size)?;
        let mut flat: Vec<u64> = (0..count).map(|_| self.rng.gen_range(0..total)).collect();
        flat.sort_unstable();
        flat.dedup();
        flat.into_iter()
            .map(|f| unravel_index(f, library.cardinality(), cone_size))
            .collect()
    }

    /// Probes for one reward evaluation of `context` at parameter values
    /// `params`.
    ///
    /// Every probe carries the full batch; the repetition count is the one
    /// `execution` currently selects.
    #[instrument(skip_all, fields(circuit = context.name(), batch = params.batch_size()))]
    pub fn get_reward_data(
        &mut self,
        context: &ContextCircuit,
        params: &ParameterBatch,
        target: &GateTarget,
        execution: &ExecutionConfig,
    ) -> RewardResult<CafeRewardDataList> {
        execution.validate()?;
        if params.batch_size() != execution.batch_size {
            return Err(RewardError::BatchSizeMismatch {
                index: 0,
                expected: execution.batch_size,
                found: params.batch_size(),
            });
        }
        let baseline = context.baseline()?;

        let library = self.input_states(execution.seed)?;
        let samples =
            self.sample_input_states(&library, target.causal_cone_size(), execution.sampling_paulis)?;
        debug!(
            "Sampled {} of {} requested input states ({})",
            samples.len(),
            execution.sampling_paulis,
            library.family()
        );

        let data = if execution.control_flow_enabled {
            let program = self.get_real_time_program(
                std::slice::from_ref(context),
                target,
                &library,
                &execution.n_reps,
            )?;
            program.reward_data(
                &samples,
                0,
                execution.n_reps_index,
                params,
                execution.n_shots,
            )?
        } else {
            let n_reps = execution.current_n_reps();
            let inverter = ExactInverter::new(self.simulator, self.transpiler);
            let mut items = Vec::with_capacity(samples.len());
            for sample in &samples {
                let input = library.product_state(sample)?;
                items.push(self.static_probe(
                    context.circuit(),
                    baseline,
                    &input,
                    n_reps,
                    target,
                    &inverter,
                    params,
                    execution.n_shots,
                )?);
            }
            CafeRewardDataList::new(items)?
        };

        info!(
            "Built {} CAFE probe(s) for '{}' with {} shots each",
            data.len(),
            context.name(),
            data.shots()
        );
        Ok(data)
    }

    /// One program covering every input state, context and repetition count.
    pub fn get_real_time_program(
        &self,
        contexts: &[ContextCircuit],
        target: &GateTarget,
        library: &InputStateLibrary,
        n_reps: &[usize],
    ) -> RewardResult<RealTimeProgram> {
        RealTimeSynthesizer::new(self.simulator, self.transpiler)
            .synthesize(contexts, target, library, n_reps)
    }

    /// Run the probes and average their survival probabilities.
    pub fn get_reward_with_primitive(
        &self,
        data: &CafeRewardDataList,
        sampler: &dyn Sampler,
    ) -> RewardResult<Vec<f64>> {
        estimator::get_reward_with_primitive(data, sampler)
    }

    /// Input state, cycle, barrier, inverse of the ideal cycle, measurement.
    #[allow(clippy::too_many_arguments)]
    fn static_probe(
        &self,
        circuit: &Circuit,
        baseline: &Circuit,
        input: &InputStateSample,
        n_reps: usize,
        target: &GateTarget,
        inverter: &ExactInverter<'_>,
        params: &ParameterBatch,
        shots: usize,
    ) -> RewardResult<CafeRewardData> {
        let cone = target.causal_cone_qubits();
        let run_qc = prepare_and_repeat(circuit, &input.circuit, cone, n_reps)?;
        let ref_qc = prepare_and_repeat(baseline, &input.circuit, cone, n_reps)?;

        let inverse = inverter.invert(&ref_qc, cone, target.layout())?;

        let options = TranspileOptions::new(PROBE_OPTIMIZATION_LEVEL)
            .with_initial_layout(target.layout().clone());
        let mut probe = self.transpiler.transpile(&run_qc, &options)?;
        probe.barrier_all()?;
        probe.compose(&inverse.circuit, &inverse.physical_qubits)?;
        probe.measure_all()?;

        let device_qubits = probe.qubit_ids();
        let causal_cone_qubit_indices = target
            .physical_qubits()
            .iter()
            .map(|p| {
                device_qubits.iter().position(|q| q == p).ok_or_else(|| {
                    RewardError::Configuration(format!("probe does not act on device qubit {p}"))
                })
            })
            .collect::<RewardResult<Vec<_>>>()?;

        Ok(CafeRewardData {
            pub_: SamplerPub::new(probe, params.clone(), shots),
            input_circuit: input.circuit.clone(),
            input_indices: input.indices.clone(),
            n_reps,
            inverse: Some(inverse.circuit),
            causal_cone_size: target.causal_cone_size(),
            causal_cone_qubit_indices,
            measured_width: device_qubits.len(),
        })
    }
}

/// `input` on the cone qubits, a barrier, then `circuit` repeated `n_reps`
/// times.
fn prepare_and_repeat(
    circuit: &Circuit,
    input: &Circuit,
    cone: &[QubitId],
    n_reps: usize,
) -> RewardResult<Circuit> {
    let mut out = circuit.copy_empty_like(format!("{}_{}", circuit.name(), input.name()));
    out.set_global_phase(0.0);
    out.compose(input, cone)?;
    out.barrier(cone.iter().copied())?;
    out.compose(&circuit.repeat(n_reps)?, &circuit.qubit_ids())?;
    Ok(out)
}
