//! Sampler backend implementation.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, instrument};

use qcal_hal::{BitArray, DataBin, HalError, HalResult, PubResult, Sampler, SamplerPub};
use qcal_ir::{Circuit, ClbitId, Instruction, InstructionKind, QubitId};

use crate::statevector::Statevector;

/// Default qubit limit for simulation.
const DEFAULT_MAX_QUBITS: usize = 20;

/// An operation after switch resolution, addressed by qubit position.
enum FlatOp<'a> {
    Gate(&'a qcal_ir::GateKind, Vec<usize>),
    Measure(Vec<(usize, ClbitId)>),
    Reset(usize),
}

/// Where each classical bit lands in the result registers.
struct RegisterLayout {
    /// Register names with their widths.
    registers: Vec<(String, usize)>,
    /// Clbit to (register index, bit position).
    slots: FxHashMap<ClbitId, (usize, usize)>,
}

impl RegisterLayout {
    fn new(circuit: &Circuit) -> Self {
        let mut registers: Vec<(String, usize)> = Vec::new();
        let mut slots = FxHashMap::default();
        for clbit in circuit.clbits() {
            let name = clbit.register_name();
            let reg = match registers.iter().position(|(n, _)| n == name) {
                Some(r) => r,
                None => {
                    registers.push((name.to_string(), 0));
                    registers.len() - 1
                }
            };
            let pos = clbit.index.map_or(registers[reg].1, |i| i as usize);
            registers[reg].1 = registers[reg].1.max(pos + 1);
            slots.insert(clbit.id, (reg, pos));
        }
        Self { registers, slots }
    }

    fn empty_samples(&self, shots: usize) -> Vec<Vec<u64>> {
        vec![vec![0; shots]; self.registers.len()]
    }

    fn record(&self, samples: &mut [Vec<u64>], shot: usize, clbit: ClbitId, value: bool) {
        if let Some(&(reg, pos)) = self.slots.get(&clbit) {
            let word = &mut samples[reg][shot];
            if value {
                *word |= 1 << pos;
            } else {
                *word &= !(1 << pos);
            }
        }
    }

    fn into_bin(&self, samples: Vec<Vec<u64>>) -> HalResult<DataBin> {
        let mut bin = DataBin::new();
        for ((name, width), shots) in self.registers.iter().zip(samples) {
            bin.insert(name.clone(), BitArray::from_samples(shots, *width)?);
        }
        Ok(bin)
    }
}

/// Noiseless statevector sampler.
///
/// Each parameter row is bound, switches are resolved from the row's
/// classical input values, and the resulting program is simulated. Circuits
/// whose measurements are all terminal are simulated once and sampled;
/// mid-circuit measurement or reset of a used qubit falls back to one
/// trajectory per shot.
pub struct StatevectorSampler {
    rng: Mutex<StdRng>,
    max_qubits: usize,
}

impl StatevectorSampler {
    /// Create a sampler seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            max_qubits: DEFAULT_MAX_QUBITS,
        }
    }

    /// Create a reproducible sampler.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            max_qubits: DEFAULT_MAX_QUBITS,
        }
    }

    /// Set the qubit limit.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Split a row into gate bindings and classical input values.
    fn split_row(
        circuit: &Circuit,
        row: FxHashMap<String, f64>,
    ) -> HalResult<(FxHashMap<String, f64>, FxHashMap<String, u64>)> {
        let mut params = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        for (name, value) in row {
            match circuit.inputs().iter().find(|i| i.name == name) {
                Some(decl) => {
                    let rounded = value.round();
                    if !rounded.is_finite() || rounded < 0.0 || !decl.fits(rounded as u64) {
                        return Err(HalError::Configuration(format!(
                            "value {value} for input '{name}' does not fit {} bits",
                            decl.bits
                        )));
                    }
                    inputs.insert(name, rounded as u64);
                }
                None => {
                    params.insert(name, value);
                }
            }
        }
        Ok((params, inputs))
    }

    /// Resolve switches against input values and address qubits by position.
    fn flatten<'a>(
        instructions: impl Iterator<Item = &'a Instruction>,
        positions: &FxHashMap<QubitId, usize>,
        inputs: &FxHashMap<String, u64>,
        out: &mut Vec<FlatOp<'a>>,
    ) -> HalResult<()> {
        let pos = |q: &QubitId| {
            positions
                .get(q)
                .copied()
                .ok_or_else(|| HalError::InvalidCircuit(format!("unknown qubit {q}")))
        };
        for inst in instructions {
            match &inst.kind {
                InstructionKind::Gate(gate) => {
                    let qubits = inst.qubits.iter().map(pos).collect::<HalResult<_>>()?;
                    out.push(FlatOp::Gate(&gate.kind, qubits));
                }
                InstructionKind::Measure => {
                    let pairs = inst
                        .qubits
                        .iter()
                        .zip(&inst.clbits)
                        .map(|(q, c)| Ok((pos(q)?, *c)))
                        .collect::<HalResult<_>>()?;
                    out.push(FlatOp::Measure(pairs));
                }
                InstructionKind::Reset => out.push(FlatOp::Reset(pos(&inst.qubits[0])?)),
                InstructionKind::Barrier | InstructionKind::Delay { .. } => {}
                InstructionKind::Switch(op) => {
                    let key = op
                        .selectors
                        .iter()
                        .map(|s| {
                            inputs
                                .get(s)
                                .copied()
                                .ok_or_else(|| HalError::UnboundInput(s.clone()))
                        })
                        .collect::<HalResult<Vec<_>>>()?;
                    if let Some(case) = op.case_for(&key) {
                        Self::flatten(case.body.iter(), positions, inputs, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether the program measures or resets a qubit in the middle.
    ///
    /// Resets of qubits nothing has touched yet are no-ops and do not count.
    fn needs_trajectories(ops: &[FlatOp<'_>], num_qubits: usize) -> bool {
        let mut touched = vec![false; num_qubits];
        let mut measured = vec![false; num_qubits];
        for op in ops {
            match op {
                FlatOp::Gate(_, qubits) => {
                    if qubits.iter().any(|&q| measured[q]) {
                        return true;
                    }
                    for &q in qubits {
                        touched[q] = true;
                    }
                }
                FlatOp::Measure(pairs) => {
                    for &(q, _) in pairs {
                        if measured[q] {
                            return true;
                        }
                        measured[q] = true;
                        touched[q] = true;
                    }
                }
                FlatOp::Reset(q) => {
                    if touched[*q] {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn sample_once(
        ops: &[FlatOp<'_>],
        num_qubits: usize,
        shots: usize,
        layout: &RegisterLayout,
        rng: &mut StdRng,
    ) -> HalResult<Vec<Vec<u64>>> {
        let mut sv = Statevector::new(num_qubits);
        let mut measured = Vec::new();
        for op in ops {
            match op {
                FlatOp::Gate(gate, qubits) => sv.apply_gate(gate, qubits)?,
                FlatOp::Measure(pairs) => measured.extend(pairs.iter().copied()),
                FlatOp::Reset(_) => {}
            }
        }

        let cumulative = sv.cumulative_probabilities();
        let mut samples = layout.empty_samples(shots);
        for shot in 0..shots {
            let outcome = Statevector::sample_from(&cumulative, rng);
            for &(q, clbit) in &measured {
                layout.record(&mut samples, shot, clbit, outcome >> q & 1 == 1);
            }
        }
        Ok(samples)
    }

    fn sample_trajectories(
        ops: &[FlatOp<'_>],
        num_qubits: usize,
        shots: usize,
        layout: &RegisterLayout,
        rng: &mut StdRng,
    ) -> HalResult<Vec<Vec<u64>>> {
        let mut samples = layout.empty_samples(shots);
        for shot in 0..shots {
            let mut sv = Statevector::new(num_qubits);
            for op in ops {
                match op {
                    FlatOp::Gate(gate, qubits) => sv.apply_gate(gate, qubits)?,
                    FlatOp::Measure(pairs) => {
                        for &(q, clbit) in pairs {
                            let bit = sv.measure(q, rng);
                            layout.record(&mut samples, shot, clbit, bit);
                        }
                    }
                    FlatOp::Reset(q) => sv.reset(*q, rng),
                }
            }
        }
        Ok(samples)
    }

    fn run_pub(&self, pub_: &SamplerPub, rng: &mut StdRng) -> HalResult<PubResult> {
        pub_.validate()?;
        let circuit = &pub_.circuit;
        let num_qubits = circuit.num_qubits();
        if num_qubits > self.max_qubits {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but simulator only supports {}",
                num_qubits, self.max_qubits
            )));
        }

        let positions: FxHashMap<QubitId, usize> = circuit
            .qubit_ids()
            .into_iter()
            .enumerate()
            .map(|(i, q)| (q, i))
            .collect();
        let layout = RegisterLayout::new(circuit);

        let mut data = Vec::with_capacity(pub_.parameter_values.batch_size());
        for row in 0..pub_.parameter_values.batch_size() {
            let values = pub_
                .parameter_values
                .row_bindings(row)
                .ok_or_else(|| HalError::Configuration(format!("missing parameter row {row}")))?;
            let (params, inputs) = Self::split_row(circuit, values)?;
            let bound = circuit.bind_parameters(&params)?;

            let mut ops = Vec::new();
            Self::flatten(bound.instructions(), &positions, &inputs, &mut ops)?;

            let samples = if Self::needs_trajectories(&ops, num_qubits) {
                debug!("Row {} of '{}' runs per-shot trajectories", row, circuit.name());
                Self::sample_trajectories(&ops, num_qubits, pub_.shots, &layout, rng)?
            } else {
                Self::sample_once(&ops, num_qubits, pub_.shots, &layout, rng)?
            };
            data.push(layout.into_bin(samples)?);
        }
        Ok(PubResult::new(data))
    }
}

impl Default for StatevectorSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for StatevectorSampler {
    fn name(&self) -> &str {
        "statevector_sampler"
    }

    #[instrument(skip_all, fields(pubs = pubs.len()))]
    fn run(&self, pubs: &[SamplerPub]) -> HalResult<Vec<PubResult>> {
        let start = Instant::now();
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let results = pubs
            .iter()
            .map(|p| self.run_pub(p, &mut rng))
            .collect::<HalResult<Vec<_>>>()?;

        debug!("Sampled {} pubs in {:?}", pubs.len(), start.elapsed());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_hal::ParameterBatch;
    use qcal_ir::{ParameterExpression, StandardGate, SwitchOp};

    fn run_one(sampler: &StatevectorSampler, circuit: Circuit, batch: ParameterBatch) -> PubResult {
        let pubs = [SamplerPub::new(circuit, batch, 500)];
        sampler.run(&pubs).unwrap().remove(0)
    }

    #[test]
    fn test_bell_counts() {
        let mut circuit = Circuit::bell().unwrap();
        circuit.measure_all().unwrap();

        let result = run_one(
            &StatevectorSampler::with_seed(1),
            circuit,
            ParameterBatch::empty(1),
        );
        let counts = result.data[0].register("meas").unwrap().get_counts();
        let count = |key: &str| counts.get(key).copied().unwrap_or(0);
        assert_eq!(count("00") + count("11"), 500);
    }

    #[test]
    fn test_parameter_rows() {
        let mut circuit = Circuit::with_size("rx", 1, 0);
        circuit
            .rx(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();
        circuit.measure_all().unwrap();

        let batch = ParameterBatch::new(
            vec!["theta".into()],
            vec![vec![0.0], vec![std::f64::consts::PI]],
        )
        .unwrap();
        let result = run_one(&StatevectorSampler::with_seed(2), circuit, batch);

        assert_eq!(result.batch_size(), 2);
        let zeros = |bin: &DataBin| bin.register("meas").unwrap().get_int_counts().get(&0).copied();
        assert_eq!(zeros(&result.data[0]), Some(500));
        assert_eq!(zeros(&result.data[1]), None);
    }

    #[test]
    fn test_switch_dispatch_and_unmatched_key() {
        let mut circuit = Circuit::with_size("sw", 1, 0);
        circuit.add_input("k", 2).unwrap();
        let op = SwitchOp::new(["k"])
            .with_case(
                vec![1],
                vec![Instruction::single_qubit_gate(StandardGate::X, QubitId(0))],
            )
            .unwrap();
        circuit.switch(op).unwrap();
        circuit.measure_all().unwrap();

        let batch = ParameterBatch::new(vec!["k".into()], vec![vec![1.0], vec![3.0]]).unwrap();
        let result = run_one(&StatevectorSampler::with_seed(3), circuit, batch);

        let ones = |bin: &DataBin| bin.register("meas").unwrap().get_int_counts().get(&1).copied();
        assert_eq!(ones(&result.data[0]), Some(500));
        assert_eq!(ones(&result.data[1]), None);
    }

    #[test]
    fn test_mid_circuit_reset_uses_trajectories() {
        let mut circuit = Circuit::with_size("reset", 1, 0);
        circuit.x(QubitId(0)).unwrap();
        circuit.reset(QubitId(0)).unwrap();
        circuit.measure_all().unwrap();

        let result = run_one(
            &StatevectorSampler::with_seed(4),
            circuit,
            ParameterBatch::empty(1),
        );
        let bits = result.data[0].register("meas").unwrap();
        assert_eq!(bits.get_int_counts().get(&0).copied(), Some(500));
    }

    #[test]
    fn test_too_many_qubits() {
        let sampler = StatevectorSampler::with_seed(5).with_max_qubits(2);
        let circuit = Circuit::with_size("big", 3, 0);
        let pubs = [SamplerPub::new(circuit, ParameterBatch::empty(1), 10)];
        assert!(matches!(sampler.run(&pubs), Err(HalError::CircuitTooLarge(_))));
    }
}
