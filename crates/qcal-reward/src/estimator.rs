//! Reward estimation from sampled probes.
//!
//! Each probe yields a survival probability per batch element: the fraction
//! of shots in which every causal-cone bit reads zero. The reward of a batch
//! element is the unweighted mean over probes.

use tracing::{debug, info, instrument};

use qcal_hal::{BitArray, PubResult, Sampler};

use crate::data::{CafeRewardData, CafeRewardDataList};
use crate::error::{RewardError, RewardResult};

/// Register every probe measures into.
pub const MEASUREMENT_REGISTER: &str = "meas";

/// Fraction of shots reading all zeros.
pub fn all_zero_fraction(bits: &BitArray) -> f64 {
    if bits.num_shots() == 0 {
        return 0.0;
    }
    let zeros = bits.samples().iter().filter(|&&s| s == 0).count();
    zeros as f64 / bits.num_shots() as f64
}

/// Fraction of shots whose bits at `indices` all read zero.
pub fn postselected_survival(bits: &BitArray, indices: &[usize]) -> RewardResult<f64> {
    if bits.num_shots() == 0 {
        return Ok(0.0);
    }
    let zeros = vec![false; indices.len()];
    let kept = bits.postselect(indices, &zeros)?;
    Ok(kept.num_shots() as f64 / bits.num_shots() as f64)
}

/// Survival probability of one probe for one batch element.
pub fn survival_probability(bits: &BitArray, probe: &CafeRewardData) -> RewardResult<f64> {
    if bits.num_bits() != probe.measured_width {
        return Err(RewardError::RegisterSizeMismatch {
            register: MEASUREMENT_REGISTER.to_string(),
            expected: probe.measured_width,
            found: bits.num_bits(),
        });
    }
    if probe.needs_postselection() {
        postselected_survival(bits, &probe.causal_cone_qubit_indices)
    } else {
        Ok(all_zero_fraction(bits))
    }
}

/// Mean survival probability per batch element from completed results.
pub fn rewards_from_results(
    data: &CafeRewardDataList,
    results: &[PubResult],
) -> RewardResult<Vec<f64>> {
    data.validate()?;
    if results.len() != data.len() {
        return Err(RewardError::ResultCountMismatch {
            expected: data.len(),
            found: results.len(),
        });
    }
    let batch_size = data.batch_size();
    for (index, result) in results.iter().enumerate() {
        if result.batch_size() != batch_size {
            return Err(RewardError::BatchSizeMismatch {
                index,
                expected: batch_size,
                found: result.batch_size(),
            });
        }
    }

    let mut totals = vec![0.0; batch_size];
    for (index, (probe, result)) in data.iter().zip(results).enumerate() {
        for (total, bin) in totals.iter_mut().zip(&result.data) {
            let bits = bin
                .register(MEASUREMENT_REGISTER)
                .ok_or_else(|| RewardError::MissingRegister(MEASUREMENT_REGISTER.to_string()))?;
            let survival = survival_probability(bits, probe)?;
            debug!("Probe {} {:?}: survival {:.4}", index, probe.input_indices, survival);
            *total += survival;
        }
    }

    let count = data.len() as f64;
    Ok(totals.into_iter().map(|t| t / count).collect())
}

/// Run every probe in one sampler job and return the reward per batch
/// element.
#[instrument(skip_all, fields(sampler = sampler.name(), probes = data.len()))]
pub fn get_reward_with_primitive(
    data: &CafeRewardDataList,
    sampler: &dyn Sampler,
) -> RewardResult<Vec<f64>> {
    data.validate()?;
    let results = sampler.run(&data.pubs())?;
    let rewards = rewards_from_results(data, &results)?;
    info!(
        "Computed rewards for batch of {} from {} probes",
        rewards.len(),
        data.len()
    );
    Ok(rewards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qcal_hal::{DataBin, ParameterBatch, SamplerPub};
    use qcal_ir::Circuit;

    fn probe(measured_width: usize, cone: Vec<usize>) -> CafeRewardData {
        CafeRewardData {
            pub_: SamplerPub::new(Circuit::with_size("p", 1, 0), ParameterBatch::empty(1), 4),
            input_circuit: Circuit::with_size("in", 1, 0),
            input_indices: vec![0; cone.len()],
            n_reps: 1,
            inverse: None,
            causal_cone_size: cone.len(),
            causal_cone_qubit_indices: cone,
            measured_width,
        }
    }

    fn result(samples: Vec<u64>, width: usize) -> PubResult {
        let mut bin = DataBin::new();
        bin.insert(MEASUREMENT_REGISTER, BitArray::from_samples(samples, width).unwrap());
        PubResult::new(vec![bin])
    }

    #[test]
    fn test_direct_survival() {
        let bits = BitArray::from_samples(vec![0, 1, 0, 0], 1).unwrap();
        let p = survival_probability(&bits, &probe(1, vec![0])).unwrap();
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_postselected_survival_is_marginal() {
        // Cone bit 1 of 2: shots 0b00 and 0b01 have it at zero.
        let bits = BitArray::from_samples(vec![0b00, 0b01, 0b10, 0b11], 2).unwrap();
        let p = survival_probability(&bits, &probe(2, vec![1])).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_width_mismatch() {
        let bits = BitArray::from_samples(vec![0], 2).unwrap();
        assert!(matches!(
            survival_probability(&bits, &probe(1, vec![0])),
            Err(RewardError::RegisterSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_rewards_are_means() {
        let data = CafeRewardDataList::new(vec![probe(1, vec![0]), probe(1, vec![0])]).unwrap();
        let results = vec![result(vec![0, 0, 0, 0], 1), result(vec![0, 1, 1, 0], 1)];
        let rewards = rewards_from_results(&data, &results).unwrap();
        assert_eq!(rewards.len(), 1);
        assert!((rewards[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_result_count_mismatch() {
        let data = CafeRewardDataList::new(vec![probe(1, vec![0]), probe(1, vec![0])]).unwrap();
        let results = vec![result(vec![0; 4], 1)];
        assert!(matches!(
            rewards_from_results(&data, &results),
            Err(RewardError::ResultCountMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_missing_register() {
        let data = CafeRewardDataList::new(vec![probe(1, vec![0])]).unwrap();
        let results = vec![PubResult::new(vec![DataBin::new()])];
        assert!(matches!(
            rewards_from_results(&data, &results),
            Err(RewardError::MissingRegister(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_full_width_postselection_matches_direct(
            width in 1usize..=4,
            raw in prop::collection::vec(any::<u64>(), 1..64),
        ) {
            let mask = (1u64 << width) - 1;
            let samples: Vec<u64> = raw.iter().map(|s| s & mask).collect();
            let bits = BitArray::from_samples(samples, width).unwrap();
            let cone: Vec<usize> = (0..width).collect();

            let direct = all_zero_fraction(&bits);
            let selected = postselected_survival(&bits, &cone).unwrap();
            prop_assert!((0.0..=1.0).contains(&direct));
            prop_assert!((direct - selected).abs() < 1e-12);
        }
    }
}
