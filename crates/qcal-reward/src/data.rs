//! Probes and the bookkeeping needed to read their results.

use qcal_hal::SamplerPub;
use qcal_ir::Circuit;

use crate::error::{RewardError, RewardResult};

/// One probe of a CAFE reward computation.
#[derive(Debug, Clone)]
pub struct CafeRewardData {
    /// Executable circuit, parameter batch and shot count.
    pub pub_: SamplerPub,
    /// Input-state preparation on the causal cone.
    pub input_circuit: Circuit,
    /// Input-state index per causal-cone qubit.
    pub input_indices: Vec<usize>,
    /// Repetition count of the cycle circuit.
    pub n_reps: usize,
    /// Resynthesized inverse, when the probe embeds one directly.
    pub inverse: Option<Circuit>,
    /// Positions of the causal-cone qubits within the `meas` register.
    pub causal_cone_qubit_indices: Vec<usize>,
    /// Number of causal-cone qubits.
    pub causal_cone_size: usize,
    /// Width of the `meas` register.
    pub measured_width: usize,
}

impl CafeRewardData {
    /// Whether other measured bits must be conditioned away.
    pub fn needs_postselection(&self) -> bool {
        self.measured_width != self.causal_cone_size
    }

    /// Shots per batch element.
    pub fn shots(&self) -> usize {
        self.pub_.shots
    }

    /// Number of batch elements.
    pub fn batch_size(&self) -> usize {
        self.pub_.parameter_values.batch_size()
    }
}

/// Ordered probes of one reward computation.
///
/// Every probe runs the same number of shots on the same batch size.
#[derive(Debug, Clone)]
pub struct CafeRewardDataList {
    items: Vec<CafeRewardData>,
}

impl CafeRewardDataList {
    /// Collect probes, checking shot counts and batch sizes agree.
    pub fn new(items: Vec<CafeRewardData>) -> RewardResult<Self> {
        let list = Self { items };
        list.validate()?;
        Ok(list)
    }

    /// Check the batch preconditions.
    pub fn validate(&self) -> RewardResult<()> {
        let first = self.items.first().ok_or(RewardError::EmptyRewardData)?;
        let (shots, batch_size) = (first.shots(), first.batch_size());
        for (index, item) in self.items.iter().enumerate().skip(1) {
            if item.shots() != shots {
                return Err(RewardError::ShotCountMismatch {
                    index,
                    expected: shots,
                    found: item.shots(),
                });
            }
            if item.batch_size() != batch_size {
                return Err(RewardError::BatchSizeMismatch {
                    index,
                    expected: batch_size,
                    found: item.batch_size(),
                });
            }
        }
        Ok(())
    }

    /// The probes, in synthesis order.
    pub fn items(&self) -> &[CafeRewardData] {
        &self.items
    }

    /// Sampler pubs, in synthesis order.
    pub fn pubs(&self) -> Vec<SamplerPub> {
        self.items.iter().map(|item| item.pub_.clone()).collect()
    }

    /// Shots per probe.
    pub fn shots(&self) -> usize {
        self.items.first().map_or(0, CafeRewardData::shots)
    }

    /// Batch size shared by every probe.
    pub fn batch_size(&self) -> usize {
        self.items.first().map_or(0, CafeRewardData::batch_size)
    }

    /// Number of probes.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no probes.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the probes.
    pub fn iter(&self) -> impl Iterator<Item = &CafeRewardData> {
        self.items.iter()
    }
}
