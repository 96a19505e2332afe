//! Per-shot sampler results.
//!
//! A [`PubResult`] holds one [`DataBin`] per batch element. Each bin maps a
//! classical register name to a [`BitArray`] of shots. Bit `k` of a shot is
//! the register's `k`-th classical bit; string forms print the highest bit
//! first.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HalError, HalResult};

/// Maximum register width a [`BitArray`] can hold.
pub const MAX_BITS: usize = 64;

/// Shots of one classical register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitArray {
    samples: Vec<u64>,
    num_bits: usize,
}

impl BitArray {
    /// Create a bit array from packed shot outcomes.
    pub fn from_samples(samples: Vec<u64>, num_bits: usize) -> HalResult<Self> {
        if num_bits > MAX_BITS {
            return Err(HalError::Unsupported(format!(
                "registers wider than {MAX_BITS} bits ({num_bits})"
            )));
        }
        if num_bits < MAX_BITS {
            if let Some(bad) = samples.iter().find(|&&s| s >> num_bits != 0) {
                return Err(HalError::Backend(format!(
                    "outcome {bad} does not fit in {num_bits} bits"
                )));
            }
        }
        Ok(Self { samples, num_bits })
    }

    /// Number of shots.
    pub fn num_shots(&self) -> usize {
        self.samples.len()
    }

    /// Register width.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Packed outcomes in shot order.
    pub fn samples(&self) -> &[u64] {
        &self.samples
    }

    /// Occurrences of each integer outcome.
    pub fn get_int_counts(&self) -> FxHashMap<u64, usize> {
        let mut counts = FxHashMap::default();
        for &s in &self.samples {
            *counts.entry(s).or_insert(0) += 1;
        }
        counts
    }

    /// Occurrences of each outcome as a bitstring, highest bit first.
    pub fn get_counts(&self) -> FxHashMap<String, usize> {
        self.get_int_counts()
            .into_iter()
            .map(|(k, v)| (format!("{:0width$b}", k, width = self.num_bits), v))
            .collect()
    }

    /// Keep the shots whose bits at `indices` equal `values`.
    ///
    /// The result keeps the full register width.
    pub fn postselect(&self, indices: &[usize], values: &[bool]) -> HalResult<BitArray> {
        if indices.len() != values.len() {
            return Err(HalError::Configuration(format!(
                "postselect got {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.num_bits) {
            return Err(HalError::Configuration(format!(
                "postselect index {bad} out of range for {} bits",
                self.num_bits
            )));
        }

        let (mask, wanted) = indices
            .iter()
            .zip(values)
            .fold((0u64, 0u64), |(m, w), (&i, &v)| {
                (m | 1 << i, w | u64::from(v) << i)
            });
        let samples: Vec<u64> = self
            .samples
            .iter()
            .copied()
            .filter(|s| s & mask == wanted)
            .collect();
        debug!(
            "Post-selection on {} bit(s) kept {} of {} shots",
            indices.len(),
            samples.len(),
            self.samples.len()
        );
        Ok(BitArray {
            samples,
            num_bits: self.num_bits,
        })
    }
}

/// Registers measured for one batch element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBin {
    registers: FxHashMap<String, BitArray>,
}

impl DataBin {
    /// Create an empty bin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a register's shots.
    pub fn insert(&mut self, name: impl Into<String>, bits: BitArray) {
        self.registers.insert(name.into(), bits);
    }

    /// Shots of the named register.
    pub fn register(&self, name: &str) -> Option<&BitArray> {
        self.registers.get(name)
    }

    /// Register names, sorted.
    pub fn register_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.registers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Result of one sampler pub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubResult {
    /// One bin per batch element, in row order.
    pub data: Vec<DataBin>,
}

impl PubResult {
    /// Create a result from its bins.
    pub fn new(data: Vec<DataBin>) -> Self {
        Self { data }
    }

    /// Number of batch elements.
    pub fn batch_size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_print_high_bit_first() {
        let bits = BitArray::from_samples(vec![0b001, 0b001, 0b100], 3).unwrap();
        let counts = bits.get_counts();
        assert_eq!(counts["001"], 2);
        assert_eq!(counts["100"], 1);
        assert_eq!(bits.get_int_counts()[&1], 2);
    }

    #[test]
    fn test_postselect() {
        let bits = BitArray::from_samples(vec![0b00, 0b01, 0b10, 0b11, 0b10], 2).unwrap();

        let high_set = bits.postselect(&[1], &[true]).unwrap();
        assert_eq!(high_set.samples(), &[0b10, 0b11, 0b10]);
        assert_eq!(high_set.num_bits(), 2);

        let zeros = bits.postselect(&[0, 1], &[false, false]).unwrap();
        assert_eq!(zeros.num_shots(), 1);

        assert!(bits.postselect(&[2], &[false]).is_err());
        assert!(bits.postselect(&[0], &[]).is_err());
    }

    #[test]
    fn test_outcome_must_fit_width() {
        assert!(BitArray::from_samples(vec![4], 2).is_err());
        assert!(BitArray::from_samples(vec![u64::MAX], 64).is_ok());
        assert!(BitArray::from_samples(vec![], 65).is_err());
    }
}
