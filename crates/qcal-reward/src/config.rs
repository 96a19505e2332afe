//! Reward configuration.
//!
//! Loaded from YAML:
//!
//! ```yaml
//! execution:
//!   batch_size: 32
//!   n_shots: 1000
//!   sampling_paulis: 20
//!   n_reps: [1, 3, 5]
//!   control_flow_enabled: true
//!   seed: 42
//! cafe:
//!   input_states_choice: pauli6
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::input_states::InputStateFamily;

/// Largest number of repetition counts a real-time program can select from.
pub const MAX_REPETITION_COUNTS: usize = 256;

/// Complete reward configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Sampling and execution settings.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// CAFE-specific settings.
    #[serde(default)]
    pub cafe: CafeConfig,
}

/// Execution settings shared by every reward computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of actions evaluated per reward call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Shots per probe.
    #[serde(default = "default_n_shots")]
    pub n_shots: usize,

    /// Input states drawn (with replacement) per reward call.
    #[serde(default = "default_sampling_paulis")]
    pub sampling_paulis: usize,

    /// Allowed repetition counts of the cycle circuit.
    #[serde(default = "default_n_reps")]
    pub n_reps: Vec<usize>,

    /// Index of the repetition count in use.
    #[serde(default)]
    pub n_reps_index: usize,

    /// Build a single real-time program instead of one circuit per probe.
    #[serde(default)]
    pub control_flow_enabled: bool,

    /// Seed of the 2-design input states, and the value callers pass to
    /// reseed input-state sampling.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// CAFE reward settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CafeConfig {
    /// Input-state family used for probes.
    #[serde(default)]
    pub input_states_choice: InputStateFamily,

    /// Initial seed of the input-state sampler. The sampler advances across
    /// reward calls until it is reseeded.
    #[serde(default = "default_seed")]
    pub input_states_seed: u64,
}

impl Default for CafeConfig {
    fn default() -> Self {
        CafeConfig {
            input_states_choice: InputStateFamily::default(),
            input_states_seed: default_seed(),
        }
    }
}

fn default_batch_size() -> usize {
    1
}

fn default_n_shots() -> usize {
    1000
}

fn default_sampling_paulis() -> usize {
    10
}

fn default_n_reps() -> Vec<usize> {
    vec![1]
}

fn default_seed() -> u64 {
    2000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            batch_size: default_batch_size(),
            n_shots: default_n_shots(),
            sampling_paulis: default_sampling_paulis(),
            n_reps: default_n_reps(),
            n_reps_index: 0,
            control_flow_enabled: false,
            seed: default_seed(),
        }
    }
}

impl ExecutionConfig {
    /// Repetition count currently in use.
    ///
    /// Falls back to 1 when the index is out of range; [`validate`](Self::validate)
    /// rejects that case.
    pub fn current_n_reps(&self) -> usize {
        self.n_reps.get(self.n_reps_index).copied().unwrap_or(1)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_shots == 0 {
            return Err(ConfigError::ValidationError(
                "n_shots must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.sampling_paulis == 0 {
            return Err(ConfigError::ValidationError(
                "sampling_paulis must be greater than 0".to_string(),
            ));
        }
        if self.n_reps.is_empty() {
            return Err(ConfigError::ValidationError(
                "n_reps must hold at least one repetition count".to_string(),
            ));
        }
        if self.n_reps.len() > MAX_REPETITION_COUNTS {
            return Err(ConfigError::ValidationError(format!(
                "at most {MAX_REPETITION_COUNTS} repetition counts are supported, got {}",
                self.n_reps.len()
            )));
        }
        if self.n_reps.contains(&0) {
            return Err(ConfigError::ValidationError(
                "repetition counts must be greater than 0".to_string(),
            ));
        }
        if self.n_reps_index >= self.n_reps.len() {
            return Err(ConfigError::ValidationError(format!(
                "n_reps_index {} out of range for {} repetition counts",
                self.n_reps_index,
                self.n_reps.len()
            )));
        }
        Ok(())
    }
}

impl RewardConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RewardConfig = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_yaml_str(&contents)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.execution.validate()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
