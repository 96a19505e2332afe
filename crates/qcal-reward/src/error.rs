//! Error types for reward estimation.

use thiserror::Error;

use qcal_hal::HalError;

use crate::config::ConfigError;

/// Errors that can occur while building or evaluating reward probes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RewardError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] qcal_ir::IrError),

    /// Error from the transpiler.
    #[error("Compilation error: {0}")]
    Compile(#[from] qcal_compile::CompileError),

    /// Error from the execution primitive or simulator.
    #[error("Execution error: {0}")]
    Hal(#[from] HalError),

    /// Error loading or validating configuration.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Unknown input-state family identifier.
    #[error("Invalid input state family '{0}', expected one of: pauli4, pauli6, 2-design")]
    InvalidInputStateFamily(String),

    /// A context circuit was used without its reference circuit.
    #[error("Circuit '{0}' has no baseline circuit attached")]
    MissingBaseline(String),

    /// A classical register does not match the causal cone.
    #[error("Register '{register}' holds {found} bits but {expected} are required")]
    RegisterSizeMismatch {
        /// Register name.
        register: String,
        /// Required width.
        expected: usize,
        /// Actual width.
        found: usize,
    },

    /// Context circuits of one program act on different qubits.
    #[error("Context circuits '{first}' and '{other}' act on different qubits")]
    InconsistentContexts {
        /// Name of the first context.
        first: String,
        /// Name of the offending context.
        other: String,
    },

    /// Invalid probe construction input.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The reference circuit could not be simulated exactly.
    #[error("Exact simulation of '{circuit}' failed: {reason}")]
    Simulation {
        /// Circuit name.
        circuit: String,
        /// Offending construct.
        reason: String,
    },

    /// Probes in one batch disagree on shot count.
    #[error("Probe {index} runs {found} shots, expected {expected}")]
    ShotCountMismatch {
        /// Probe position.
        index: usize,
        /// Shot count of the first probe.
        expected: usize,
        /// Shot count of this probe.
        found: usize,
    },

    /// Probes or results in one batch disagree on batch size.
    #[error("Probe {index} has batch size {found}, expected {expected}")]
    BatchSizeMismatch {
        /// Probe position.
        index: usize,
        /// Expected batch size.
        expected: usize,
        /// Actual batch size.
        found: usize,
    },

    /// A declared branch value of a real-time program has no body.
    #[error("No branch body for {selectors:?} = {key:?}")]
    MissingBranchBody {
        /// Selector names.
        selectors: Vec<String>,
        /// Missing key.
        key: Vec<u64>,
    },

    /// Reward data holds no probes.
    #[error("Reward data holds no probes")]
    EmptyRewardData,

    /// The primitive returned a different number of results than probes.
    #[error("Primitive returned {found} results for {expected} probes")]
    ResultCountMismatch {
        /// Submitted probes.
        expected: usize,
        /// Returned results.
        found: usize,
    },

    /// A result lacks the measurement register.
    #[error("Result has no '{0}' register")]
    MissingRegister(String),
}

/// Coarse classification of a [`RewardError`].
///
/// Every category is fatal to the current reward computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input detected at synthesis time.
    Configuration,
    /// Exact simulation of a reference circuit failed.
    Simulation,
    /// Probes or results violate a batch precondition.
    Consistency,
    /// A collaborator (IR, transpiler, primitive) failed.
    Collaborator,
}

impl RewardError {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_)
            | Self::InvalidInputStateFamily(_)
            | Self::MissingBaseline(_)
            | Self::RegisterSizeMismatch { .. }
            | Self::InconsistentContexts { .. }
            | Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Simulation { .. } | Self::Hal(HalError::NotSimulable { .. }) => {
                ErrorCategory::Simulation
            }
            Self::ShotCountMismatch { .. }
            | Self::BatchSizeMismatch { .. }
            | Self::MissingBranchBody { .. }
            | Self::EmptyRewardData => ErrorCategory::Consistency,
            Self::Ir(_)
            | Self::Compile(_)
            | Self::Hal(_)
            | Self::ResultCountMismatch { .. }
            | Self::MissingRegister(_) => ErrorCategory::Collaborator,
        }
    }
}

/// Result type for reward operations.
pub type RewardResult<T> = Result<T, RewardError>;
