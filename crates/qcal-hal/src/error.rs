//! Error types for the HAL crate.

use thiserror::Error;

/// Errors that can occur in HAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] qcal_ir::IrError),

    /// Invalid circuit.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Circuit exceeds backend capabilities.
    #[error("Circuit exceeds backend capabilities: {0}")]
    CircuitTooLarge(String),

    /// Unsupported feature.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid number of shots.
    #[error("Invalid shots: {0}")]
    InvalidShots(String),

    /// The circuit holds an operation with no unitary.
    #[error("Circuit '{circuit}' is not simulable: {reason}")]
    NotSimulable {
        /// Circuit name.
        circuit: String,
        /// Offending construct.
        reason: String,
    },

    /// A switch reads an input that the parameter row does not bind.
    #[error("Classical input '{0}' has no value")]
    UnboundInput(String),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
