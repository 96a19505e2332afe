//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] qcal_ir::IrError),

    /// Missing coupling map for layout.
    #[error("Missing coupling map for layout")]
    MissingCouplingMap,

    /// Missing layout when lowering to physical qubits.
    #[error("Missing layout for physical lowering")]
    MissingLayout,

    /// The layout leaves a circuit qubit unplaced.
    #[error("Layout does not place qubit {0}")]
    IncompleteLayout(qcal_ir::QubitId),

    /// The layout places a qubit outside the device.
    #[error("Layout maps {logical} to physical qubit {physical}, device has {available}")]
    PhysicalQubitOutOfRange {
        /// Logical qubit.
        logical: qcal_ir::QubitId,
        /// Requested physical index.
        physical: u32,
        /// Device size.
        available: u32,
    },

    /// Circuit contains runtime control flow but the caller asked for it to be removed.
    #[error("Circuit '{0}' contains runtime control flow that cannot be lowered")]
    ControlFlowNotPreserved(String),

    /// Circuit too large for target.
    #[error("Circuit requires {required} qubits but target only has {available}")]
    CircuitTooLarge { required: usize, available: u32 },
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
