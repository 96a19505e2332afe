//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit:?} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit:?} not found in circuit{}", format_gate_context(.gate_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Invalid DAG structure.
    #[error("Invalid DAG structure: {0}")]
    InvalidDag(String),

    /// Invalid node index.
    #[error("Invalid node index")]
    InvalidNode,

    /// Gate requires different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Parameter is unbound.
    #[error("Parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit:?} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// A switch reads a classical input the circuit never declared.
    #[error("Classical input '{0}' is not declared in circuit")]
    UndeclaredInput(String),

    /// A classical input was declared twice with different widths.
    #[error("Classical input '{name}' already declared with {existing} bits, requested {requested}")]
    ConflictingInput {
        /// Input name.
        name: String,
        /// Width already declared.
        existing: u32,
        /// Width of the conflicting declaration.
        requested: u32,
    },

    /// A switch case key does not fit its selectors.
    #[error("Invalid switch case {key:?} for selectors {selectors:?}: {reason}")]
    InvalidSwitchCase {
        /// Selector names.
        selectors: Vec<String>,
        /// Offending key.
        key: Vec<u64>,
        /// What is wrong with it.
        reason: String,
    },

    /// Operand count of a composition does not match the composed circuit.
    #[error("Cannot compose a {expected}-qubit circuit onto {got} qubits")]
    ComposeWidthMismatch {
        /// Qubits of the composed circuit.
        expected: usize,
        /// Qubits supplied by the caller.
        got: usize,
    },

    /// Custom matrix has the wrong number of entries.
    #[error("Matrix with {got} entries does not fit a {num_qubits}-qubit gate (expected {expected})")]
    MatrixSizeMismatch {
        /// Gate width.
        num_qubits: u32,
        /// Required length.
        expected: usize,
        /// Supplied length.
        got: usize,
    },

    /// Instruction has no inverse.
    #[error("Instruction '{0}' cannot be inverted")]
    NotInvertible(String),
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
