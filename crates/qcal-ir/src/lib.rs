//! qcal circuit intermediate representation
//!
//! Core data structures for the circuits that the reward pipeline builds,
//! compiles and executes.
//!
//! # Overview
//!
//! Circuits are stored as a DAG (Directed Acyclic Graph) so compiler passes
//! can rewrite them locally. The high-level [`Circuit`] API wraps the DAG with
//! register names and the runtime classical inputs read by [`SwitchOp`]s.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]; classical bits
//!   carry an optional register name so results can be grouped per register
//! - **Gates**: [`StandardGate`] for built-in gates and [`CustomGate`] for
//!   explicit unitaries
//! - **Parameters**: [`ParameterExpression`] for symbolic angles bound at run time
//! - **Control flow**: [`ClassicalInput`] declarations and multi-selector
//!   [`SwitchOp`] dispatch
//! - **DAG**: [`CircuitDag`] for the internal graph representation
//! - **Circuit**: [`Circuit`] builder with composition, inversion and repetition
//!
//! # Example: Composing a Probe
//!
//! ```rust
//! use qcal_ir::{Circuit, QubitId};
//!
//! let mut cycle = Circuit::with_size("cycle", 2, 0);
//! cycle.h(QubitId(0)).unwrap();
//! cycle.cx(QubitId(0), QubitId(1)).unwrap();
//!
//! let mut probe = Circuit::with_size("probe", 2, 0);
//! probe.x(QubitId(1)).unwrap();
//! probe.barrier_all().unwrap();
//! probe.compose(&cycle.repeat(2).unwrap(), &[QubitId(0), QubitId(1)]).unwrap();
//! probe.compose(&cycle.repeat(2).unwrap().inverse().unwrap(), &[QubitId(0), QubitId(1)]).unwrap();
//! probe.measure_all().unwrap();
//!
//! assert_eq!(probe.num_clbits(), 2);
//! assert_eq!(probe.clbits()[0].register_name(), "meas");
//! ```
//!
//! # Bit Order
//!
//! Throughout the workspace, bit `k` of a basis-state index or of a measured
//! integer refers to the `k`-th qubit (or classical bit) of the list it was
//! taken from.

pub mod circuit;
pub mod control;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use control::{ClassicalInput, SwitchCase, SwitchOp};
pub use dag::{CircuitDag, CircuitLevel, DagEdge, DagNode, NodeIndex, WireId};
pub use error::{IrError, IrResult};
pub use gate::{CustomGate, Gate, GateKind, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::ParameterExpression;
pub use qubit::{Clbit, ClbitId, Qubit, QubitId};
