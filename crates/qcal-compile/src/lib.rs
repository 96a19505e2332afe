//! qcal Compilation Framework
//!
//! This crate lowers [`qcal_ir::Circuit`]s onto a device through a
//! pass-based pipeline. Every pass preserves the circuit's unitary exactly,
//! including its global phase, so compiled circuits can be inverted and
//! compared against their source.
//!
//! # Architecture
//!
//! ```text
//! Input Circuit
//!       │
//!       ▼
//! ┌─────────────┐
//! │ PassManager │ ◄── PropertySet (coupling map, layout)
//! └─────────────┘
//!       │
//!       ├── RemoveFinalMeasurements (optional)
//!       ├── TrivialLayout / ApplyLayout
//!       ├── UnitarySynthesis
//!       └── Optimize1qGates / CancelCX
//!       │
//!       ▼
//! Output Circuit (physical qubits)
//! ```
//!
//! # Example: Transpiling for a Device
//!
//! ```rust
//! use qcal_compile::{CouplingMap, DeviceTranspiler, Layout, TranspileOptions, Transpiler};
//! use qcal_ir::{Circuit, QubitId};
//!
//! let circuit = Circuit::bell().unwrap();
//! let transpiler = DeviceTranspiler::new(CouplingMap::linear(4));
//!
//! let options = TranspileOptions::new(2)
//!     .with_initial_layout(Layout::from_pairs([(QubitId(0), 2), (QubitId(1), 3)]));
//! let compiled = transpiler.transpile(&circuit, &options).unwrap();
//!
//! assert_eq!(compiled.num_qubits(), 4);
//! ```
//!
//! # Optimization Levels
//!
//! | Level | Passes Included |
//! |-------|-----------------|
//! | 0 | Layout, unitary synthesis |
//! | 1 | Same as 0 |
//! | 2 | + 1q merging, CX cancellation |
//! | 3 | + second 1q merging sweep |
//!
//! Circuits holding runtime switches compile at level 1 at most.
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to create custom compilation passes:
//!
//! ```rust
//! use qcal_compile::{Pass, PassKind, CompileResult, PropertySet};
//! use qcal_ir::CircuitDag;
//!
//! struct CountOps;
//!
//! impl Pass for CountOps {
//!     fn name(&self) -> &str { "count_ops" }
//!     fn kind(&self) -> PassKind { PassKind::Analysis }
//!
//!     fn run(&self, dag: &mut CircuitDag, _props: &mut PropertySet) -> CompileResult<()> {
//!         println!("{} ops", dag.num_ops());
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
pub mod manager;
pub mod pass;
pub mod property;
pub mod transpile;
pub mod two_qubit;
pub mod unitary;

// Built-in passes
pub mod passes;

pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use pass::{Pass, PassKind};
pub use property::{CouplingMap, Layout, PropertySet};
pub use transpile::{DeviceTranspiler, TranspileOptions, Transpiler};
pub use two_qubit::{KakDecomposition, Unitary4x4, decompose_two_qubit};
pub use unitary::Unitary2x2;
