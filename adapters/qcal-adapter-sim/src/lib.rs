//! qcal Local Statevector Simulator
//!
//! This crate implements the [`qcal_hal`] execution traits on a noiseless
//! statevector simulation, exact but limited to ~20 qubits.
//!
//! # Features
//!
//! - **Sampling**: [`StatevectorSampler`] runs batches of pubs, binding
//!   parameters and resolving runtime switches per batch element
//! - **Exact Unitaries**: [`UnitarySimulator`] extracts a circuit's unitary,
//!   global phase included
//! - **Reproducible**: samplers can be seeded
//!
//! # Performance
//!
//! | Qubits | Memory | Simulation Speed |
//! |--------|--------|------------------|
//! | 10 | ~16 KB | Instant |
//! | 15 | ~512 KB | Fast |
//! | 20 | ~16 MB | Moderate |
//!
//! # Example
//!
//! ```rust
//! use qcal_adapter_sim::StatevectorSampler;
//! use qcal_hal::{ParameterBatch, Sampler, SamplerPub};
//! use qcal_ir::Circuit;
//!
//! let mut circuit = Circuit::bell().unwrap();
//! circuit.measure_all().unwrap();
//!
//! let sampler = StatevectorSampler::with_seed(42);
//! let pubs = [SamplerPub::new(circuit, ParameterBatch::empty(1), 1000)];
//! let results = sampler.run(&pubs).unwrap();
//!
//! // Only |00⟩ and |11⟩ appear.
//! let counts = results[0].data[0].register("meas").unwrap().get_counts();
//! assert!(counts.keys().all(|k| k == "00" || k == "11"));
//! ```

mod sampler;
mod statevector;
mod unitary;

pub use sampler::StatevectorSampler;
pub use statevector::Statevector;
pub use unitary::UnitarySimulator;
