//! qcal Hardware Abstraction Layer
//!
//! This crate defines the boundary between the reward pipeline and whatever
//! executes its circuits: a sampling primitive that runs batches of pubs and
//! an exact simulator that returns a circuit's unitary.
//!
//! # Overview
//!
//! - [`Sampler`] runs a list of [`SamplerPub`]s as one blocking job.
//! - [`ParameterBatch`] binds gate parameters and classical inputs per batch
//!   element.
//! - [`PubResult`] / [`DataBin`] / [`BitArray`] carry per-shot outcomes and
//!   support counting and post-selection.
//! - [`UnitaryBackend`] extracts exact unitaries for circuit inversion.
//!
//! # Example: Reading Results
//!
//! ```rust
//! use qcal_hal::BitArray;
//!
//! // Four shots of a 2-bit register.
//! let bits = BitArray::from_samples(vec![0b00, 0b01, 0b00, 0b10], 2).unwrap();
//!
//! // Fraction of shots where bit 0 reads zero.
//! let kept = bits.postselect(&[0], &[false]).unwrap();
//! assert_eq!(kept.num_shots(), 3);
//! assert_eq!(bits.get_counts()["00"], 2);
//! ```
//!
//! # Implementing a Custom Sampler
//!
//! ```rust
//! use qcal_hal::{HalResult, PubResult, Sampler, SamplerPub};
//!
//! struct NullSampler;
//!
//! impl Sampler for NullSampler {
//!     fn name(&self) -> &str { "null" }
//!
//!     fn run(&self, pubs: &[SamplerPub]) -> HalResult<Vec<PubResult>> {
//!         Ok(pubs.iter().map(|_| PubResult::default()).collect())
//!     }
//! }
//! ```

pub mod batch;
pub mod error;
pub mod primitive;
pub mod result;

pub use batch::ParameterBatch;
pub use error::{HalError, HalResult};
pub use primitive::{Sampler, SamplerPub, UnitaryBackend};
pub use result::{BitArray, DataBin, PubResult};
