//! Target-agnostic compilation passes.
//!
//! These passes operate purely on the DAG structure without consulting
//! target properties. They are safe to run on any circuit.

mod cancel;
mod measurement;
mod optimize_1q;

#[cfg(test)]
mod tests;

pub use cancel::CancelCX;
pub use measurement::RemoveFinalMeasurements;
pub use optimize_1q::Optimize1qGates;
