//! Target-specific compilation passes.
//!
//! These passes read the device from the [`PropertySet`](crate::PropertySet)
//! and produce circuits expressed on physical qubits.

pub mod layout;
pub mod synthesis;

pub use layout::{ApplyLayout, TrivialLayout};
pub use synthesis::UnitarySynthesis;
