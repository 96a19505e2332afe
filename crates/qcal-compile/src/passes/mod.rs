//! Built-in compilation passes.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: Target-agnostic passes that operate purely on DAG structure
//! - [`target`]: Target-specific passes that require device properties

pub mod agnostic;
pub mod target;

pub use agnostic::{CancelCX, Optimize1qGates, RemoveFinalMeasurements};
pub use target::{ApplyLayout, TrivialLayout, UnitarySynthesis};
