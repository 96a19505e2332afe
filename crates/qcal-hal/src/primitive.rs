//! Execution primitive and exact-simulation traits.
//!
//! # Contract
//!
//! | Trait | Method | Returns |
//! |-------|--------|---------|
//! | [`Sampler`] | `name()` | `&str` |
//! | [`Sampler`] | `run()` | `HalResult<Vec<PubResult>>`, one per pub, in order |
//! | [`UnitaryBackend`] | `unitary()` | `HalResult<Array2<Complex64>>` |
//!
//! Both traits are blocking. A sampler that cannot honour a pub fails the
//! whole call rather than returning partial results.

use ndarray::Array2;
use num_complex::Complex64;

use qcal_ir::Circuit;

use crate::batch::ParameterBatch;
use crate::error::{HalError, HalResult};
use crate::result::PubResult;

/// One unit of sampler work: a circuit, its parameter rows and a shot count.
#[derive(Debug, Clone)]
pub struct SamplerPub {
    /// Circuit to execute.
    pub circuit: Circuit,
    /// Values for free parameters and classical inputs.
    pub parameter_values: ParameterBatch,
    /// Shots per batch element.
    pub shots: usize,
}

impl SamplerPub {
    /// Create a pub.
    pub fn new(circuit: Circuit, parameter_values: ParameterBatch, shots: usize) -> Self {
        Self {
            circuit,
            parameter_values,
            shots,
        }
    }

    /// Check the pub is self-consistent before submission.
    ///
    /// Every free circuit parameter and every declared classical input must
    /// have a column.
    pub fn validate(&self) -> HalResult<()> {
        if self.shots == 0 {
            return Err(HalError::InvalidShots(format!(
                "pub for '{}' requests zero shots",
                self.circuit.name()
            )));
        }
        let names = self.parameter_values.names();
        if let Some(missing) = self
            .circuit
            .parameters()
            .into_iter()
            .find(|p| !names.contains(p))
        {
            return Err(HalError::Configuration(format!(
                "parameter '{missing}' of '{}' has no values",
                self.circuit.name()
            )));
        }
        if let Some(input) = self
            .circuit
            .inputs()
            .iter()
            .find(|i| !names.contains(&i.name))
        {
            return Err(HalError::UnboundInput(input.name.clone()));
        }
        Ok(())
    }
}

/// A batch-oriented sampling execution primitive.
pub trait Sampler: Send + Sync {
    /// Get the name of this sampler.
    fn name(&self) -> &str;

    /// Execute every pub as one job and return their results in order.
    fn run(&self, pubs: &[SamplerPub]) -> HalResult<Vec<PubResult>>;
}

/// Exact classical simulation of a circuit's unitary.
pub trait UnitaryBackend: Send + Sync {
    /// The `2^n × 2^n` unitary of `circuit`, global phase included.
    ///
    /// Row and column indices are little-endian over the circuit's qubit
    /// list. Fails with [`HalError::NotSimulable`] for measurements, resets,
    /// switches or unbound parameters.
    fn unitary(&self, circuit: &Circuit) -> HalResult<Array2<Complex64>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_ir::{ParameterExpression, QubitId};

    #[test]
    fn test_pub_validation() {
        let mut circuit = Circuit::with_size("p", 1, 0);
        circuit
            .rx(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();
        circuit.add_input("k", 2).unwrap();

        let pub_ = SamplerPub::new(circuit.clone(), ParameterBatch::empty(1), 100);
        assert!(matches!(pub_.validate(), Err(HalError::Configuration(_))));

        let batch = ParameterBatch::empty(1).with_column("theta", 0.3);
        let pub_ = SamplerPub::new(circuit.clone(), batch.clone(), 100);
        assert!(matches!(pub_.validate(), Err(HalError::UnboundInput(_))));

        let pub_ = SamplerPub::new(circuit.clone(), batch.clone().with_column("k", 1.0), 100);
        assert!(pub_.validate().is_ok());

        let pub_ = SamplerPub::new(circuit, batch.with_column("k", 1.0), 0);
        assert!(matches!(pub_.validate(), Err(HalError::InvalidShots(_))));
    }
}
