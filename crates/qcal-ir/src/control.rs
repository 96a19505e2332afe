//! Runtime classical control flow.
//!
//! Circuits can declare unsigned classical inputs whose values are supplied at
//! execution time. A [`SwitchOp`] reads one or more of them and dispatches to
//! the case whose key tuple matches, so a single compiled program can cover
//! every combination of input values. Keys that match no case do nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{IrError, IrResult};
use crate::instruction::Instruction;
use crate::qubit::QubitId;

/// A classical input variable read at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassicalInput {
    /// Variable name.
    pub name: String,
    /// Width in bits; values range over `0..2^bits`.
    pub bits: u32,
}

impl ClassicalInput {
    /// Create a new input declaration.
    pub fn new(name: impl Into<String>, bits: u32) -> Self {
        Self {
            name: name.into(),
            bits,
        }
    }

    /// Whether `value` is representable in this input.
    pub fn fits(&self, value: u64) -> bool {
        self.bits >= 64 || value < (1u64 << self.bits)
    }
}

/// One arm of a switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Selector values, one per selector, that choose this arm.
    pub key: Vec<u64>,
    /// Instructions applied when the arm is taken.
    pub body: Vec<Instruction>,
}

/// Multi-selector dispatch over classical inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchOp {
    /// Names of the classical inputs read, in key order.
    pub selectors: Vec<String>,
    /// Arms in insertion order.
    pub cases: Vec<SwitchCase>,
}

impl SwitchOp {
    /// Create a switch with no arms.
    pub fn new(selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            selectors: selectors.into_iter().map(Into::into).collect(),
            cases: vec![],
        }
    }

    /// Add an arm.
    pub fn add_case(&mut self, key: Vec<u64>, body: Vec<Instruction>) -> IrResult<()> {
        if key.len() != self.selectors.len() {
            return Err(self.case_error(&key, "key length differs from selector count"));
        }
        if self.case_for(&key).is_some() {
            return Err(self.case_error(&key, "duplicate key"));
        }
        self.cases.push(SwitchCase { key, body });
        Ok(())
    }

    /// Builder-style [`add_case`](Self::add_case).
    pub fn with_case(mut self, key: Vec<u64>, body: Vec<Instruction>) -> IrResult<Self> {
        self.add_case(key, body)?;
        Ok(self)
    }

    /// Arm selected by `key`, if any.
    pub fn case_for(&self, key: &[u64]) -> Option<&SwitchCase> {
        self.cases.iter().find(|c| c.key == key)
    }

    /// Every qubit touched by any arm, sorted.
    pub fn qubits(&self) -> Vec<QubitId> {
        let mut set = BTreeSet::new();
        for case in &self.cases {
            for inst in &case.body {
                set.extend(inst.qubits.iter().copied());
            }
        }
        set.into_iter().collect()
    }

    fn case_error(&self, key: &[u64], reason: &str) -> IrError {
        IrError::InvalidSwitchCase {
            selectors: self.selectors.clone(),
            key: key.to_vec(),
            reason: reason.to_string(),
        }
    }

    /// Check the arm keys against the declared input widths.
    pub(crate) fn validate_keys(&self, inputs: &[ClassicalInput]) -> IrResult<()> {
        let declared: Vec<&ClassicalInput> = self
            .selectors
            .iter()
            .map(|name| {
                inputs
                    .iter()
                    .find(|i| &i.name == name)
                    .ok_or_else(|| IrError::UndeclaredInput(name.clone()))
            })
            .collect::<IrResult<_>>()?;
        for case in &self.cases {
            for (value, input) in case.key.iter().zip(&declared) {
                if !input.fits(*value) {
                    return Err(self.case_error(
                        &case.key,
                        &format!("value {value} exceeds {} bits of '{}'", input.bits, input.name),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StandardGate;

    #[test]
    fn test_switch_qubits_union() {
        let op = SwitchOp::new(["sel"])
            .with_case(
                vec![0],
                vec![Instruction::single_qubit_gate(StandardGate::X, QubitId(2))],
            )
            .unwrap()
            .with_case(
                vec![1],
                vec![Instruction::two_qubit_gate(
                    StandardGate::CX,
                    QubitId(0),
                    QubitId(2),
                )],
            )
            .unwrap();
        assert_eq!(op.qubits(), vec![QubitId(0), QubitId(2)]);
        assert!(op.case_for(&[1]).is_some());
        assert!(op.case_for(&[3]).is_none());
    }

    #[test]
    fn test_duplicate_and_malformed_keys() {
        let mut op = SwitchOp::new(["a", "b"]);
        op.add_case(vec![0, 1], vec![]).unwrap();
        assert!(op.add_case(vec![0, 1], vec![]).is_err());
        assert!(op.add_case(vec![0], vec![]).is_err());
    }

    #[test]
    fn test_key_width_validation() {
        let op = SwitchOp::new(["sel"]).with_case(vec![4], vec![]).unwrap();
        let narrow = [ClassicalInput::new("sel", 2)];
        assert!(op.validate_keys(&narrow).is_err());
        let wide = [ClassicalInput::new("sel", 8)];
        assert!(op.validate_keys(&wide).is_ok());
        assert!(matches!(
            op.validate_keys(&[]),
            Err(IrError::UndeclaredInput(name)) if name == "sel"
        ));
    }
}
