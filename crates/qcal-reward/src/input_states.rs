//! Single-qubit probe state families.
//!
//! A family is an ordered list of one-qubit preparation circuits. Probes on
//! an `n`-qubit causal cone use product states, addressed either by a
//! multi-index (one entry per cone qubit) or by its flat C-order index in
//! `[0, cardinality^n)`.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use qcal_ir::{Circuit, QubitId};

use crate::error::{RewardError, RewardResult};

/// Number of states drawn for the design-based family.
const DESIGN_SIZE: usize = 8;

/// Identifier of an input-state family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputStateFamily {
    /// |0>, |1>, |+>, |+i>.
    #[default]
    #[serde(rename = "pauli4")]
    Pauli4,
    /// The six Pauli eigenstates.
    #[serde(rename = "pauli6")]
    Pauli6,
    /// Haar-random states drawn from a seed.
    #[serde(rename = "2-design")]
    TwoDesign,
}

impl InputStateFamily {
    /// Configuration name of the family.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pauli4 => "pauli4",
            Self::Pauli6 => "pauli6",
            Self::TwoDesign => "2-design",
        }
    }
}

impl fmt::Display for InputStateFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputStateFamily {
    type Err = RewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pauli4" => Ok(Self::Pauli4),
            "pauli6" => Ok(Self::Pauli6),
            "2-design" => Ok(Self::TwoDesign),
            other => Err(RewardError::InvalidInputStateFamily(other.to_string())),
        }
    }
}

/// One single-qubit preparation from |0>.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Short label such as `"+i"`.
    pub label: String,
    /// Preparation circuit on `q0`.
    pub circuit: Circuit,
}

impl InputState {
    /// Whether the preparation applies no gates.
    pub fn is_trivial(&self) -> bool {
        self.circuit.instructions().next().is_none()
    }
}

/// A product input state on a causal cone.
#[derive(Debug, Clone)]
pub struct InputStateSample {
    /// State index for each cone qubit, in cone order.
    pub indices: Vec<usize>,
    /// Preparation circuit on qubits `0..n`.
    pub circuit: Circuit,
}

/// The ordered states of one family.
#[derive(Debug, Clone)]
pub struct InputStateLibrary {
    family: InputStateFamily,
    states: Vec<InputState>,
}

impl InputStateLibrary {
    /// Build the library for `family`.
    ///
    /// `seed` only affects [`InputStateFamily::TwoDesign`].
    pub fn new(family: InputStateFamily, seed: u64) -> RewardResult<Self> {
        let states = match family {
            InputStateFamily::Pauli4 => vec![
                pauli_state("0", &[])?,
                pauli_state("1", &["x"])?,
                pauli_state("+", &["h"])?,
                pauli_state("+i", &["h", "s"])?,
            ],
            InputStateFamily::Pauli6 => vec![
                pauli_state("0", &[])?,
                pauli_state("1", &["x"])?,
                pauli_state("+", &["h"])?,
                pauli_state("-", &["x", "h"])?,
                pauli_state("+i", &["h", "s"])?,
                pauli_state("-i", &["h", "sdg"])?,
            ],
            InputStateFamily::TwoDesign => haar_states(seed)?,
        };
        Ok(Self { family, states })
    }

    /// Parse the family name and build the library.
    pub fn from_name(name: &str, seed: u64) -> RewardResult<Self> {
        Self::new(name.parse()?, seed)
    }

    /// The family identifier.
    pub fn family(&self) -> InputStateFamily {
        self.family
    }

    /// Number of distinct single-qubit states.
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    /// All states in order.
    pub fn states(&self) -> &[InputState] {
        &self.states
    }

    /// The `index`-th state.
    pub fn state(&self, index: usize) -> RewardResult<&InputState> {
        self.states.get(index).ok_or_else(|| {
            RewardError::Configuration(format!(
                "input state {index} out of range for {} ({} states)",
                self.family,
                self.states.len()
            ))
        })
    }

    /// Circuit undoing the `index`-th preparation.
    pub fn inverse(&self, index: usize) -> RewardResult<Circuit> {
        Ok(self.state(index)?.circuit.inverse()?)
    }

    /// Number of product states on `num_qubits` qubits.
    pub fn num_product_states(&self, num_qubits: usize) -> RewardResult<u64> {
        u32::try_from(num_qubits)
            .ok()
            .and_then(|n| (self.cardinality() as u64).checked_pow(n))
            .ok_or_else(|| {
                RewardError::Configuration(format!(
                    "{num_qubits}-qubit product states of {} overflow",
                    self.family
                ))
            })
    }

    /// Product state with the given per-qubit indices.
    pub fn product_state(&self, indices: &[usize]) -> RewardResult<InputStateSample> {
        #[allow(clippy::cast_possible_truncation)]
        let mut circuit = Circuit::with_size("input_state", indices.len() as u32, 0);
        let mut labels = Vec::with_capacity(indices.len());
        for (k, &index) in indices.iter().enumerate() {
            let state = self.state(index)?;
            #[allow(clippy::cast_possible_truncation)]
            circuit.compose(&state.circuit, &[QubitId(k as u32)])?;
            labels.push(state.label.as_str());
        }
        Ok(InputStateSample {
            indices: indices.to_vec(),
            circuit: circuit.with_name(format!("input_state_{}", labels.join("_"))),
        })
    }

    /// Product state with flat C-order index `flat` on `num_qubits` qubits.
    pub fn product_state_flat(&self, flat: u64, num_qubits: usize) -> RewardResult<InputStateSample> {
        let indices = unravel_index(flat, self.cardinality(), num_qubits)?;
        self.product_state(&indices)
    }
}

/// Split a flat index into `num_digits` base-`base` digits, most significant
/// first.
pub fn unravel_index(flat: u64, base: usize, num_digits: usize) -> RewardResult<Vec<usize>> {
    let base_u = base as u64;
    let total = u32::try_from(num_digits)
        .ok()
        .and_then(|n| base_u.checked_pow(n));
    match total {
        Some(total) if base > 0 && flat < total => {}
        _ => {
            return Err(RewardError::Configuration(format!(
                "flat index {flat} out of range for {num_digits} digits of base {base}"
            )));
        }
    }
    let mut digits = vec![0; num_digits];
    let mut rest = flat;
    for digit in digits.iter_mut().rev() {
        #[allow(clippy::cast_possible_truncation)]
        {
            *digit = (rest % base_u) as usize;
        }
        rest /= base_u;
    }
    Ok(digits)
}

fn pauli_state(label: &str, gates: &[&str]) -> RewardResult<InputState> {
    let q = QubitId(0);
    let mut circuit = Circuit::with_size(format!("prep_{label}"), 1, 0);
    for gate in gates {
        match *gate {
            "x" => circuit.x(q)?,
            "h" => circuit.h(q)?,
            "s" => circuit.s(q)?,
            "sdg" => circuit.sdg(q)?,
            other => {
                return Err(RewardError::Configuration(format!(
                    "unknown preparation gate '{other}'"
                )));
            }
        };
    }
    Ok(InputState {
        label: label.to_string(),
        circuit,
    })
}

/// Haar-random states `U(theta, phi, 0)|0>` with `cos(theta)` uniform.
fn haar_states(seed: u64) -> RewardResult<Vec<InputState>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..DESIGN_SIZE)
        .map(|i| {
            let theta = rng.gen_range(-1.0_f64..=1.0).acos();
            let phi = rng.gen_range(0.0..2.0 * PI);
            let mut circuit = Circuit::with_size(format!("prep_haar_{i}"), 1, 0);
            circuit.u(theta, phi, 0.0, QubitId(0))?;
            Ok(InputState {
                label: format!("haar{i}"),
                circuit,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinalities() {
        let card = |f| InputStateLibrary::new(f, 0).unwrap().cardinality();
        assert_eq!(card(InputStateFamily::Pauli4), 4);
        assert_eq!(card(InputStateFamily::Pauli6), 6);
        assert_eq!(card(InputStateFamily::TwoDesign), 8);
    }

    #[test]
    fn test_invalid_family_name() {
        let err = InputStateLibrary::from_name("pauli5", 0).unwrap_err();
        assert!(matches!(err, RewardError::InvalidInputStateFamily(ref s) if s == "pauli5"));
        assert_eq!("2-design".parse::<InputStateFamily>().unwrap(), InputStateFamily::TwoDesign);
    }

    #[test]
    fn test_zero_state_is_trivial() {
        let lib = InputStateLibrary::new(InputStateFamily::Pauli6, 0).unwrap();
        assert!(lib.state(0).unwrap().is_trivial());
        assert!(!lib.state(5).unwrap().is_trivial());
        assert!(lib.state(6).is_err());
    }

    #[test]
    fn test_design_states_depend_on_seed() {
        let a = InputStateLibrary::new(InputStateFamily::TwoDesign, 7).unwrap();
        let b = InputStateLibrary::new(InputStateFamily::TwoDesign, 7).unwrap();
        let c = InputStateLibrary::new(InputStateFamily::TwoDesign, 8).unwrap();
        let first = |l: &InputStateLibrary| l.state(0).unwrap().circuit.instructions().next().cloned();
        assert_eq!(first(&a), first(&b));
        assert_ne!(first(&a), first(&c));
    }

    #[test]
    fn test_unravel_is_c_order() {
        assert_eq!(unravel_index(0, 4, 2).unwrap(), vec![0, 0]);
        assert_eq!(unravel_index(1, 4, 2).unwrap(), vec![0, 1]);
        assert_eq!(unravel_index(6, 4, 2).unwrap(), vec![1, 2]);
        assert_eq!(unravel_index(15, 4, 2).unwrap(), vec![3, 3]);
        assert!(unravel_index(16, 4, 2).is_err());
    }

    #[test]
    fn test_product_state_places_component_k_on_qubit_k() {
        let lib = InputStateLibrary::new(InputStateFamily::Pauli4, 0).unwrap();
        let sample = lib.product_state_flat(4 + 2, 2).unwrap();
        assert_eq!(sample.indices, vec![1, 2]);
        let ops: Vec<_> = sample
            .circuit
            .instructions()
            .map(|i| (i.name().to_string(), i.qubits[0]))
            .collect();
        assert_eq!(
            ops,
            vec![("x".to_string(), QubitId(0)), ("h".to_string(), QubitId(1))]
        );
        assert_eq!(sample.circuit.name(), "input_state_1_+");
    }
}
