//! Quantum gate types.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::parameter::ParameterExpression;

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate.
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// SWAP gate.
    Swap,
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),
    /// ZZ rotation gate.
    RZZ(ParameterExpression),
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::Swap => "swap",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::RZZ(_) => "rzz",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::Swap
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::RZZ(_) => 2,
            _ => 1,
        }
    }

    /// Check if this gate has unbound parameters.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RZZ(p) => vec![p],

            StandardGate::U(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }

    /// The inverse gate.
    ///
    /// Parameters are negated symbolically, so symbolic gates invert too.
    pub fn inverse(&self) -> StandardGate {
        match self {
            StandardGate::S => StandardGate::Sdg,
            StandardGate::Sdg => StandardGate::S,
            StandardGate::T => StandardGate::Tdg,
            StandardGate::Tdg => StandardGate::T,
            StandardGate::SX => StandardGate::SXdg,
            StandardGate::SXdg => StandardGate::SX,
            StandardGate::Rx(p) => StandardGate::Rx(p.negated()),
            StandardGate::Ry(p) => StandardGate::Ry(p.negated()),
            StandardGate::Rz(p) => StandardGate::Rz(p.negated()),
            StandardGate::P(p) => StandardGate::P(p.negated()),
            // U(θ, φ, λ)† = U(-θ, -λ, -φ)
            StandardGate::U(theta, phi, lambda) => {
                StandardGate::U(theta.negated(), lambda.negated(), phi.negated())
            }
            StandardGate::CRz(p) => StandardGate::CRz(p.negated()),
            StandardGate::CP(p) => StandardGate::CP(p.negated()),
            StandardGate::RZZ(p) => StandardGate::RZZ(p.negated()),
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::Swap => self.clone(),
        }
    }

    /// Substitute bound values into the parameters.
    pub fn bind(&self, bindings: &FxHashMap<String, f64>) -> StandardGate {
        let b = |p: &ParameterExpression| p.bind_all(bindings);
        match self {
            StandardGate::Rx(p) => StandardGate::Rx(b(p)),
            StandardGate::Ry(p) => StandardGate::Ry(b(p)),
            StandardGate::Rz(p) => StandardGate::Rz(b(p)),
            StandardGate::P(p) => StandardGate::P(b(p)),
            StandardGate::U(t, p, l) => StandardGate::U(b(t), b(p), b(l)),
            StandardGate::CRz(p) => StandardGate::CRz(b(p)),
            StandardGate::CP(p) => StandardGate::CP(b(p)),
            StandardGate::RZZ(p) => StandardGate::RZZ(b(p)),
            _ => self.clone(),
        }
    }
}

/// A quantum gate, either standard or custom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A custom gate defined by its matrix.
    Custom(CustomGate),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Custom(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Custom(g) => g.num_qubits,
        }
    }
}

/// A user-defined gate, usually an explicit unitary.
///
/// The matrix is row-major, `2^n × 2^n`, and indexes basis states
/// little-endian over the instruction's qubit operands: bit `k` of a row or
/// column index is the state of the `k`-th operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// The name of the gate.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    /// Optional unitary matrix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Complex64>>,
}

impl CustomGate {
    /// Create a new opaque custom gate.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            matrix: None,
        }
    }

    /// Create a unitary gate from a row-major matrix.
    pub fn unitary(
        name: impl Into<String>,
        num_qubits: u32,
        matrix: Vec<Complex64>,
    ) -> IrResult<Self> {
        let dim = 1usize << num_qubits;
        if matrix.len() != dim * dim {
            return Err(IrError::MatrixSizeMismatch {
                num_qubits,
                expected: dim * dim,
                got: matrix.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            num_qubits,
            matrix: Some(matrix),
        })
    }

    /// Matrix dimension `2^n`.
    pub fn dim(&self) -> usize {
        1usize << self.num_qubits
    }

    /// Conjugate-transpose gate.
    pub fn inverse(&self) -> IrResult<Self> {
        let matrix = self
            .matrix
            .as_ref()
            .ok_or_else(|| IrError::NotInvertible(self.name.clone()))?;
        let dim = self.dim();
        let mut adjoint = vec![Complex64::new(0.0, 0.0); dim * dim];
        for row in 0..dim {
            for col in 0..dim {
                adjoint[col * dim + row] = matrix[row * dim + col].conj();
            }
        }
        let name = match self.name.strip_suffix("_dg") {
            Some(base) => base.to_string(),
            None => format!("{}_dg", self.name),
        };
        Ok(Self {
            name,
            num_qubits: self.num_qubits,
            matrix: Some(adjoint),
        })
    }
}

/// A gate with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Optional label for the gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            label: None,
        }
    }

    /// Create a new gate from a custom gate.
    pub fn custom(gate: CustomGate) -> Self {
        Self {
            kind: GateKind::Custom(gate),
            label: None,
        }
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }

    /// Inverse gate; opaque custom gates have none.
    pub fn inverse(&self) -> IrResult<Gate> {
        let kind = match &self.kind {
            GateKind::Standard(g) => GateKind::Standard(g.inverse()),
            GateKind::Custom(g) => GateKind::Custom(g.inverse()?),
        };
        Ok(Gate {
            kind,
            label: self.label.clone(),
        })
    }

    /// Gate with parameters bound from `bindings`.
    pub fn bind(&self, bindings: &FxHashMap<String, f64>) -> Gate {
        match &self.kind {
            GateKind::Standard(g) => Gate {
                kind: GateKind::Standard(g.bind(bindings)),
                label: self.label.clone(),
            },
            GateKind::Custom(_) => self.clone(),
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<CustomGate> for Gate {
    fn from(gate: CustomGate) -> Self {
        Gate::custom(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::RZZ(PI.into()).num_qubits(), 2);

        assert!(!StandardGate::H.is_parameterized());
        assert!(!StandardGate::Rx(ParameterExpression::constant(PI)).is_parameterized());
        assert!(StandardGate::Rx(ParameterExpression::symbol("theta")).is_parameterized());
    }

    #[test]
    fn test_inverse_pairs() {
        assert_eq!(StandardGate::S.inverse(), StandardGate::Sdg);
        assert_eq!(StandardGate::SX.inverse(), StandardGate::SXdg);
        assert_eq!(StandardGate::H.inverse(), StandardGate::H);
        assert_eq!(
            StandardGate::Rz(0.3.into()).inverse(),
            StandardGate::Rz(ParameterExpression::Constant(-0.3))
        );
        assert_eq!(
            StandardGate::U(0.1.into(), 0.2.into(), 0.3.into()).inverse(),
            StandardGate::U(
                ParameterExpression::Constant(-0.1),
                ParameterExpression::Constant(-0.3),
                ParameterExpression::Constant(-0.2),
            )
        );
    }

    #[test]
    fn test_custom_unitary_size_checked() {
        let bad = CustomGate::unitary("u", 1, vec![Complex64::new(1.0, 0.0); 3]);
        assert!(matches!(bad, Err(IrError::MatrixSizeMismatch { expected: 4, .. })));
    }

    #[test]
    fn test_custom_inverse_is_adjoint() {
        let i = Complex64::new(0.0, 1.0);
        let zero = Complex64::new(0.0, 0.0);
        let gate = CustomGate::unitary("phase", 1, vec![Complex64::new(1.0, 0.0), zero, zero, i])
            .unwrap();
        let inv = gate.inverse().unwrap();
        assert_eq!(inv.name, "phase_dg");
        assert_eq!(inv.matrix.as_ref().unwrap()[3], -i);
        assert_eq!(inv.inverse().unwrap().name, "phase");
    }

    #[test]
    fn test_opaque_custom_not_invertible() {
        let gate = Gate::custom(CustomGate::new("black_box", 2));
        assert!(matches!(gate.inverse(), Err(IrError::NotInvertible(_))));
    }
}
