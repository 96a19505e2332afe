//! Unitary matrix utilities for gate synthesis and optimization.
//!
//! Provides 2x2 unitary matrix operations for single-qubit work, including
//! matrix multiplication and an exact, phase-tracking Euler decomposition.

use num_complex::Complex64;
use std::f64::consts::PI;

use qcal_ir::StandardGate;

/// Tolerance for floating point comparisons.
pub(crate) const EPSILON: f64 = 1e-10;

/// A 2x2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct Unitary2x2 {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a new 2x2 unitary matrix.
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Build from a row-major slice of four entries.
    pub fn from_slice(m: &[Complex64]) -> Option<Self> {
        match m {
            [a, b, c, d] => Some(Self::new(*a, *b, *c, *d)),
            _ => None,
        }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
        )
    }

    /// Create a Hadamard matrix.
    pub fn h() -> Self {
        let s = 1.0 / 2.0_f64.sqrt();
        Self::new(
            Complex64::new(s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(-s, 0.0),
        )
    }

    /// Create a Pauli-X matrix.
    pub fn x() -> Self {
        Self::new(
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
        )
    }

    /// Create a Pauli-Y matrix.
    pub fn y() -> Self {
        Self::new(
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, -1.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(0.0, 0.0),
        )
    }

    /// Create a Pauli-Z matrix.
    pub fn z() -> Self {
        Self::p(PI)
    }

    /// Create an S gate (sqrt(Z)).
    pub fn s() -> Self {
        Self::p(PI / 2.0)
    }

    /// Create an S-dagger gate.
    pub fn sdg() -> Self {
        Self::p(-PI / 2.0)
    }

    /// Create a T gate (fourth root of Z).
    pub fn t() -> Self {
        Self::p(PI / 4.0)
    }

    /// Create a T-dagger gate.
    pub fn tdg() -> Self {
        Self::p(-PI / 4.0)
    }

    /// Create an SX gate (sqrt(X)).
    pub fn sx() -> Self {
        let half = Complex64::new(0.5, 0.0);
        let half_i = Complex64::new(0.0, 0.5);
        Self::new(half + half_i, half - half_i, half - half_i, half + half_i)
    }

    /// Create an SX-dagger gate.
    pub fn sxdg() -> Self {
        Self::sx().dagger()
    }

    /// Create an RX rotation matrix.
    pub fn rx(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s),
            Complex64::new(0.0, -s),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RY rotation matrix.
    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RZ rotation matrix.
    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// Create a phase gate P(lambda).
    pub fn p(lambda: f64) -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::from_polar(1.0, lambda),
        )
    }

    /// Create a U gate U(theta, phi, lambda).
    pub fn u(theta: f64, phi: f64, lambda: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// Matrix of a bound single-qubit standard gate.
    ///
    /// Returns `None` for multi-qubit gates and unbound parameters.
    pub fn from_gate(gate: &StandardGate) -> Option<Self> {
        match gate {
            StandardGate::I => Some(Self::identity()),
            StandardGate::X => Some(Self::x()),
            StandardGate::Y => Some(Self::y()),
            StandardGate::Z => Some(Self::z()),
            StandardGate::H => Some(Self::h()),
            StandardGate::S => Some(Self::s()),
            StandardGate::Sdg => Some(Self::sdg()),
            StandardGate::T => Some(Self::t()),
            StandardGate::Tdg => Some(Self::tdg()),
            StandardGate::SX => Some(Self::sx()),
            StandardGate::SXdg => Some(Self::sxdg()),
            StandardGate::Rx(p) => p.as_f64().map(Self::rx),
            StandardGate::Ry(p) => p.as_f64().map(Self::ry),
            StandardGate::Rz(p) => p.as_f64().map(Self::rz),
            StandardGate::P(p) => p.as_f64().map(Self::p),
            StandardGate::U(theta, phi, lambda) => {
                Some(Self::u(theta.as_f64()?, phi.as_f64()?, lambda.as_f64()?))
            }
            _ => None,
        }
    }

    /// Multiply this matrix by another: self * other.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Get the conjugate transpose (dagger).
    pub fn dagger(&self) -> Self {
        Self::new(
            self.data[0].conj(),
            self.data[2].conj(),
            self.data[1].conj(),
            self.data[3].conj(),
        )
    }

    /// Check if this is approximately identity up to global phase.
    pub fn is_identity(&self) -> bool {
        let [a, b, c, d] = self.data;
        if b.norm() > EPSILON || c.norm() > EPSILON {
            return false;
        }
        (a - d).norm() < EPSILON
    }

    /// Decompose into RZ(alpha) * RY(beta) * RZ(gamma) * e^(i `global_phase`).
    ///
    /// Returns (alpha, beta, gamma, `global_phase`).
    pub fn zyz_decomposition(&self) -> (f64, f64, f64, f64) {
        let [a, b, c, d] = self.data;

        let det = a * d - b * c;
        let global_phase = det.arg() / 2.0;

        // Remove the phase to land in SU(2):
        // [[cos(b/2) e^(-i(a+g)/2), -sin(b/2) e^(-i(a-g)/2)],
        //  [sin(b/2) e^( i(a-g)/2),  cos(b/2) e^( i(a+g)/2)]]
        let phase_factor = Complex64::from_polar(1.0, -global_phase);
        let a = a * phase_factor;
        let b = b * phase_factor;
        let c = c * phase_factor;

        let beta = 2.0 * c.norm().atan2(a.norm());

        if beta.abs() < EPSILON {
            let alpha_plus_gamma = -2.0 * a.arg();
            return (
                alpha_plus_gamma / 2.0,
                0.0,
                alpha_plus_gamma / 2.0,
                global_phase,
            );
        }

        if (beta - PI).abs() < EPSILON {
            let alpha_minus_gamma = -2.0 * (-b).arg();
            return (
                alpha_minus_gamma / 2.0,
                PI,
                -alpha_minus_gamma / 2.0,
                global_phase,
            );
        }

        let alpha_plus_gamma = -2.0 * a.arg();
        let alpha_minus_gamma = 2.0 * c.arg();

        let alpha = f64::midpoint(alpha_plus_gamma, alpha_minus_gamma);
        let gamma = (alpha_plus_gamma - alpha_minus_gamma) / 2.0;

        (alpha, beta, gamma, global_phase)
    }

    /// Decompose into e^(i `phase`) * U(theta, phi, lambda).
    ///
    /// Returns (theta, phi, lambda, phase) with every angle normalized.
    pub fn u3_decomposition(&self) -> (f64, f64, f64, f64) {
        let (alpha, beta, gamma, phase) = self.zyz_decomposition();
        // U(b, a, g) = e^(i(a+g)/2) Rz(a) Ry(b) Rz(g)
        let phase = phase - (alpha + gamma) / 2.0;
        (
            Self::normalize_angle(beta),
            Self::normalize_angle(alpha),
            Self::normalize_angle(gamma),
            Self::normalize_angle(phase),
        )
    }

    /// Normalize angles to [-pi, pi].
    pub fn normalize_angle(angle: f64) -> f64 {
        if angle.is_nan() || angle.is_infinite() {
            return 0.0;
        }
        let mut a = angle.rem_euclid(2.0 * PI);
        if a > PI {
            a -= 2.0 * PI;
        }
        a
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Unitary2x2 {
    type Output = Self;

    #[allow(clippy::needless_pass_by_value)]
    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: &Unitary2x2, got: &Unitary2x2) {
        for i in 0..4 {
            assert!(
                (expected.data[i] - got.data[i]).norm() < 1e-9,
                "Mismatch at {i}: expected {:?}, got {:?}",
                expected.data[i],
                got.data[i]
            );
        }
    }

    fn rebuild_u3(u: &Unitary2x2) -> Unitary2x2 {
        let (theta, phi, lambda, phase) = u.u3_decomposition();
        let m = Unitary2x2::u(theta, phi, lambda);
        let g = Complex64::from_polar(1.0, phase);
        Unitary2x2::new(m.data[0] * g, m.data[1] * g, m.data[2] * g, m.data[3] * g)
    }

    #[test]
    fn test_hadamard_squared() {
        let h = Unitary2x2::h();
        assert!((h * h).is_identity());
    }

    #[test]
    fn test_pauli_squared() {
        for p in [Unitary2x2::x(), Unitary2x2::y(), Unitary2x2::z()] {
            assert!((p * p).is_identity());
        }
    }

    #[test]
    fn test_zyz_reconstructs_hadamard() {
        let h = Unitary2x2::h();
        let (alpha, beta, gamma, phase) = h.zyz_decomposition();
        let r = Unitary2x2::rz(alpha) * Unitary2x2::ry(beta) * Unitary2x2::rz(gamma);
        let g = Complex64::from_polar(1.0, phase);
        let r = Unitary2x2::new(r.data[0] * g, r.data[1] * g, r.data[2] * g, r.data[3] * g);
        assert_close(&h, &r);
    }

    #[test]
    fn test_u3_is_exact_including_phase() {
        let cases = [
            Unitary2x2::h(),
            Unitary2x2::x(),
            Unitary2x2::y(),
            Unitary2x2::s(),
            Unitary2x2::sx(),
            Unitary2x2::rx(0.3) * Unitary2x2::rz(-1.1) * Unitary2x2::ry(2.5),
            Unitary2x2::rz(2.0 * PI),
        ];
        for u in &cases {
            assert_close(u, &rebuild_u3(u));
        }
    }

    #[test]
    fn test_dagger_inverts() {
        let u = Unitary2x2::rx(0.7) * Unitary2x2::t() * Unitary2x2::h();
        assert!((u * u.dagger()).is_identity());
    }

    #[test]
    fn test_from_gate_rejects_symbolic() {
        use qcal_ir::ParameterExpression;
        assert!(Unitary2x2::from_gate(&StandardGate::Rx(ParameterExpression::symbol("t"))).is_none());
        assert!(Unitary2x2::from_gate(&StandardGate::CX).is_none());
    }
}
