//! Statevector simulation engine.
//!
//! Qubits are addressed by position: bit `k` of an amplitude index is the
//! `k`-th qubit of the simulated circuit's qubit list.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use qcal_hal::{HalError, HalResult};
use qcal_ir::{GateKind, StandardGate};

/// A statevector representing a quantum state.
#[derive(Debug, Clone)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        Self::basis_state(num_qubits, 0)
    }

    /// Create the computational basis state `|index⟩`.
    pub fn basis_state(num_qubits: usize, index: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[index] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Consume the state and return its amplitudes.
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Multiply every amplitude by `e^(i phase)`.
    pub fn apply_global_phase(&mut self, phase: f64) {
        if phase == 0.0 {
            return;
        }
        let factor = Complex64::from_polar(1.0, phase);
        for amp in &mut self.amplitudes {
            *amp *= factor;
        }
    }

    /// Apply a gate to the qubits at the given positions.
    ///
    /// Fails for unbound parameters and for custom gates without a matrix.
    pub fn apply_gate(&mut self, gate: &GateKind, qubits: &[usize]) -> HalResult<()> {
        match gate {
            GateKind::Standard(std_gate) => self.apply_standard_gate(std_gate, qubits),
            GateKind::Custom(custom) => {
                let matrix = custom.matrix.as_ref().ok_or_else(|| {
                    HalError::Unsupported(format!("opaque gate '{}'", custom.name))
                })?;
                self.apply_matrix(matrix, qubits);
                Ok(())
            }
        }
    }

    /// Apply a standard gate.
    fn apply_standard_gate(&mut self, gate: &StandardGate, qubits: &[usize]) -> HalResult<()> {
        match gate {
            // Single-qubit gates
            StandardGate::I => {}
            StandardGate::X => self.apply_x(qubits[0]),
            StandardGate::Y => self.apply_y(qubits[0]),
            StandardGate::Z => self.apply_phase(qubits[0], PI),
            StandardGate::H => self.apply_h(qubits[0]),
            StandardGate::S => self.apply_phase(qubits[0], PI / 2.0),
            StandardGate::Sdg => self.apply_phase(qubits[0], -PI / 2.0),
            StandardGate::T => self.apply_phase(qubits[0], PI / 4.0),
            StandardGate::Tdg => self.apply_phase(qubits[0], -PI / 4.0),
            StandardGate::SX => self.apply_sx(qubits[0], false),
            StandardGate::SXdg => self.apply_sx(qubits[0], true),
            StandardGate::Rx(theta) => self.apply_rx(qubits[0], theta.value()?),
            StandardGate::Ry(theta) => self.apply_ry(qubits[0], theta.value()?),
            StandardGate::Rz(theta) => self.apply_rz(qubits[0], theta.value()?),
            StandardGate::P(theta) => self.apply_phase(qubits[0], theta.value()?),
            StandardGate::U(theta, phi, lambda) => {
                self.apply_u(qubits[0], theta.value()?, phi.value()?, lambda.value()?);
            }

            // Two-qubit gates
            StandardGate::CX => self.apply_cx(qubits[0], qubits[1]),
            StandardGate::CY => self.apply_cy(qubits[0], qubits[1]),
            StandardGate::CZ => self.apply_cp(qubits[0], qubits[1], PI),
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1]),
            StandardGate::CRz(theta) => self.apply_crz(qubits[0], qubits[1], theta.value()?),
            StandardGate::CP(theta) => self.apply_cp(qubits[0], qubits[1], theta.value()?),
            StandardGate::RZZ(theta) => self.apply_rzz(qubits[0], qubits[1], theta.value()?),
        }
        Ok(())
    }

    /// Apply a row-major `2^k × 2^k` matrix, little-endian over `qubits`.
    pub fn apply_matrix(&mut self, matrix: &[Complex64], qubits: &[usize]) {
        let k = qubits.len();
        let dim = 1usize << k;
        let offsets: Vec<usize> = (0..dim)
            .map(|j| {
                qubits
                    .iter()
                    .enumerate()
                    .filter(|(b, _)| j >> b & 1 == 1)
                    .fold(0, |acc, (_, &q)| acc | 1 << q)
            })
            .collect();
        let operand_mask = offsets[dim - 1];

        let mut gathered = vec![Complex64::new(0.0, 0.0); dim];
        for base in 0..self.amplitudes.len() {
            if base & operand_mask != 0 {
                continue;
            }
            for (slot, &off) in gathered.iter_mut().zip(&offsets) {
                *slot = self.amplitudes[base | off];
            }
            for (row, &off) in offsets.iter().enumerate() {
                self.amplitudes[base | off] = matrix[row * dim..(row + 1) * dim]
                    .iter()
                    .zip(&gathered)
                    .map(|(m, a)| m * a)
                    .sum();
            }
        }
    }

    // =========================================================================
    // Single-qubit gate implementations
    // =========================================================================

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_h(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = FRAC_1_SQRT_2 * (a + b);
                self.amplitudes[j] = FRAC_1_SQRT_2 * (a - b);
            }
        }
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask != 0 {
                *amp *= phase;
            }
        }
    }

    fn apply_rx(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a + neg_i_s * b;
                self.amplitudes[j] = neg_i_s * a + c * b;
            }
        }
    }

    fn apply_ry(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a - s * b;
                self.amplitudes[j] = s * a + c * b;
            }
        }
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            *amp *= if i & mask == 0 { phase_0 } else { phase_1 };
        }
    }

    fn apply_u(&mut self, qubit: usize, theta: f64, phi: f64, lambda: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        let e_il = Complex64::from_polar(1.0, lambda);
        let e_ip = Complex64::from_polar(1.0, phi);
        let e_ipl = Complex64::from_polar(1.0, phi + lambda);

        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a - e_il * s * b;
                self.amplitudes[j] = e_ip * s * a + e_ipl * c * b;
            }
        }
    }

    /// SX = e^(iπ/4) RX(π/2); the dagger flips both signs.
    fn apply_sx(&mut self, qubit: usize, dagger: bool) {
        let sign = if dagger { -1.0 } else { 1.0 };
        self.apply_rx(qubit, sign * PI / 2.0);
        self.apply_global_phase(sign * PI / 4.0);
    }

    // =========================================================================
    // Two-qubit gate implementations
    // =========================================================================

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                self.amplitudes.swap(i, i | tgt_mask);
            }
        }
    }

    fn apply_cy(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            if (i & mask1 != 0) && (i & mask2 == 0) {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_crz(&mut self, control: usize, target: usize, theta: f64) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & ctrl_mask != 0 {
                *amp *= if i & tgt_mask == 0 { phase_0 } else { phase_1 };
            }
        }
    }

    fn apply_cp(&mut self, control: usize, target: usize, theta: f64) {
        let both = (1 << control) | (1 << target);
        let phase = Complex64::from_polar(1.0, theta);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & both == both {
                *amp *= phase;
            }
        }
    }

    fn apply_rzz(&mut self, q1: usize, q2: usize, theta: f64) {
        let same = Complex64::from_polar(1.0, -theta / 2.0);
        let differ = Complex64::from_polar(1.0, theta / 2.0);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            let parity = (i >> q1 ^ i >> q2) & 1;
            *amp *= if parity == 0 { same } else { differ };
        }
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Probability that `qubit` reads 1.
    pub fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Measure one qubit, collapsing the state. Returns the outcome.
    pub fn measure<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) -> bool {
        let p_one = self.probability_one(qubit);
        let outcome = rng.r#gen::<f64>() < p_one;
        let mask = 1 << qubit;
        let norm = (if outcome { p_one } else { 1.0 - p_one }).sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == outcome {
                if norm > 0.0 {
                    *amp /= norm;
                }
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        outcome
    }

    /// Reset one qubit to |0⟩ by measuring and flipping.
    pub fn reset<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) {
        if self.measure(qubit, rng) {
            self.apply_x(qubit);
        }
    }

    /// Cumulative outcome distribution for repeated sampling.
    pub fn cumulative_probabilities(&self) -> Vec<f64> {
        self.amplitudes
            .iter()
            .scan(0.0, |acc, a| {
                *acc += a.norm_sqr();
                Some(*acc)
            })
            .collect()
    }

    /// Draw one basis-state index from a cumulative distribution.
    pub fn sample_from<R: Rng + ?Sized>(cumulative: &[f64], rng: &mut R) -> usize {
        let total = cumulative.last().copied().unwrap_or(1.0);
        let r = rng.r#gen::<f64>() * total;
        cumulative
            .partition_point(|&c| c <= r)
            .min(cumulative.len().saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2);
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(1.0, 0.0)));
        assert!(sv.amplitudes[1..].iter().all(|a| a.norm() < 1e-12));
    }

    #[test]
    fn test_bell_state() {
        let mut sv = Statevector::new(2);
        sv.apply_h(0);
        sv.apply_cx(0, 1);

        assert!(approx_eq(sv.amplitudes[0], Complex64::new(FRAC_1_SQRT_2, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[2], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(FRAC_1_SQRT_2, 0.0)));
    }

    #[test]
    fn test_matrix_matches_kernel() {
        // CX with control on the first operand, little-endian over (q1, q0).
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let mut cx = vec![zero; 16];
        for (r, c) in [(0, 0), (1, 3), (2, 2), (3, 1)] {
            cx[r * 4 + c] = one;
        }

        let mut a = Statevector::new(3);
        a.apply_h(1);
        a.apply_ry(0, 0.7);
        let mut b = a.clone();

        a.apply_cx(1, 0);
        b.apply_matrix(&cx, &[1, 0]);
        for (x, y) in a.amplitudes.iter().zip(&b.amplitudes) {
            assert!(approx_eq(*x, *y));
        }
    }

    #[test]
    fn test_sx_squares_to_x() {
        let mut sv = Statevector::new(1);
        sv.apply_sx(0, false);
        sv.apply_sx(0, false);
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_measure_collapses() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sv = Statevector::new(2);
        sv.apply_h(0);
        sv.apply_cx(0, 1);

        let first = sv.measure(0, &mut rng);
        let second = sv.measure(1, &mut rng);
        assert_eq!(first, second);

        sv.reset(0, &mut rng);
        assert!(sv.probability_one(0) < 1e-12);
    }

    #[test]
    fn test_sample_deterministic() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sv = Statevector::new(1);
        sv.apply_x(0);
        let cumulative = sv.cumulative_probabilities();
        for _ in 0..100 {
            assert_eq!(Statevector::sample_from(&cumulative, &mut rng), 1);
        }
    }
}
