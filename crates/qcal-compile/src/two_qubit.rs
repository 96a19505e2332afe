//! Two-qubit unitary decomposition.
//!
//! Every 4x4 unitary factors as `(l1 ⊗ l0) · exp(i(a XX + b YY + c ZZ)) · (r1 ⊗ r0)`
//! times a global phase (the KAK decomposition). Each interaction term lowers
//! to a CX-Rz-CX block between single-qubit basis changes, so any two-qubit
//! unitary becomes at most six CX gates plus single-qubit gates, with the
//! global phase kept exact.
//!
//! Matrices are row-major and little-endian over the two operands: basis
//! index `b0 + 2 * b1`, where `b0` belongs to the first operand.

use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

use crate::unitary::{EPSILON, Unitary2x2};

/// Tolerance for accepting a matrix as a tensor product.
const PRODUCT_TOLERANCE: f64 = 1e-9;

/// Tolerance for accepting a decomposition against its input.
const RECONSTRUCTION_TOLERANCE: f64 = 1e-8;

/// Weights of the imaginary part when diagonalizing `Re(S) + w Im(S)`.
const MIXING_WEIGHTS: [f64; 4] = [
    0.618_033_988_749_895,
    1.414_213_562_373_095,
    2.718_281_828_459_045,
    0.318_309_886_183_791,
];

/// Upper bound on Jacobi sweeps.
const JACOBI_SWEEPS: usize = 64;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A 4x4 matrix in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct Unitary4x4 {
    /// The matrix elements in row-major order.
    pub data: [Complex64; 16],
}

impl Unitary4x4 {
    /// Build from a row-major slice of sixteen entries.
    pub fn from_slice(m: &[Complex64]) -> Option<Self> {
        let data: [Complex64; 16] = m.try_into().ok()?;
        Some(Self { data })
    }

    /// The identity matrix.
    pub fn identity() -> Self {
        Self::diagonal([ONE; 4])
    }

    /// Diagonal matrix with the given entries.
    pub fn diagonal(entries: [Complex64; 4]) -> Self {
        let mut data = [ZERO; 16];
        for (i, e) in entries.into_iter().enumerate() {
            data[i * 5] = e;
        }
        Self { data }
    }

    /// `high ⊗ low`, with `low` acting on the first operand.
    pub fn kron(high: &Unitary2x2, low: &Unitary2x2) -> Self {
        let mut data = [ZERO; 16];
        for r in 0..4 {
            for c in 0..4 {
                data[r * 4 + c] =
                    high.data[(r >> 1) * 2 + (c >> 1)] * low.data[(r & 1) * 2 + (c & 1)];
            }
        }
        Self { data }
    }

    /// A single-qubit matrix on operand 0 or 1.
    pub fn on_operand(operand: usize, m: &Unitary2x2) -> Self {
        let id = Unitary2x2::identity();
        if operand == 0 {
            Self::kron(&id, m)
        } else {
            Self::kron(m, &id)
        }
    }

    /// CX controlled by the first operand.
    pub fn cx() -> Self {
        let mut data = [ZERO; 16];
        for (r, c) in [(0, 0), (1, 3), (2, 2), (3, 1)] {
            data[r * 4 + c] = ONE;
        }
        Self { data }
    }

    /// Magic basis: its columns are Bell states with phases chosen so that
    /// local unitaries become real orthogonal matrices.
    fn magic() -> Self {
        let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
        let i = Complex64::new(0.0, FRAC_1_SQRT_2);
        Self {
            data: [
                s, ZERO, ZERO, i, //
                ZERO, i, s, ZERO, //
                ZERO, i, -s, ZERO, //
                s, ZERO, ZERO, -i,
            ],
        }
    }

    /// Entry at row `r`, column `c`.
    pub fn at(&self, r: usize, c: usize) -> Complex64 {
        self.data[r * 4 + c]
    }

    /// Multiply this matrix by another: self * other.
    pub fn mul(&self, other: &Self) -> Self {
        let mut data = [ZERO; 16];
        for r in 0..4 {
            for c in 0..4 {
                data[r * 4 + c] = (0..4).map(|k| self.at(r, k) * other.at(k, c)).sum();
            }
        }
        Self { data }
    }

    /// Transpose without conjugation.
    pub fn transpose(&self) -> Self {
        let mut data = [ZERO; 16];
        for r in 0..4 {
            for c in 0..4 {
                data[c * 4 + r] = self.at(r, c);
            }
        }
        Self { data }
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        let mut t = self.transpose();
        for z in &mut t.data {
            *z = z.conj();
        }
        t
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&self, factor: Complex64) -> Self {
        Self {
            data: self.data.map(|z| z * factor),
        }
    }

    /// Determinant by Gaussian elimination with partial pivoting.
    pub fn det(&self) -> Complex64 {
        let mut m = self.data;
        let mut det = ONE;
        for col in 0..4 {
            let pivot = (col..4)
                .max_by(|&a, &b| m[a * 4 + col].norm().total_cmp(&m[b * 4 + col].norm()))
                .unwrap_or(col);
            let p = m[pivot * 4 + col];
            if p.norm() == 0.0 {
                return ZERO;
            }
            if pivot != col {
                for k in 0..4 {
                    m.swap(pivot * 4 + k, col * 4 + k);
                }
                det = -det;
            }
            det *= p;
            for r in (col + 1)..4 {
                let f = m[r * 4 + col] / p;
                for k in col..4 {
                    let upper = m[col * 4 + k];
                    m[r * 4 + k] -= f * upper;
                }
            }
        }
        det
    }

    /// Largest entry-wise distance to `other`.
    pub fn max_distance(&self, other: &Self) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }

    /// Split into `e^(i phase) · (b ⊗ a)`, with `a` acting on the first
    /// operand.
    ///
    /// Returns `(a, b, phase)`, or `None` when the matrix entangles.
    pub fn tensor_factors(&self) -> Option<(Unitary2x2, Unitary2x2, f64)> {
        let m = &self.data;
        let at = |r: usize, c: usize| m[r * 4 + c];

        let (pivot, _) = m
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.norm().total_cmp(&y.norm()))?;
        let (pr, pc) = (pivot / 4, pivot % 4);
        let (r0, r1) = (pr & 1, pr >> 1);
        let (c0, c1) = (pc & 1, pc >> 1);

        // Slice through the pivot: the first-operand block at fixed second
        // operand indices, and vice versa.
        let a_raw = [
            at(r1 << 1, c1 << 1),
            at(r1 << 1, (c1 << 1) | 1),
            at((r1 << 1) | 1, c1 << 1),
            at((r1 << 1) | 1, (c1 << 1) | 1),
        ];
        let b_raw = [
            at(r0, c0),
            at(r0, c0 | 2),
            at(r0 | 2, c0),
            at(r0 | 2, c0 | 2),
        ];

        let normalize = |raw: [Complex64; 4]| {
            let scale = (raw[0].norm_sqr() + raw[2].norm_sqr())
                .max(raw[1].norm_sqr() + raw[3].norm_sqr())
                .sqrt();
            Unitary2x2::new(raw[0] / scale, raw[1] / scale, raw[2] / scale, raw[3] / scale)
        };
        let a = normalize(a_raw);
        let b = normalize(b_raw);

        let product = Self::kron(&b, &a);
        let reference = product.at(pr, pc);
        if reference.norm() < EPSILON {
            return None;
        }
        let phase = at(pr, pc) / reference;

        if self.max_distance(&product.scale(phase)) > PRODUCT_TOLERANCE {
            return None;
        }
        Some((a, b, phase.arg()))
    }
}

impl std::ops::Mul for Unitary4x4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Unitary4x4::mul(&self, &rhs)
    }
}

/// One gate of a lowered two-qubit unitary.
#[derive(Debug, Clone, Copy)]
pub enum TwoQubitGate {
    /// Single-qubit unitary on operand 0 or 1.
    Local(usize, Unitary2x2),
    /// CX with the first operand as control.
    Cx,
    /// Rz on the second operand.
    Rz(f64),
}

impl TwoQubitGate {
    /// Matrix of the gate on both operands.
    pub fn matrix(&self) -> Unitary4x4 {
        match self {
            TwoQubitGate::Local(operand, m) => Unitary4x4::on_operand(*operand, m),
            TwoQubitGate::Cx => Unitary4x4::cx(),
            TwoQubitGate::Rz(theta) => Unitary4x4::on_operand(1, &Unitary2x2::rz(*theta)),
        }
    }
}

/// Gate sequence implementing a two-qubit unitary.
#[derive(Debug, Clone)]
pub struct TwoQubitCircuit {
    /// Gates in application order.
    pub gates: Vec<TwoQubitGate>,
    /// Global phase.
    pub phase: f64,
}

impl TwoQubitCircuit {
    /// Unitary implemented by the sequence, including its global phase.
    pub fn matrix(&self) -> Unitary4x4 {
        self.gates
            .iter()
            .fold(Unitary4x4::identity(), |acc, g| g.matrix().mul(&acc))
            .scale(Complex64::from_polar(1.0, self.phase))
    }

    /// Number of CX gates.
    pub fn num_cx(&self) -> usize {
        self.gates
            .iter()
            .filter(|g| matches!(g, TwoQubitGate::Cx))
            .count()
    }
}

/// KAK decomposition of a two-qubit unitary.
///
/// The unitary equals
/// `e^(i phase) (after[1] ⊗ after[0]) exp(i(a XX + b YY + c ZZ)) (before[1] ⊗ before[0])`
/// with `[a, b, c] = interaction`.
#[derive(Debug, Clone, Copy)]
pub struct KakDecomposition {
    /// Single-qubit gates applied first, on the first and second operand.
    pub before: [Unitary2x2; 2],
    /// Interaction coefficients `[a, b, c]`.
    pub interaction: [f64; 3],
    /// Single-qubit gates applied last.
    pub after: [Unitary2x2; 2],
    /// Global phase.
    pub phase: f64,
}

impl KakDecomposition {
    /// Decompose `u`, or `None` if it is not unitary.
    pub fn new(u: &Unitary4x4) -> Option<Self> {
        let det = u.det();
        if (det.norm() - 1.0).abs() > 1e-6 {
            return None;
        }
        let phase = det.arg() / 4.0;
        let special = u.scale(Complex64::from_polar(1.0, -phase));

        // In the magic basis the local factors are real orthogonal and the
        // interaction is diagonal: m = k1 · d · k2.
        let magic = Unitary4x4::magic();
        let m = magic.dagger().mul(&special).mul(&magic);
        let symmetric = m.transpose().mul(&m);
        let p = real_eigenbasis(&symmetric)?;
        let diag = p.transpose().mul(&symmetric).mul(&p);

        let mut roots = [ZERO; 4];
        for (j, root) in roots.iter_mut().enumerate() {
            *root = Complex64::from_polar(1.0, diag.at(j, j).arg() / 2.0);
        }
        if roots.iter().product::<Complex64>().re < 0.0 {
            roots[0] = -roots[0];
        }

        let k1 = m.mul(&p).mul(&Unitary4x4::diagonal(roots.map(|r| r.conj())));
        let left = magic.mul(&k1).mul(&magic.dagger());
        let right = magic.mul(&p.transpose()).mul(&magic.dagger());
        let (l0, l1, left_phase) = left.tensor_factors()?;
        let (r0, r1, right_phase) = right.tensor_factors()?;

        // Magic columns are Φ+, iΨ+, Ψ-, iΦ-; the interaction eigenvalue on
        // each Bell state is the matching root.
        let [phi_plus, psi_plus, psi_minus, phi_minus] = roots.map(|r| r.arg());
        let alpha = (phi_plus + phi_minus + psi_plus + psi_minus) / 4.0;
        let a = (phi_plus - phi_minus + psi_plus - psi_minus) / 4.0;
        let b = (-phi_plus + phi_minus + psi_plus - psi_minus) / 4.0;
        let c = (phi_plus + phi_minus - psi_plus - psi_minus) / 4.0;

        Some(Self {
            before: [r0, r1],
            interaction: [a, b, c],
            after: [l0, l1],
            phase: phase + left_phase + right_phase + alpha,
        })
    }

    /// Lower to CX, Rz and single-qubit gates.
    ///
    /// `exp(i c ZZ)` is `CX · Rz(-2c) · CX`; the XX and YY terms are the same
    /// block conjugated by `H` and `S·H`. Vanishing terms emit no CX.
    pub fn to_cx_circuit(&self) -> TwoQubitCircuit {
        let h = Unitary2x2::h();
        let v = Unitary2x2::s() * h;
        let [a, b, c] = self.interaction;

        let mut builder = CircuitBuilder::new();
        builder.local(self.before);
        builder.zz(c);
        builder.local([v.dagger(); 2]);
        builder.zz(b);
        builder.local([h * v; 2]);
        builder.zz(a);
        builder.local([self.after[0] * h, self.after[1] * h]);
        builder.finish(self.phase)
    }
}

/// Accumulates single-qubit layers between entangling blocks.
struct CircuitBuilder {
    pending: [Unitary2x2; 2],
    gates: Vec<TwoQubitGate>,
}

impl CircuitBuilder {
    fn new() -> Self {
        Self {
            pending: [Unitary2x2::identity(); 2],
            gates: Vec::new(),
        }
    }

    fn local(&mut self, layer: [Unitary2x2; 2]) {
        for (pending, m) in self.pending.iter_mut().zip(layer) {
            *pending = m * *pending;
        }
    }

    fn zz(&mut self, coefficient: f64) {
        if coefficient.abs() < EPSILON {
            return;
        }
        self.flush();
        self.gates.extend([
            TwoQubitGate::Cx,
            TwoQubitGate::Rz(-2.0 * coefficient),
            TwoQubitGate::Cx,
        ]);
    }

    fn flush(&mut self) {
        for (operand, m) in self.pending.iter().enumerate() {
            self.gates.push(TwoQubitGate::Local(operand, *m));
        }
        self.pending = [Unitary2x2::identity(); 2];
    }

    fn finish(mut self, phase: f64) -> TwoQubitCircuit {
        self.flush();
        TwoQubitCircuit {
            gates: self.gates,
            phase,
        }
    }
}

/// Decompose a row-major 4x4 unitary into CX, Rz and single-qubit gates.
///
/// Returns `None` when the matrix is not a 4x4 unitary or the gate sequence
/// does not reproduce it.
pub fn decompose_two_qubit(matrix: &[Complex64]) -> Option<TwoQubitCircuit> {
    let u = Unitary4x4::from_slice(matrix)?;
    let circuit = KakDecomposition::new(&u)?.to_cx_circuit();
    (circuit.matrix().max_distance(&u) < RECONSTRUCTION_TOLERANCE).then_some(circuit)
}

/// Real orthogonal `p` with `pᵀ s p` diagonal, for a symmetric unitary `s`.
///
/// The real and imaginary parts of `s` commute, so a generic real mix of the
/// two shares their eigenvectors.
fn real_eigenbasis(s: &Unitary4x4) -> Option<Unitary4x4> {
    for weight in MIXING_WEIGHTS {
        let mixed = s.data.map(|z| z.re + weight * z.im);
        let p = Unitary4x4 {
            data: jacobi_eigenvectors(mixed).map(|x| Complex64::new(x, 0.0)),
        };
        let d = p.transpose().mul(s).mul(&p);
        let off_diagonal = (0..16)
            .filter(|k| k / 4 != k % 4)
            .map(|k| d.data[k].norm())
            .fold(0.0, f64::max);
        if off_diagonal < RECONSTRUCTION_TOLERANCE {
            return Some(p);
        }
    }
    None
}

fn real_mul(a: &[f64; 16], b: &[f64; 16]) -> [f64; 16] {
    let mut out = [0.0; 16];
    for r in 0..4 {
        for c in 0..4 {
            out[r * 4 + c] = (0..4).map(|k| a[r * 4 + k] * b[k * 4 + c]).sum();
        }
    }
    out
}

fn real_transpose(a: &[f64; 16]) -> [f64; 16] {
    let mut out = [0.0; 16];
    for r in 0..4 {
        for c in 0..4 {
            out[c * 4 + r] = a[r * 4 + c];
        }
    }
    out
}

/// Eigenvectors (as columns) of a real symmetric matrix by cyclic Jacobi
/// rotations. The result is a rotation: its determinant is +1.
fn jacobi_eigenvectors(mut a: [f64; 16]) -> [f64; 16] {
    let mut identity = [0.0; 16];
    for i in 0..4 {
        identity[i * 5] = 1.0;
    }
    let mut v = identity;

    for _ in 0..JACOBI_SWEEPS {
        let off: f64 = (0..16)
            .filter(|k| k / 4 != k % 4)
            .map(|k| a[k] * a[k])
            .sum();
        if off < 1e-30 {
            break;
        }
        for p in 0..3 {
            for q in (p + 1)..4 {
                let apq = a[p * 4 + q];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let theta = (a[q * 4 + q] - a[p * 4 + p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + theta.hypot(1.0));
                let c = 1.0 / t.hypot(1.0);
                let s = t * c;

                let mut j = identity;
                j[p * 4 + p] = c;
                j[q * 4 + q] = c;
                j[p * 4 + q] = s;
                j[q * 4 + p] = -s;
                a = real_mul(&real_transpose(&j), &real_mul(&a, &j));
                v = real_mul(&v, &j);
            }
        }
    }
    v
}
