//! Property tests checking that compilation preserves one- and two-qubit
//! unitaries exactly, global phase included.
//!
//! Reward circuits are inverted after compilation, so a pass that drops a
//! phase or reorders a product would make the inverse wrong.

use num_complex::Complex64;
use proptest::prelude::*;

use qcal_compile::{
    CouplingMap, DeviceTranspiler, TranspileOptions, Transpiler, Unitary2x2, Unitary4x4,
};
use qcal_ir::{Circuit, GateKind, QubitId, StandardGate};

#[derive(Debug, Clone)]
enum OneQ {
    H,
    S,
    T,
    SX,
    X,
    Rx(f64),
    Ry(f64),
    Rz(f64),
    U(f64, f64, f64),
}

fn arb_gate() -> impl Strategy<Value = OneQ> {
    let angle = -6.3f64..6.3;
    prop_oneof![
        Just(OneQ::H),
        Just(OneQ::S),
        Just(OneQ::T),
        Just(OneQ::SX),
        Just(OneQ::X),
        angle.clone().prop_map(OneQ::Rx),
        angle.clone().prop_map(OneQ::Ry),
        angle.clone().prop_map(OneQ::Rz),
        (angle.clone(), angle.clone(), angle).prop_map(|(a, b, c)| OneQ::U(a, b, c)),
    ]
}

fn build(gates: &[OneQ]) -> Circuit {
    let q = QubitId(0);
    let mut circuit = Circuit::with_size("chain", 1, 0);
    for g in gates {
        match g {
            OneQ::H => circuit.h(q),
            OneQ::S => circuit.s(q),
            OneQ::T => circuit.t(q),
            OneQ::SX => circuit.sx(q),
            OneQ::X => circuit.x(q),
            OneQ::Rx(t) => circuit.rx(*t, q),
            OneQ::Ry(t) => circuit.ry(*t, q),
            OneQ::Rz(t) => circuit.rz(*t, q),
            OneQ::U(a, b, c) => circuit.u(*a, *b, *c, q),
        }
        .unwrap();
    }
    circuit
}

/// Full matrix of a one-qubit circuit including its global phase.
fn circuit_matrix(circuit: &Circuit) -> Unitary2x2 {
    let mut m = Unitary2x2::identity();
    for inst in circuit.instructions() {
        let gate = inst.as_gate().expect("only gates");
        let u = match &gate.kind {
            GateKind::Standard(g) => Unitary2x2::from_gate(g).expect("bound gate"),
            GateKind::Custom(c) => {
                Unitary2x2::from_slice(c.matrix.as_deref().expect("matrix")).expect("2x2")
            }
        };
        m = u * m;
    }
    let phase = Complex64::from_polar(1.0, circuit.global_phase());
    let [a, b, c, d] = m.data;
    Unitary2x2::new(a * phase, b * phase, c * phase, d * phase)
}

fn assert_close(a: &Unitary2x2, b: &Unitary2x2) {
    for (x, y) in a.data.iter().zip(b.data.iter()) {
        assert!((x - y).norm() < 1e-8, "{a:?} != {b:?}");
    }
}

proptest! {
    #[test]
    fn optimization_preserves_matrix(gates in prop::collection::vec(arb_gate(), 1..12), level in 0u8..=3) {
        let circuit = build(&gates);
        let transpiler = DeviceTranspiler::new(CouplingMap::linear(1));
        let compiled = transpiler.transpile(&circuit, &TranspileOptions::new(level)).unwrap();

        assert_close(&circuit_matrix(&circuit), &circuit_matrix(&compiled));
    }

    #[test]
    fn optimized_chain_has_at_most_one_gate(gates in prop::collection::vec(arb_gate(), 1..12)) {
        let circuit = build(&gates);
        let transpiler = DeviceTranspiler::new(CouplingMap::linear(1));
        let compiled = transpiler.transpile(&circuit, &TranspileOptions::new(2)).unwrap();

        prop_assert!(compiled.instructions().count() <= 1);
    }
}

#[test]
fn test_explicit_unitary_survives_synthesis() {
    let m = Unitary2x2::u(0.4, -1.1, 2.3);
    let mut phased = m.data.to_vec();
    let phase = Complex64::from_polar(1.0, 0.7);
    for x in &mut phased {
        *x *= phase;
    }

    let mut circuit = Circuit::with_size("explicit", 1, 0);
    circuit.unitary(phased.clone(), &[QubitId(0)], "m").unwrap();
    let compiled = DeviceTranspiler::new(CouplingMap::linear(1))
        .transpile(&circuit, &TranspileOptions::new(1))
        .unwrap();

    let names: Vec<_> = compiled.instructions().map(|i| i.name().to_string()).collect();
    assert_eq!(names, vec!["u"]);
    let expected = Unitary2x2::from_slice(&phased).unwrap();
    assert_close(&expected, &circuit_matrix(&compiled));
}

#[test]
fn test_cx_pair_cancels_on_device() {
    let mut circuit = Circuit::with_size("cx", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let compiled = DeviceTranspiler::new(CouplingMap::linear(3))
        .transpile(&circuit, &TranspileOptions::new(2))
        .unwrap();
    assert_eq!(compiled.instructions().count(), 0);

    let kept = DeviceTranspiler::new(CouplingMap::linear(3))
        .transpile(&circuit, &TranspileOptions::new(1))
        .unwrap();
    assert!(kept
        .instructions()
        .all(|i| matches!(i.as_gate().map(|g| &g.kind), Some(GateKind::Standard(StandardGate::CX)))));
}

// ============================================================================
// Two-qubit unitaries
// ============================================================================

/// Full matrix of a two-qubit circuit of standard gates.
fn circuit_matrix_2q(circuit: &Circuit) -> Unitary4x4 {
    let mut m = Unitary4x4::identity();
    for inst in circuit.instructions() {
        let Some(GateKind::Standard(gate)) = inst.as_gate().map(|g| &g.kind) else {
            panic!("unexpected instruction {}", inst.name());
        };
        let u = match (gate, inst.qubits.as_slice()) {
            (StandardGate::CX, [QubitId(0), QubitId(1)]) => Unitary4x4::cx(),
            (g, [q]) => {
                Unitary4x4::on_operand(q.0 as usize, &Unitary2x2::from_gate(g).expect("bound gate"))
            }
            _ => panic!("unexpected gate {}", inst.name()),
        };
        m = u.mul(&m);
    }
    m.scale(Complex64::from_polar(1.0, circuit.global_phase()))
}

proptest! {
    #[test]
    fn two_qubit_synthesis_preserves_matrix(
        angles in prop::collection::vec(-3.2f64..3.2, 7),
        level in 0u8..=3,
    ) {
        let mut source = Circuit::with_size("source", 2, 0);
        source
            .u(angles[0], angles[1], angles[2], QubitId(0)).unwrap()
            .cx(QubitId(0), QubitId(1)).unwrap()
            .ry(angles[3], QubitId(1)).unwrap()
            .cx(QubitId(0), QubitId(1)).unwrap()
            .rz(angles[4], QubitId(1)).unwrap()
            .rx(angles[5], QubitId(0)).unwrap()
            .cx(QubitId(0), QubitId(1)).unwrap()
            .rz(angles[6], QubitId(1)).unwrap();
        let target = circuit_matrix_2q(&source);

        let mut circuit = Circuit::with_size("explicit", 2, 0);
        circuit.unitary(target.data.to_vec(), &[QubitId(0), QubitId(1)], "m").unwrap();
        let compiled = DeviceTranspiler::new(CouplingMap::linear(2))
            .transpile(&circuit, &TranspileOptions::new(level))
            .unwrap();

        prop_assert!(circuit_matrix_2q(&compiled).max_distance(&target) < 1e-8);
    }
}
