//! Integration tests for exact inversion and causal-cone reduction.
//!
//! A reference circuit followed by its resynthesized inverse must compose to
//! the identity up to global phase.

use num_complex::Complex64;
use proptest::prelude::*;

use qcal_adapter_sim::UnitarySimulator;
use qcal_compile::{CouplingMap, DeviceTranspiler, Layout};
use qcal_hal::UnitaryBackend;
use qcal_ir::{Circuit, GateKind, QubitId};
use qcal_reward::{ExactInverter, RewardError, causal_cone};

/// |tr(U)| / dim of `reference` followed by its computed inverse.
fn round_trip_fidelity(reference: &Circuit, device_qubits: u32) -> f64 {
    let simulator = UnitarySimulator::new();
    let transpiler = DeviceTranspiler::new(CouplingMap::linear(device_qubits));
    let qubits = reference.qubit_ids();
    let layout = Layout::trivial(qubits.iter().copied());

    let inverse = ExactInverter::new(&simulator, &transpiler)
        .invert(reference, &qubits, &layout)
        .unwrap();
    let logical = inverse.to_logical().unwrap();

    let mut check = reference.clone();
    check.compose(&logical, &logical.qubit_ids()).unwrap();
    let u = simulator.unitary(&check).unwrap();
    let dim = u.nrows() as f64;
    u.diag().iter().sum::<Complex64>().norm() / dim
}

// ============================================================================
// Fixed circuits
// ============================================================================

#[test]
fn test_single_qubit_rotation() {
    let mut reference = Circuit::with_size("rot", 1, 0);
    reference
        .rx(0.37, QubitId(0))
        .unwrap()
        .rz(-1.2, QubitId(0))
        .unwrap()
        .sx(QubitId(0))
        .unwrap();
    assert!(round_trip_fidelity(&reference, 1) > 1.0 - 1e-6);
}

#[test]
fn test_two_qubit_entangler() {
    let mut reference = Circuit::with_size("ent", 2, 0);
    reference
        .h(QubitId(0))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .rzz(0.8, QubitId(0), QubitId(1))
        .unwrap();
    assert!(round_trip_fidelity(&reference, 2) > 1.0 - 1e-6);
}

#[test]
fn test_entangling_inverse_lowers_to_standard_gates() {
    let simulator = UnitarySimulator::new();
    let transpiler = DeviceTranspiler::new(CouplingMap::linear(2));
    let mut reference = Circuit::with_size("ent", 2, 0);
    reference
        .h(QubitId(0))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .rzz(0.8, QubitId(0), QubitId(1))
        .unwrap();
    let qubits = reference.qubit_ids();

    let inverse = ExactInverter::new(&simulator, &transpiler)
        .invert(&reference, &qubits, &Layout::trivial(qubits.iter().copied()))
        .unwrap();
    let gates: Vec<_> = inverse
        .circuit
        .instructions()
        .filter_map(|inst| inst.as_gate())
        .collect();
    assert!(!gates.is_empty());
    assert!(gates.iter().all(|g| matches!(g.kind, GateKind::Standard(_))));
    assert!(round_trip_fidelity(&reference, 2) > 1.0 - 1e-6);
}

#[test]
fn test_inverse_on_mapped_qubit() {
    let simulator = UnitarySimulator::new();
    let transpiler = DeviceTranspiler::new(CouplingMap::linear(3));
    let mut reference = Circuit::with_size("mapped", 1, 0);
    reference.ry(0.9, QubitId(0)).unwrap();
    let layout = Layout::from_pairs([(QubitId(0), 2)]);

    let inverse = ExactInverter::new(&simulator, &transpiler)
        .invert(&reference, &[QubitId(0)], &layout)
        .unwrap();
    assert_eq!(inverse.physical_qubits, vec![QubitId(2)]);
    assert_eq!(inverse.logical_qubits, vec![QubitId(0)]);
    assert_eq!(inverse.circuit.qubit_ids(), vec![QubitId(2)]);
}

#[test]
fn test_unsimulable_reference() {
    let simulator = UnitarySimulator::new();
    let transpiler = DeviceTranspiler::new(CouplingMap::linear(1));
    let mut reference = Circuit::with_size("measured", 1, 1);
    reference.h(QubitId(0)).unwrap().reset(QubitId(0)).unwrap();

    let err = ExactInverter::new(&simulator, &transpiler)
        .invert(&reference, &[QubitId(0)], &Layout::trivial([QubitId(0)]))
        .unwrap_err();
    assert!(matches!(err, RewardError::Simulation { .. }));
}

// ============================================================================
// Random circuits
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Rx(f64, u32),
    Rz(f64, u32),
    H(u32),
    Cx(u32, u32),
    Rzz(f64, u32, u32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    let q = 0u32..2;
    let angle = -3.2f64..3.2;
    prop_oneof![
        (angle.clone(), q.clone()).prop_map(|(t, q)| Op::Rx(t, q)),
        (angle.clone(), q.clone()).prop_map(|(t, q)| Op::Rz(t, q)),
        q.prop_map(Op::H),
        any::<bool>().prop_map(|flip| if flip { Op::Cx(1, 0) } else { Op::Cx(0, 1) }),
        angle.prop_map(|t| Op::Rzz(t, 0, 1)),
    ]
}

fn build(ops: &[Op]) -> Circuit {
    let mut c = Circuit::with_size("random", 2, 0);
    for op in ops {
        match *op {
            Op::Rx(t, q) => c.rx(t, QubitId(q)),
            Op::Rz(t, q) => c.rz(t, QubitId(q)),
            Op::H(q) => c.h(QubitId(q)),
            Op::Cx(a, b) => c.cx(QubitId(a), QubitId(b)),
            Op::Rzz(t, a, b) => c.rzz(t, QubitId(a), QubitId(b)),
        }
        .unwrap();
    }
    c
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_random_inverse_is_exact(ops in prop::collection::vec(arb_op(), 1..=6)) {
        let reference = build(&ops);
        prop_assert!(round_trip_fidelity(&reference, 2) > 1.0 - 1e-6);
    }

    #[test]
    fn prop_causal_cone_is_idempotent(
        ops in prop::collection::vec(arb_op(), 0..=8),
        target in 0u32..2,
    ) {
        let circuit = build(&ops);
        let once = causal_cone(&circuit, &[QubitId(target)]).unwrap();
        let twice = causal_cone(&once.circuit, &[QubitId(target)]).unwrap();
        prop_assert_eq!(&once.qubits, &twice.qubits);
        prop_assert_eq!(once.circuit.dag().num_ops(), twice.circuit.dag().num_ops());
        prop_assert!(once.qubits.contains(&QubitId(target)));
    }
}
