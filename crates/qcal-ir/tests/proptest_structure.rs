//! Property-based tests for circuit composition and inversion.
//!
//! Checks that structural rewrites keep the DAG consistent and that
//! inversion and repetition act on instruction sequences as expected.

use qcal_ir::{Circuit, Instruction, QubitId};
use proptest::prelude::*;

/// Gate operations that can be applied to a circuit.
#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    S(u32),
    Rx(f64, u32),
    CX(u32, u32),
}

impl GateOp {
    fn apply(self, circuit: &mut Circuit) {
        match self {
            GateOp::H(q) => {
                let _ = circuit.h(QubitId(q));
            }
            GateOp::S(q) => {
                let _ = circuit.s(QubitId(q));
            }
            GateOp::Rx(theta, q) => {
                let _ = circuit.rx(theta, QubitId(q));
            }
            GateOp::CX(q1, q2) => {
                let _ = circuit.cx(QubitId(q1), QubitId(q2));
            }
        }
    }
}

fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
    let q = 0..num_qubits;
    prop_oneof![
        q.clone().prop_map(GateOp::H),
        q.clone().prop_map(GateOp::S),
        (-3.0_f64..3.0, q.clone()).prop_map(|(t, q)| GateOp::Rx(t, q)),
        (q.clone(), q).prop_map(|(a, b)| GateOp::CX(a, b)),
    ]
}

/// 1-4 qubits, 1-12 gates; CX with equal operands is rejected and skipped.
fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (1_u32..=4).prop_flat_map(|n| {
        prop::collection::vec(arb_gate_op(n), 1..=12).prop_map(move |ops| {
            let mut circuit = Circuit::with_size("random", n, 0);
            for op in ops {
                op.apply(&mut circuit);
            }
            circuit
        })
    })
}

proptest! {
    #[test]
    fn inverse_of_inverse_has_same_ops(circuit in arb_circuit()) {
        let twice = circuit.inverse().unwrap().inverse().unwrap();
        let a: Vec<Instruction> = circuit.instructions().cloned().collect();
        let b: Vec<Instruction> = twice.instructions().cloned().collect();
        prop_assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            prop_assert_eq!(x.name(), y.name());
            prop_assert_eq!(&x.qubits, &y.qubits);
        }
    }

    #[test]
    fn repeat_multiplies_op_count(circuit in arb_circuit(), n in 0_usize..4) {
        let repeated = circuit.repeat(n).unwrap();
        prop_assert_eq!(repeated.dag().num_ops(), circuit.dag().num_ops() * n);
        prop_assert!(repeated.depth() <= circuit.depth() * n);
    }

    #[test]
    fn compose_with_inverse_doubles_ops(circuit in arb_circuit()) {
        let mut host = circuit.copy_empty_like("host");
        let qubits = circuit.qubit_ids();
        host.compose(&circuit, &qubits).unwrap();
        host.barrier_all().unwrap();
        host.compose(&circuit.inverse().unwrap(), &qubits).unwrap();
        prop_assert_eq!(host.dag().num_ops(), 2 * circuit.dag().num_ops() + 1);
    }
}
