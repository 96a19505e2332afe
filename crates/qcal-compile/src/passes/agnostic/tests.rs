//! Tests for target-agnostic passes.

use std::f64::consts::PI;

use num_complex::Complex64;
use qcal_ir::{Circuit, CircuitDag, ClbitId, GateKind, QubitId};

use crate::pass::Pass;
use crate::property::PropertySet;
use crate::unitary::Unitary2x2;

use super::{CancelCX, Optimize1qGates, RemoveFinalMeasurements};

/// Full matrix of a single-qubit DAG, global phase included.
fn single_qubit_matrix(dag: &CircuitDag) -> Unitary2x2 {
    let mut u = Unitary2x2::identity();
    for (_, inst) in dag.topological_ops() {
        let gate = inst.as_gate().expect("only gates expected");
        let GateKind::Standard(std_gate) = &gate.kind else {
            panic!("unexpected custom gate");
        };
        u = Unitary2x2::from_gate(std_gate).expect("bound 1q gate") * u;
    }
    let g = Complex64::from_polar(1.0, dag.global_phase());
    Unitary2x2::new(u.data[0] * g, u.data[1] * g, u.data[2] * g, u.data[3] * g)
}

fn assert_same_matrix(a: &Unitary2x2, b: &Unitary2x2) {
    for i in 0..4 {
        assert!(
            (a.data[i] - b.data[i]).norm() < 1e-9,
            "entry {i}: {:?} vs {:?}",
            a.data[i],
            b.data[i]
        );
    }
}

#[test]
fn test_optimize_1q_hh_cancels() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    Optimize1qGates::new()
        .run(&mut dag, &mut PropertySet::new())
        .unwrap();
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn test_optimize_1q_merges_exactly() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.t(QubitId(0)).unwrap();
    circuit.rx(0.4, QubitId(0)).unwrap();
    circuit.s(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();
    let before = single_qubit_matrix(&dag);

    Optimize1qGates::new()
        .run(&mut dag, &mut PropertySet::new())
        .unwrap();

    assert_eq!(dag.num_ops(), 1);
    assert_same_matrix(&before, &single_qubit_matrix(&dag));
}

#[test]
fn test_optimize_1q_rz_2pi_keeps_phase() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rz(PI, QubitId(0)).unwrap();
    circuit.rz(PI, QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    Optimize1qGates::new()
        .run(&mut dag, &mut PropertySet::new())
        .unwrap();

    assert_eq!(dag.num_ops(), 0);
    assert!((dag.global_phase().abs() - PI).abs() < 1e-9);
}

#[test]
fn test_optimize_1q_stops_at_symbolic_and_barrier() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.rx(qcal_ir::ParameterExpression::symbol("theta"), QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    circuit.barrier_all().unwrap();
    circuit.h(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    Optimize1qGates::new()
        .run(&mut dag, &mut PropertySet::new())
        .unwrap();

    // Three single-gate runs become U gates; nothing merges across the
    // symbolic rotation or the barrier.
    assert_eq!(dag.num_ops(), 5);
}

#[test]
fn test_cancel_cx_adjacent() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    let mut dag = circuit.into_dag();

    CancelCX::new().run(&mut dag, &mut PropertySet::new()).unwrap();
    assert_eq!(dag.num_ops(), 0);
    assert_eq!(dag.depth(), 0);
}

#[test]
fn test_cancel_cx_respects_direction_and_blockers() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(1), QubitId(0)).unwrap();
    circuit.cx(QubitId(1), QubitId(0)).unwrap();
    circuit.z(QubitId(0)).unwrap();
    circuit.cx(QubitId(1), QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    CancelCX::new().run(&mut dag, &mut PropertySet::new()).unwrap();

    // The reversed pair cancels; the remaining CX(0,1), Z and CX(1,0) stay.
    assert_eq!(dag.num_ops(), 3);
    let names: Vec<_> = dag.topological_ops().map(|(_, i)| i.name().to_string()).collect();
    assert_eq!(names, vec!["cx", "z", "cx"]);
}

#[test]
fn test_remove_final_measurements() {
    let mut circuit = Circuit::with_size("test", 2, 2);
    circuit.h(QubitId(0)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    circuit.measure(QubitId(1), ClbitId(1)).unwrap();
    circuit.barrier_all().unwrap();
    let mut dag = circuit.into_dag();

    RemoveFinalMeasurements
        .run(&mut dag, &mut PropertySet::new())
        .unwrap();

    let names: Vec<_> = dag
        .topological_ops()
        .map(|(_, i)| i.name().to_string())
        .collect();
    assert_eq!(names, vec!["h", "measure", "h", "barrier"]);
}
