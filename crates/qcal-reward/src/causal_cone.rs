//! Causal-cone reduction.
//!
//! Walks a circuit backwards from a set of qubits and keeps every operation
//! that can influence them. Barriers, delays and measurements never widen the
//! cone: they are kept restricted to the qubits already in it.

use std::collections::BTreeSet;

use tracing::debug;

use qcal_ir::{Circuit, ClbitId, Instruction, QubitId};

use crate::error::{RewardError, RewardResult};

/// The part of a circuit that can affect a qubit subset.
#[derive(Debug, Clone)]
pub struct CausalCone {
    /// Reduced circuit on the cone qubits.
    pub circuit: Circuit,
    /// Cone qubits in ascending order.
    pub qubits: Vec<QubitId>,
}

impl CausalCone {
    /// Number of qubits in the cone.
    pub fn len(&self) -> usize {
        self.qubits.len()
    }

    /// Whether the cone is empty.
    pub fn is_empty(&self) -> bool {
        self.qubits.is_empty()
    }
}

/// Reduce `circuit` to the operations that can affect `qubits`.
///
/// The result keeps the circuit's classical bits, inputs and global phase.
/// Applying the reduction to its own output returns the same cone.
pub fn causal_cone(circuit: &Circuit, qubits: &[QubitId]) -> RewardResult<CausalCone> {
    let known: BTreeSet<QubitId> = circuit.qubit_ids().into_iter().collect();
    let mut cone: BTreeSet<QubitId> = BTreeSet::new();
    for q in qubits {
        if !known.contains(q) {
            return Err(RewardError::Configuration(format!(
                "qubit {q} is not part of circuit '{}'",
                circuit.name()
            )));
        }
        cone.insert(*q);
    }

    let ops: Vec<&Instruction> = circuit.instructions().collect();
    let mut kept: Vec<Instruction> = Vec::new();
    for inst in ops.into_iter().rev() {
        if !inst.qubits.iter().any(|q| cone.contains(q)) {
            continue;
        }
        if inst.is_directive() {
            let mut restricted = inst.clone();
            restricted.qubits.retain(|q| cone.contains(q));
            kept.push(restricted);
        } else if inst.is_measure() {
            let (qs, cs): (Vec<QubitId>, Vec<ClbitId>) = inst
                .qubits
                .iter()
                .zip(&inst.clbits)
                .filter(|(q, _)| cone.contains(q))
                .map(|(q, c)| (*q, *c))
                .unzip();
            kept.push(Instruction::measure_all(qs, cs)?);
        } else {
            cone.extend(inst.qubits.iter().copied());
            kept.push(inst.clone());
        }
    }

    let cone_qubits: Vec<QubitId> = cone.into_iter().collect();
    let mut reduced = circuit.copy_empty_on(circuit.name().to_string(), &cone_qubits);
    for inst in kept.into_iter().rev() {
        reduced.append(inst)?;
    }
    debug!(
        "Causal cone of '{}' on {} qubit(s): {} of {} qubits, {} ops",
        circuit.name(),
        qubits.len(),
        cone_qubits.len(),
        circuit.num_qubits(),
        reduced.dag().num_ops()
    );

    Ok(CausalCone {
        circuit: reduced,
        qubits: cone_qubits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(circuit: &Circuit) -> Vec<String> {
        circuit.instructions().map(|i| i.name().to_string()).collect()
    }

    #[test]
    fn test_unrelated_qubits_are_dropped() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.x(QubitId(2)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let cone = causal_cone(&circuit, &[QubitId(1)]).unwrap();
        assert_eq!(cone.qubits, vec![QubitId(0), QubitId(1)]);
        assert_eq!(names(&cone.circuit), vec!["h", "cx"]);
    }

    #[test]
    fn test_later_operations_do_not_widen() {
        let mut circuit = Circuit::with_size("c", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.x(QubitId(1)).unwrap();
        // The X on q1 comes after the CX and cannot reach q0.
        let cone = causal_cone(&circuit, &[QubitId(0)]).unwrap();
        assert_eq!(cone.qubits, vec![QubitId(0), QubitId(1)]);
        assert_eq!(names(&cone.circuit), vec!["h", "cx"]);
    }

    #[test]
    fn test_barrier_is_restricted() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.barrier([QubitId(0), QubitId(1), QubitId(2)]).unwrap();
        circuit.x(QubitId(0)).unwrap();

        let cone = causal_cone(&circuit, &[QubitId(0)]).unwrap();
        assert_eq!(cone.qubits, vec![QubitId(0)]);
        let barrier = cone.circuit.instructions().nth(1).unwrap();
        assert!(barrier.is_barrier());
        assert_eq!(barrier.qubits, vec![QubitId(0)]);
    }

    #[test]
    fn test_idempotent() {
        let mut circuit = Circuit::with_size("c", 4, 0);
        circuit.h(QubitId(3)).unwrap();
        circuit.cx(QubitId(3), QubitId(2)).unwrap();
        circuit.barrier_all().unwrap();
        circuit.cx(QubitId(2), QubitId(1)).unwrap();
        circuit.rz(0.3, QubitId(0)).unwrap();

        let once = causal_cone(&circuit, &[QubitId(1)]).unwrap();
        let twice = causal_cone(&once.circuit, &[QubitId(1)]).unwrap();
        assert_eq!(once.qubits, twice.qubits);
        let a: Vec<_> = once.circuit.instructions().cloned().collect();
        let b: Vec<_> = twice.circuit.instructions().cloned().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_measure_all_is_restricted() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.x(QubitId(1)).unwrap();
        circuit.measure_all().unwrap();

        let cone = causal_cone(&circuit, &[QubitId(1)]).unwrap();
        assert_eq!(cone.qubits, vec![QubitId(1)]);
        let measure = cone.circuit.instructions().last().unwrap();
        assert!(measure.is_measure());
        assert_eq!(measure.qubits, vec![QubitId(1)]);
        assert_eq!(measure.clbits, vec![ClbitId(1)]);
    }

    #[test]
    fn test_unknown_qubit() {
        let circuit = Circuit::with_size("c", 1, 0);
        assert!(matches!(
            causal_cone(&circuit, &[QubitId(4)]),
            Err(RewardError::Configuration(_))
        ));
    }

    #[test]
    fn test_phase_and_clbits_survive() {
        let mut circuit = Circuit::with_size("c", 2, 0);
        circuit.add_creg("meas", 2);
        circuit.set_global_phase(0.5);
        circuit.x(QubitId(1)).unwrap();

        let cone = causal_cone(&circuit, &[QubitId(1)]).unwrap();
        assert_eq!(cone.circuit.num_clbits(), 2);
        assert!((cone.circuit.global_phase() - 0.5).abs() < 1e-12);
    }
}
