//! Synthesis of explicit unitary gates into standard gates.

use num_complex::Complex64;
use tracing::{debug, warn};

use qcal_ir::{CircuitDag, GateKind, Instruction, InstructionKind, NodeIndex, QubitId, StandardGate};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;
use crate::two_qubit::{TwoQubitGate, Unitary4x4, decompose_two_qubit};
use crate::unitary::{EPSILON, Unitary2x2};

/// Unitary synthesis pass.
///
/// Rewrites explicit [`qcal_ir::CustomGate`] unitaries into standard gates
/// with the global phase tracked exactly:
///
/// - 1-qubit matrices become a single `U` gate, or vanish when proportional
///   to the identity.
/// - 2-qubit matrices that factor as a tensor product become one `U` gate
///   per qubit.
/// - Entangling 2-qubit matrices become CX, Rz and `U` gates through the
///   KAK decomposition.
/// - Wider matrices are kept as explicit unitaries for the backend.
pub struct UnitarySynthesis;

/// Replacement for one unitary node.
struct Synthesized {
    gates: Vec<Instruction>,
    phase: f64,
}

impl UnitarySynthesis {
    fn synthesize_1q(matrix: &Unitary2x2, qubit: QubitId) -> Synthesized {
        let (theta, phi, lambda, phase) = matrix.u3_decomposition();
        if theta.abs() < EPSILON && Unitary2x2::normalize_angle(phi + lambda).abs() < EPSILON {
            // U(0, φ, -φ) is the identity.
            return Synthesized {
                gates: vec![],
                phase,
            };
        }
        Synthesized {
            gates: vec![Instruction::single_qubit_gate(
                StandardGate::U(theta.into(), phi.into(), lambda.into()),
                qubit,
            )],
            phase,
        }
    }

    /// Lower a two-qubit matrix: tensor products become one `U` per qubit,
    /// anything else goes through the KAK decomposition.
    fn synthesize_2q(matrix: &[Complex64], q0: QubitId, q1: QubitId) -> Option<Synthesized> {
        let u = Unitary4x4::from_slice(matrix)?;
        if let Some((a, b, phase)) = u.tensor_factors() {
            let first = Self::synthesize_1q(&a, q0);
            let second = Self::synthesize_1q(&b, q1);
            return Some(Synthesized {
                phase: phase + first.phase + second.phase,
                gates: first.gates.into_iter().chain(second.gates).collect(),
            });
        }

        let circuit = decompose_two_qubit(matrix)?;
        let mut gates = Vec::new();
        let mut phase = circuit.phase;
        for gate in circuit.gates {
            match gate {
                TwoQubitGate::Local(operand, m) => {
                    let local = Self::synthesize_1q(&m, if operand == 0 { q0 } else { q1 });
                    phase += local.phase;
                    gates.extend(local.gates);
                }
                TwoQubitGate::Cx => {
                    gates.push(Instruction::two_qubit_gate(StandardGate::CX, q0, q1));
                }
                TwoQubitGate::Rz(theta) => {
                    gates.push(Instruction::single_qubit_gate(StandardGate::Rz(theta.into()), q1));
                }
            }
        }
        Some(Synthesized { gates, phase })
    }

    fn synthesize(inst: &Instruction) -> Option<Synthesized> {
        let InstructionKind::Gate(gate) = &inst.kind else {
            return None;
        };
        let GateKind::Custom(custom) = &gate.kind else {
            return None;
        };
        let matrix = custom.matrix.as_ref()?;

        match inst.qubits.as_slice() {
            [q] => Unitary2x2::from_slice(matrix).map(|u| Self::synthesize_1q(&u, *q)),
            [q0, q1] => {
                let synthesized = Self::synthesize_2q(matrix, *q0, *q1);
                if synthesized.is_none() {
                    warn!("Keeping '{}' as an explicit unitary", inst.name());
                }
                synthesized
            }
            _ => None,
        }
    }
}

impl Pass for UnitarySynthesis {
    fn name(&self) -> &'static str {
        "UnitarySynthesis"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let plans: Vec<(NodeIndex, Synthesized)> = dag
            .topological_ops()
            .filter_map(|(idx, inst)| Self::synthesize(inst).map(|s| (idx, s)))
            .collect();
        if plans.is_empty() {
            return Ok(());
        }

        // Rebuild in topological order, splicing the replacements in place.
        let mut replacements: rustc_hash::FxHashMap<NodeIndex, Synthesized> =
            plans.into_iter().collect();
        let mut rebuilt = CircuitDag::new();
        for q in dag.qubits() {
            rebuilt.add_qubit(q);
        }
        for c in dag.clbits() {
            rebuilt.add_clbit(c);
        }
        rebuilt.set_level(dag.level());

        let mut phase = dag.global_phase();
        let ops: Vec<(NodeIndex, Instruction)> = dag
            .topological_ops()
            .map(|(idx, inst)| (idx, inst.clone()))
            .collect();
        for (idx, inst) in ops {
            match replacements.remove(&idx) {
                Some(plan) => {
                    debug!(
                        "Synthesized '{}' into {} gate(s)",
                        inst.name(),
                        plan.gates.len()
                    );
                    phase += plan.phase;
                    for gate in plan.gates {
                        rebuilt.apply(gate)?;
                    }
                }
                None => {
                    rebuilt.apply(inst)?;
                }
            }
        }
        rebuilt.set_global_phase(Unitary2x2::normalize_angle(phase));

        *dag = rebuilt;
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.topological_ops().any(|(_, inst)| {
            inst.as_gate()
                .is_some_and(|g| matches!(g.kind, GateKind::Custom(_)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_ir::Circuit;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_1q_unitary_becomes_u() {
        let h = vec![
            c(FRAC_1_SQRT_2, 0.0),
            c(FRAC_1_SQRT_2, 0.0),
            c(FRAC_1_SQRT_2, 0.0),
            c(-FRAC_1_SQRT_2, 0.0),
        ];
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.unitary(h, &[QubitId(0)], "h_like").unwrap();
        let mut dag = circuit.into_dag();

        UnitarySynthesis.run(&mut dag, &mut PropertySet::new()).unwrap();
        let names: Vec<_> = dag.topological_ops().map(|(_, i)| i.name().to_string()).collect();
        assert_eq!(names, vec!["u"]);
    }

    #[test]
    fn test_phased_identity_vanishes_into_global_phase() {
        let i_phase = c(0.0, 1.0);
        let m = vec![i_phase, c(0.0, 0.0), c(0.0, 0.0), i_phase];
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.unitary(m, &[QubitId(0)], "phase").unwrap();
        let mut dag = circuit.into_dag();

        UnitarySynthesis.run(&mut dag, &mut PropertySet::new()).unwrap();
        assert_eq!(dag.num_ops(), 0);
        assert!((dag.global_phase() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_product_unitary_splits() {
        // X on the first operand, identity on the second: little-endian
        // index k = b0 + 2 b1 flips b0.
        let mut m = vec![c(0.0, 0.0); 16];
        for (r, col) in [(0, 1), (1, 0), (2, 3), (3, 2)] {
            m[r * 4 + col] = c(0.0, -1.0);
        }
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.unitary(m, &[QubitId(0), QubitId(1)], "x0").unwrap();
        let mut dag = circuit.into_dag();

        UnitarySynthesis.run(&mut dag, &mut PropertySet::new()).unwrap();
        let ops: Vec<_> = dag.topological_ops().map(|(_, i)| i.clone()).collect();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].qubits, vec![QubitId(0)]);
    }

    /// Rebuild the unitary of a synthesized two-qubit DAG.
    fn dag_matrix(dag: &CircuitDag) -> Unitary4x4 {
        let mut acc = Unitary4x4::identity();
        for (_, inst) in dag.topological_ops() {
            let Some(GateKind::Standard(gate)) = inst.as_gate().map(|g| &g.kind) else {
                panic!("unexpected instruction {}", inst.name());
            };
            let m = match (gate, inst.qubits.as_slice()) {
                (StandardGate::CX, [q0, _]) => {
                    assert_eq!(*q0, QubitId(0));
                    Unitary4x4::cx()
                }
                (g, [q]) => Unitary4x4::on_operand(q.0 as usize, &Unitary2x2::from_gate(g).unwrap()),
                _ => panic!("unexpected gate {}", inst.name()),
            };
            acc = m.mul(&acc);
        }
        acc.scale(Complex64::from_polar(1.0, dag.global_phase()))
    }

    #[test]
    fn test_entangling_unitary_lowers_to_cx() {
        // CX with control on the first operand, times a phase.
        let phase = c(0.6, 0.8);
        let mut m = vec![c(0.0, 0.0); 16];
        for (r, col) in [(0, 0), (1, 3), (2, 2), (3, 1)] {
            m[r * 4 + col] = phase;
        }
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.unitary(m.clone(), &[QubitId(0), QubitId(1)], "cx_like").unwrap();
        let mut dag = circuit.into_dag();

        UnitarySynthesis.run(&mut dag, &mut PropertySet::new()).unwrap();
        let names: Vec<_> = dag.topological_ops().map(|(_, i)| i.name().to_string()).collect();
        assert!(names.iter().all(|n| matches!(n.as_str(), "u" | "cx" | "rz")));
        assert!(names.iter().any(|n| n == "cx"));

        let expected = Unitary4x4::from_slice(&m).unwrap();
        assert!(dag_matrix(&dag).max_distance(&expected) < 1e-8);
    }

    #[test]
    fn test_three_qubit_unitary_is_kept() {
        let mut m = vec![c(0.0, 0.0); 64];
        for k in 0..8 {
            m[k * 8 + (k ^ 0b111)] = c(1.0, 0.0);
        }
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit
            .unitary(m, &[QubitId(0), QubitId(1), QubitId(2)], "flip3")
            .unwrap();
        let mut dag = circuit.into_dag();

        UnitarySynthesis.run(&mut dag, &mut PropertySet::new()).unwrap();
        let names: Vec<_> = dag.topological_ops().map(|(_, i)| i.name().to_string()).collect();
        assert_eq!(names, vec!["flip3"]);
    }
}
