//! Layout passes for mapping logical qubits to physical qubits.

use rustc_hash::FxHashMap;
use tracing::warn;

use qcal_ir::{CircuitDag, CircuitLevel, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{Layout, PropertySet};

/// Trivial layout pass.
///
/// Places logical qubit `q` on physical qubit `q.0`. Runs only when the
/// caller did not supply a layout.
pub struct TrivialLayout;

impl Pass for TrivialLayout {
    fn name(&self) -> &'static str {
        "TrivialLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;

        let qubits = dag.qubits();
        let available = coupling_map.num_qubits();
        if qubits.iter().any(|q| q.0 >= available) {
            return Err(CompileError::CircuitTooLarge {
                required: qubits.last().map_or(0, |q| q.0 as usize + 1),
                available,
            });
        }

        properties.layout = Some(Layout::trivial(qubits));
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.layout.is_none() && properties.coupling_map.is_some()
    }
}

/// Lowers a circuit onto the device.
///
/// Rebuilds the DAG on physical qubits `0..n` of an `n`-qubit device,
/// relabelling every operand (including inside switch arms) through the
/// layout. Classical bits and the global phase carry over unchanged.
/// Two-qubit gates on uncoupled pairs are kept and reported; routing is left
/// to the backend.
pub struct ApplyLayout;

impl ApplyLayout {
    fn physical_map(
        dag: &CircuitDag,
        properties: &PropertySet,
    ) -> CompileResult<(FxHashMap<QubitId, QubitId>, u32)> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let layout = properties
            .layout
            .as_ref()
            .ok_or(CompileError::MissingLayout)?;
        let available = coupling_map.num_qubits();

        let mut map = FxHashMap::default();
        for logical in dag.qubits() {
            let physical = layout
                .get_physical(logical)
                .ok_or(CompileError::IncompleteLayout(logical))?;
            if physical >= available {
                return Err(CompileError::PhysicalQubitOutOfRange {
                    logical,
                    physical,
                    available,
                });
            }
            map.insert(logical, QubitId(physical));
        }
        Ok((map, available))
    }
}

impl Pass for ApplyLayout {
    fn name(&self) -> &'static str {
        "ApplyLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let (qubit_map, available) = Self::physical_map(dag, properties)?;
        let clbit_map = FxHashMap::default();

        let mut physical = CircuitDag::new();
        for p in 0..available {
            physical.add_qubit(QubitId(p));
        }
        for c in dag.clbits() {
            physical.add_clbit(c);
        }
        physical.set_global_phase(dag.global_phase());
        physical.set_level(CircuitLevel::Physical);

        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;

        let ops: Vec<_> = dag
            .topological_ops()
            .map(|(_, inst)| inst.remap(&qubit_map, &clbit_map))
            .collect();
        for inst in ops {
            if inst.is_gate() && inst.qubits.len() == 2 {
                let (p0, p1) = (inst.qubits[0].0, inst.qubits[1].0);
                if !coupling_map.is_connected(p0, p1) {
                    warn!(
                        "Gate '{}' acts on uncoupled physical qubits {} and {}",
                        inst.name(),
                        p0,
                        p1
                    );
                }
            }
            physical.apply(inst)?;
        }

        *dag = physical;
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.level() == CircuitLevel::Logical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::CouplingMap;
    use qcal_ir::{Circuit, ClbitId};

    #[test]
    fn test_trivial_layout() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        let mut props = PropertySet::new().with_coupling_map(CouplingMap::linear(5));
        TrivialLayout.run(&mut dag, &mut props).unwrap();

        let layout = props.layout.as_ref().unwrap();
        assert_eq!(layout.get_physical(QubitId(0)), Some(0));
        assert_eq!(layout.get_physical(QubitId(2)), Some(2));
    }

    #[test]
    fn test_trivial_layout_too_large() {
        let mut dag = Circuit::with_size("test", 10, 0).into_dag();
        let mut props = PropertySet::new().with_coupling_map(CouplingMap::linear(5));

        let result = TrivialLayout.run(&mut dag, &mut props);
        assert!(matches!(result, Err(CompileError::CircuitTooLarge { .. })));
    }

    #[test]
    fn test_apply_layout_relabels_and_widens() {
        let mut circuit = Circuit::with_size("test", 2, 1);
        circuit.x(QubitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        let layout = Layout::from_pairs([(QubitId(0), 2), (QubitId(1), 0)]);
        let mut props = PropertySet::new()
            .with_coupling_map(CouplingMap::linear(4))
            .with_layout(layout);
        ApplyLayout.run(&mut dag, &mut props).unwrap();

        assert_eq!(dag.num_qubits(), 4);
        assert_eq!(dag.num_clbits(), 1);
        assert_eq!(dag.level(), CircuitLevel::Physical);
        let qubits: Vec<_> = dag.topological_ops().map(|(_, i)| i.qubits[0]).collect();
        assert_eq!(qubits, vec![QubitId(2), QubitId(2)]);
    }

    #[test]
    fn test_apply_layout_rejects_bad_layouts() {
        let dag = Circuit::with_size("test", 2, 0).into_dag();

        let mut props = PropertySet::new()
            .with_coupling_map(CouplingMap::linear(3))
            .with_layout(Layout::from_pairs([(QubitId(0), 1)]));
        let mut d = dag.clone();
        assert!(matches!(
            ApplyLayout.run(&mut d, &mut props),
            Err(CompileError::IncompleteLayout(QubitId(1)))
        ));

        props.layout = Some(Layout::from_pairs([(QubitId(0), 1), (QubitId(1), 7)]));
        let mut d = dag.clone();
        assert!(matches!(
            ApplyLayout.run(&mut d, &mut props),
            Err(CompileError::PhysicalQubitOutOfRange { physical: 7, .. })
        ));
    }
}
