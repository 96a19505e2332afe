//! Circuit-level compilation entry point.

use tracing::{debug, instrument, warn};

use qcal_ir::Circuit;

use crate::error::{CompileError, CompileResult};
use crate::manager::PassManagerBuilder;
use crate::property::{CouplingMap, Layout};

/// Options for one transpilation.
#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// Optimization level (0-3).
    pub optimization_level: u8,
    /// Fixed placement of the circuit's qubits on the device.
    pub initial_layout: Option<Layout>,
    /// Allow runtime switches in the input.
    pub preserve_control_flow: bool,
    /// Strip measurements that end the circuit.
    pub remove_final_measurements: bool,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            optimization_level: 1,
            initial_layout: None,
            preserve_control_flow: false,
            remove_final_measurements: false,
        }
    }
}

impl TranspileOptions {
    /// Options at the given optimization level.
    pub fn new(optimization_level: u8) -> Self {
        Self {
            optimization_level,
            ..Self::default()
        }
    }

    /// Fix the initial layout.
    #[must_use]
    pub fn with_initial_layout(mut self, layout: Layout) -> Self {
        self.initial_layout = Some(layout);
        self
    }

    /// Keep runtime switches.
    #[must_use]
    pub fn with_control_flow(mut self, preserve: bool) -> Self {
        self.preserve_control_flow = preserve;
        self
    }

    /// Strip terminal measurements.
    #[must_use]
    pub fn with_remove_final_measurements(mut self, remove: bool) -> Self {
        self.remove_final_measurements = remove;
        self
    }
}

/// Compiles circuits for a particular device.
pub trait Transpiler: Send + Sync {
    /// Compile `circuit` onto the device.
    ///
    /// The result acts on the device's physical qubits and keeps the input's
    /// name, classical bits and declared inputs.
    fn transpile(&self, circuit: &Circuit, options: &TranspileOptions) -> CompileResult<Circuit>;
}

/// Transpiler driven by the pass pipeline for a fixed coupling map.
#[derive(Debug, Clone)]
pub struct DeviceTranspiler {
    coupling_map: CouplingMap,
}

impl DeviceTranspiler {
    /// Create a transpiler for the given device.
    pub fn new(coupling_map: CouplingMap) -> Self {
        Self { coupling_map }
    }

    /// The target device.
    pub fn coupling_map(&self) -> &CouplingMap {
        &self.coupling_map
    }

    /// Number of physical qubits on the device.
    pub fn num_qubits(&self) -> u32 {
        self.coupling_map.num_qubits()
    }
}

impl Transpiler for DeviceTranspiler {
    #[instrument(skip_all, fields(circuit = circuit.name(), level = options.optimization_level))]
    fn transpile(&self, circuit: &Circuit, options: &TranspileOptions) -> CompileResult<Circuit> {
        let mut level = options.optimization_level.min(3);
        if circuit.has_control_flow() {
            if !options.preserve_control_flow {
                return Err(CompileError::ControlFlowNotPreserved(
                    circuit.name().to_string(),
                ));
            }
            if level > 1 {
                warn!(
                    "Circuit '{}' has runtime control flow, clamping optimization level {} to 1",
                    circuit.name(),
                    level
                );
                level = 1;
            }
        }

        let mut builder = PassManagerBuilder::new()
            .with_optimization_level(level)
            .with_coupling_map(self.coupling_map.clone())
            .with_remove_final_measurements(options.remove_final_measurements);
        if let Some(layout) = &options.initial_layout {
            builder = builder.with_initial_layout(layout.clone());
        }
        let (pm, mut properties) = builder.build();

        let mut dag = circuit.dag().clone();
        pm.run(&mut dag, &mut properties)?;
        debug!(
            "Transpiled '{}': {} ops, depth {}",
            circuit.name(),
            dag.num_ops(),
            dag.depth()
        );

        Ok(circuit.with_dag(dag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_ir::{ClassicalInput, Instruction, QubitId, StandardGate, SwitchOp};

    fn switched_circuit() -> Circuit {
        let mut circuit = Circuit::with_size("sw", 1, 0);
        circuit.add_input("k", 1).unwrap();
        let op = SwitchOp::new(["k"])
            .with_case(
                vec![1],
                vec![Instruction::single_qubit_gate(StandardGate::X, QubitId(0))],
            )
            .unwrap();
        circuit.switch(op).unwrap();
        circuit
    }

    #[test]
    fn test_transpile_widens_to_device() {
        let mut circuit = Circuit::with_size("bell", 2, 0);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure_all().unwrap();

        let transpiler = DeviceTranspiler::new(CouplingMap::linear(4));
        let out = transpiler
            .transpile(&circuit, &TranspileOptions::default())
            .unwrap();

        assert_eq!(out.num_qubits(), 4);
        assert_eq!(out.name(), "bell");
        assert_eq!(out.num_clbits(), 2);
        assert_eq!(out.clbits()[0].register_name(), "meas");
    }

    #[test]
    fn test_control_flow_requires_opt_in() {
        let transpiler = DeviceTranspiler::new(CouplingMap::linear(2));
        let result = transpiler.transpile(&switched_circuit(), &TranspileOptions::default());
        assert!(matches!(result, Err(CompileError::ControlFlowNotPreserved(_))));
    }

    #[test]
    fn test_control_flow_clamps_level() {
        let transpiler = DeviceTranspiler::new(CouplingMap::linear(2));
        let options = TranspileOptions::new(3).with_control_flow(true);
        let out = transpiler.transpile(&switched_circuit(), &options).unwrap();

        assert!(out.has_control_flow());
        assert_eq!(out.inputs(), &[ClassicalInput::new("k", 1)]);
    }
}
