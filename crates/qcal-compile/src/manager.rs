//! Pass manager for orchestrating compilation.

use tracing::{debug, info, instrument};

use qcal_ir::CircuitDag;

use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{
    ApplyLayout, CancelCX, Optimize1qGates, RemoveFinalMeasurements, TrivialLayout,
    UnitarySynthesis,
};
use crate::property::{CouplingMap, Layout, PropertySet};

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given DAG.
    #[instrument(skip(self, dag, properties))]
    pub fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            dag.num_qubits()
        );

        for pass in &self.passes {
            if pass.should_run(dag, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(dag, properties)?;
                debug!("Pass {} completed, ops: {}", pass.name(), dag.num_ops());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, final depth: {}, ops: {}",
            dag.depth(),
            dag.num_ops()
        );

        Ok(())
    }

    /// Names of the scheduled passes, in order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating pass managers with preset configurations.
pub struct PassManagerBuilder {
    /// Optimization level (0-3).
    optimization_level: u8,
    /// Whether terminal measurements are stripped.
    remove_final_measurements: bool,
    /// Target properties.
    properties: PropertySet,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            optimization_level: 1,
            remove_final_measurements: false,
            properties: PropertySet::new(),
        }
    }

    /// Set the optimization level.
    ///
    /// - Level 0: Layout only
    /// - Level 1: + unitary synthesis (default)
    /// - Level 2: + 1q merging and CX cancellation
    /// - Level 3: + a second 1q merging sweep after cancellation
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(3);
        self
    }

    /// Set the target device.
    #[must_use]
    pub fn with_coupling_map(mut self, coupling_map: CouplingMap) -> Self {
        self.properties.coupling_map = Some(coupling_map);
        self
    }

    /// Fix the placement of logical qubits instead of the trivial layout.
    #[must_use]
    pub fn with_initial_layout(mut self, layout: Layout) -> Self {
        self.properties.layout = Some(layout);
        self
    }

    /// Strip measurements that end the circuit.
    #[must_use]
    pub fn with_remove_final_measurements(mut self, remove: bool) -> Self {
        self.remove_final_measurements = remove;
        self
    }

    /// Build the pass manager and return it with the properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();

        if self.remove_final_measurements {
            pm.add_pass(RemoveFinalMeasurements);
        }

        if self.properties.coupling_map.is_some() {
            pm.add_pass(TrivialLayout);
            pm.add_pass(ApplyLayout);
        }

        pm.add_pass(UnitarySynthesis);

        if self.optimization_level >= 2 {
            pm.add_pass(Optimize1qGates::new());
            pm.add_pass(CancelCX::new());
        }

        if self.optimization_level >= 3 {
            pm.add_pass(Optimize1qGates::new());
        }

        (pm, self.properties)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_ir::{Circuit, QubitId};

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);
    }

    #[test]
    fn test_pass_manager_run() {
        let pm = PassManager::new();
        let mut props = PropertySet::new();

        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let mut dag = circuit.into_dag();
        pm.run(&mut dag, &mut props).unwrap();

        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_builder_levels() {
        let (pm, props) = PassManagerBuilder::new()
            .with_optimization_level(3)
            .with_coupling_map(CouplingMap::linear(5))
            .build();

        assert_eq!(
            pm.pass_names(),
            vec![
                "TrivialLayout",
                "ApplyLayout",
                "UnitarySynthesis",
                "Optimize1qGates",
                "CancelCX",
                "Optimize1qGates"
            ]
        );
        assert!(props.coupling_map.is_some());

        let (pm, _) = PassManagerBuilder::new()
            .with_optimization_level(0)
            .with_remove_final_measurements(true)
            .build();
        assert_eq!(
            pm.pass_names(),
            vec!["RemoveFinalMeasurements", "UnitarySynthesis"]
        );
    }
}
