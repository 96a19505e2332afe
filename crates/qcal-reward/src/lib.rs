//! qcal Reward Estimation
//!
//! This crate computes context-aware fidelity (CAFE) rewards for
//! reinforcement-learning gate calibration. A reward is the mean all-zero
//! survival probability over probes that prepare an input state, run the
//! calibrated context cycle and then undo the ideal cycle exactly.
//!
//! # Overview
//!
//! - [`InputStateLibrary`] holds the single-qubit preparations probes draw
//!   from (Pauli-4, Pauli-6 or a seeded 2-design).
//! - [`causal_cone`] reduces a circuit to the operations that can affect a
//!   set of qubits.
//! - [`ExactInverter`] simulates a reference cycle and resynthesizes its
//!   adjoint on the device.
//! - [`CafeReward`] builds one static probe per sampled input state, or a
//!   single [`RealTimeProgram`] whose branches are chosen at runtime.
//! - [`get_reward_with_primitive`] runs the probes on a [`Sampler`] and
//!   averages their survival probabilities.
//!
//! # Example: Static Probes
//!
//! ```rust,no_run
//! use qcal_compile::{CouplingMap, DeviceTranspiler, Layout};
//! use qcal_hal::{ParameterBatch, Sampler, UnitaryBackend};
//! use qcal_ir::{Circuit, QubitId};
//! use qcal_reward::{CafeReward, ContextCircuit, GateTarget, RewardConfig};
//!
//! # fn run(simulator: &dyn UnitaryBackend, sampler: &dyn Sampler) -> qcal_reward::RewardResult<()> {
//! let mut circuit = Circuit::with_size("ctx", 1, 0);
//! circuit.sx(QubitId(0))?;
//! let context = ContextCircuit::with_baseline(circuit.clone(), circuit.clone())?;
//!
//! let transpiler = DeviceTranspiler::new(CouplingMap::linear(1));
//! let target = GateTarget::new(&circuit, &[QubitId(0)], Layout::trivial([QubitId(0)]))?;
//!
//! let config = RewardConfig::default();
//! let mut reward = CafeReward::new(config.cafe.clone(), simulator, &transpiler);
//! let data = reward.get_reward_data(&context, &ParameterBatch::empty(1), &target, &config.execution)?;
//! let rewards = reward.get_reward_with_primitive(&data, sampler)?;
//! assert_eq!(rewards.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! [`Sampler`]: qcal_hal::Sampler

pub mod cafe;
pub mod causal_cone;
pub mod config;
pub mod data;
pub mod error;
pub mod estimator;
pub mod input_states;
pub mod inverse;
pub mod realtime;
pub mod target;

pub use cafe::CafeReward;
pub use causal_cone::{CausalCone, causal_cone};
pub use config::{CafeConfig, ConfigError, ExecutionConfig, MAX_REPETITION_COUNTS, RewardConfig};
pub use data::{CafeRewardData, CafeRewardDataList};
pub use error::{ErrorCategory, RewardError, RewardResult};
pub use estimator::{
    MEASUREMENT_REGISTER, get_reward_with_primitive, rewards_from_results, survival_probability,
};
pub use input_states::{
    InputState, InputStateFamily, InputStateLibrary, InputStateSample, unravel_index,
};
pub use inverse::{ExactInverter, InverseCache, InverseCircuit, InverseKey};
pub use realtime::{
    BranchTable, CONTEXT_VAR, N_REPS_VAR, RealTimeProgram, RealTimeSynthesizer, input_state_var,
};
pub use target::{ContextCircuit, GateTarget};
