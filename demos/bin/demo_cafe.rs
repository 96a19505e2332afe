//! CAFE Reward Demo
//!
//! Scores a miscalibrated single-qubit gate against its ideal version on the
//! noiseless simulator, sweeping the calibration error.

use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qcal_adapter_sim::{StatevectorSampler, UnitarySimulator};
use qcal_compile::{CouplingMap, DeviceTranspiler, Layout};
use qcal_hal::ParameterBatch;
use qcal_ir::{Circuit, ParameterExpression, QubitId};
use qcal_reward::{CafeReward, ContextCircuit, GateTarget, InputStateFamily, RewardConfig};

#[derive(Parser, Debug)]
#[command(name = "demo-cafe")]
#[command(about = "Estimate CAFE rewards for an over-rotated Rx(pi/2) gate")]
struct Args {
    /// YAML reward configuration; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Largest over-rotation in radians; the batch spans 0 to this value
    #[arg(long, default_value = "0.6")]
    max_error: f64,

    /// Number of calibration candidates evaluated in one batch
    #[arg(short, long, default_value = "5")]
    batch: usize,

    /// Input-state family (pauli4, pauli6, 2-design)
    #[arg(long)]
    family: Option<String>,

    /// Build one real-time program instead of a circuit per probe
    #[arg(long)]
    control_flow: bool,

    /// Number of device qubits on a linear coupling map
    #[arg(long, default_value = "2")]
    device_qubits: u32,

    /// Device qubit hosting the calibrated gate
    #[arg(long, default_value = "1")]
    physical_qubit: u32,

    /// Sampler seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut config = match &args.config {
        Some(path) => RewardConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RewardConfig::default(),
    };
    config.execution.batch_size = args.batch;
    config.execution.control_flow_enabled |= args.control_flow;
    if let Some(family) = &args.family {
        config.cafe.input_states_choice = family.parse::<InputStateFamily>()?;
    }
    config.validate()?;

    // Parametrized gate under calibration and its ideal counterpart.
    let q = QubitId(0);
    let mut circuit = Circuit::with_size("rx_cal", 1, 0);
    circuit.rx(
        ParameterExpression::symbol("theta") + ParameterExpression::constant(FRAC_PI_2),
        q,
    )?;
    let mut baseline = Circuit::with_size("rx_ideal", 1, 0);
    baseline.rx(FRAC_PI_2, q)?;
    let context = ContextCircuit::with_baseline(circuit.clone(), baseline)?;

    let transpiler = DeviceTranspiler::new(CouplingMap::linear(args.device_qubits));
    let layout = Layout::from_pairs([(q, args.physical_qubit)]);
    let target = GateTarget::new(&circuit, &[q], layout)?;

    let errors: Vec<f64> = (0..args.batch)
        .map(|i| args.max_error * i as f64 / (args.batch.max(2) - 1) as f64)
        .collect();
    let rows = errors.iter().map(|&e| vec![e]).collect();
    let params = ParameterBatch::new(vec!["theta".to_string()], rows)?;

    let simulator = UnitarySimulator::new();
    let sampler = StatevectorSampler::with_seed(args.seed);
    let mut reward = CafeReward::new(config.cafe.clone(), &simulator, &transpiler);
    reward.set_reward_seed(config.execution.seed);

    let data = reward.get_reward_data(&context, &params, &target, &config.execution)?;
    info!(
        "{} probe(s) on device qubit {} ({} input states, control flow {})",
        data.len(),
        args.physical_qubit,
        config.cafe.input_states_choice,
        config.execution.control_flow_enabled
    );
    let rewards = reward.get_reward_with_primitive(&data, &sampler)?;

    println!("{:>12}  {:>8}", "error (rad)", "reward");
    for (error, value) in errors.iter().zip(&rewards) {
        println!("{error:>12.4}  {value:>8.4}");
    }
    Ok(())
}
