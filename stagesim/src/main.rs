//! # Stage Simulation Binary
//!
//! Loads `simulation.toml`, builds the stages around the configured chip and
//! runs one movement scenario.
//!
//! # Usage
//!
//! ```bash
//! # Show stages, calibrations and devices
//! stagesim --config lab/simulation.toml show
//!
//! # Move a single stage (world coordinates, um)
//! stagesim move --stage left --x 100 --y 0 --z 50
//!
//! # Move every stage to a device, paced in real time
//! stagesim --realtime move-to-device --device 3
//!
//! # Wiggle one stage along its z axis, or all axes when --axis is omitted
//! stagesim wiggle --stage left --axis z --amplitude 200
//!
//! # Check every device pair for collisions
//! stagesim stress-test -v
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Point3;
use stagesim::environment::SimulationEnvironment;
use stagesim::error::SimError;
use stagesim::runner::{CollisionLog, RunSummary};
use stagesim::scenario;
use stagesim::stages::StageRegistry;
use stagesim_common::config::{ConfigLoader, LogLevel};
use stagesim_common::consts::DEFAULT_CONFIG_PATH;
use stagesim_common::stage::config::SimulationConfig;
use stagesim_common::stage::types::Axis;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Stage simulation - trapezoidal motion and collision checks around a chip
#[derive(Parser, Debug)]
#[command(name = "stagesim")]
#[command(version)]
#[command(about = "Simulate positioning stages around a chip and check for collisions")]
#[command(long_about = None)]
struct Args {
    /// Path to the simulation configuration (simulation.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Pace playback to wall-clock time (overrides the configuration)
    #[arg(long)]
    realtime: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print stages, transforms and devices
    Show,
    /// Move one stage to a world position
    Move {
        #[arg(long)]
        stage: String,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long)]
        z: f64,
    },
    /// Move every stage to its coupling point of one device
    MoveToDevice {
        #[arg(long)]
        device: u32,
    },
    /// Visit every device in id order
    MoveToAll,
    /// Move one stage back and forth along its own axes
    Wiggle {
        #[arg(long)]
        stage: String,
        /// Single axis to wiggle (all axes in turn when omitted)
        #[arg(long, value_enum)]
        axis: Option<AxisArg>,
        /// Excursion from the start pose, um
        #[arg(long, default_value_t = 500.0)]
        amplitude: f64,
    },
    /// Move between every pair of devices and count collisions
    StressTest,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AxisArg {
    X,
    Y,
    Z,
}

impl From<AxisArg> for Axis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
            AxisArg::Z => Axis::Z,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        error!("Simulation failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), SimError> {
    let args = Args::parse();

    // Load first, the log level comes from the configuration.
    let config = SimulationConfig::load(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);
    let config = config?;

    info!("Stage simulation v{} starting...", env!("CARGO_PKG_VERSION"));

    let base_dir = args.config.parent().unwrap_or(Path::new("."));
    let mut env = SimulationEnvironment::from_config(&config, base_dir, &StageRegistry::default())?;
    if args.realtime {
        env.set_realtime(true);
    }

    let running = env.runner().running_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not install signal handler: {e}");
    }

    let mut log = CollisionLog::new();
    let summary = match args.command {
        Command::Show => {
            show(&env);
            return Ok(());
        }
        Command::Move { stage, x, y, z } => {
            scenario::move_stage(&mut env, &stage, Point3::new(x, y, z), &mut log)?
        }
        Command::MoveToDevice { device } => scenario::move_to_device(&mut env, device, &mut log)?,
        Command::MoveToAll => {
            let mut total = RunSummary::default();
            for (_, run) in scenario::move_to_all_devices(&mut env, &mut log)? {
                total.absorb(&run);
            }
            total
        }
        Command::Wiggle { stage, axis: Some(axis), amplitude } => {
            scenario::wiggle_axis(&mut env, &stage, axis.into(), amplitude, &mut log)?
        }
        Command::Wiggle { stage, axis: None, amplitude } => {
            scenario::wiggle_all_axes(&mut env, &stage, amplitude, &mut log)?
        }
        Command::StressTest => {
            let report = scenario::stress_test(&mut env)?;
            for (from, to) in &report.stage_collision_pairs {
                warn!("Stage collision moving from device {from} to device {to}");
            }
            if report.interrupted {
                return Err(SimError::Interrupted);
            }
            return Ok(());
        }
    };

    info!(
        "Done: {} steps, {:.3}s simulated, {} collision steps ({} stage, {} chip)",
        summary.steps,
        summary.simulated_time,
        summary.collision_steps,
        log.stage_ticks,
        log.workpiece_ticks
    );
    for binding in env.bindings() {
        if let Ok(pose) = env.engine().world_pose(binding.id) {
            info!("  {}: {}", binding.name, pose);
        }
    }

    if summary.interrupted {
        return Err(SimError::Interrupted);
    }
    Ok(())
}

/// Log the assembled environment.
fn show(env: &SimulationEnvironment) {
    let engine = env.engine();
    for binding in env.bindings() {
        let (Ok(pose), Ok(transform), Ok(orientation)) = (
            engine.world_pose(binding.id),
            engine.transform(binding.id),
            engine.orientation(binding.id),
        ) else {
            continue;
        };
        info!(
            "{} '{}': {orientation}, {:?} port, world {pose}, calibration rms {:.3}",
            binding.id,
            binding.name,
            binding.port,
            transform.rms_residual()
        );
    }
    match env.workpiece() {
        Some(chip) => {
            info!("Chip '{}' with {} devices", chip.name(), chip.len());
            for device in chip.devices() {
                info!(
                    "  device {}: input {} output {}",
                    device.id, device.input, device.output
                );
            }
        }
        None => info!("No chip configured"),
    }
}

/// Setup tracing subscriber from the configured level and CLI arguments.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose { LogLevel::Debug } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
