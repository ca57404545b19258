//! Numeric defaults and tolerances for the simulation workspace.
//!
//! Distances are in micrometers, times in seconds.

/// Fixed integration step of the motion profiler [s].
pub const DEFAULT_INTEGRATION_STEP: f64 = 1e-5;

/// Default output decimation: keep every Nth integrated sample for playback.
pub const DEFAULT_SAMPLING_RATE: usize = 10_000;

/// Default fiber diameter [um].
pub const DEFAULT_FIBER_DIAMETER: f64 = 125.0;

/// Default fiber length [um].
pub const DEFAULT_FIBER_LENGTH: f64 = 1e4;

/// Default safety margin around each fiber [um].
pub const DEFAULT_FIBER_SAFETY_DISTANCE: f64 = 125.0;

/// Default safety margin around the chip [um].
pub const DEFAULT_CHIP_SAFETY_DISTANCE: f64 = 10.0;

/// Default lateral (X/Y) speed limit [um/s].
pub const DEFAULT_SPEED_XY: f64 = 200.0;

/// Default vertical (Z) speed limit [um/s].
pub const DEFAULT_SPEED_Z: f64 = 20.0;

/// Default acceleration limit for all axes [um/s^2].
pub const DEFAULT_ACCELERATION: f64 = 50.0;

/// Axis travel at or below this distance counts as "does not move" [um].
pub const MOTION_TOLERANCE: f64 = 1e-9;

/// Relative singular-value threshold below which a calibration is degenerate.
pub const DEGENERACY_TOLERANCE: f64 = 1e-9;

/// Maximum number of stages: one per orientation around the chip.
pub const MAX_STAGES: usize = 4;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "simulation.toml";

/// Driver name of the built-in kinematic stage.
pub const DEFAULT_STAGE_DRIVER: &str = "simulated";
