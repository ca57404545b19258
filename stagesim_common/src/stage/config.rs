//! Simulation configuration types.
//!
//! This module contains the configuration loaded from `simulation.toml`:
//! - `SimulationConfig` - Main configuration
//! - `SimulationParameters` - Pacing, safety margins, sampling
//! - `EnvelopeConfig` - Fiber dimensions used for stage safety envelopes
//! - `StageConfig` - Per-stage configuration with `AxisLimits`

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_ACCELERATION, DEFAULT_CHIP_SAFETY_DISTANCE, DEFAULT_FIBER_DIAMETER,
    DEFAULT_FIBER_LENGTH, DEFAULT_FIBER_SAFETY_DISTANCE, DEFAULT_INTEGRATION_STEP,
    DEFAULT_SAMPLING_RATE, DEFAULT_SPEED_XY, DEFAULT_SPEED_Z, DEFAULT_STAGE_DRIVER, MAX_STAGES,
};
use crate::stage::types::Axis;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

fn default_fiber_safety_distance() -> f64 {
    DEFAULT_FIBER_SAFETY_DISTANCE
}

fn default_chip_safety_distance() -> f64 {
    DEFAULT_CHIP_SAFETY_DISTANCE
}

fn default_sampling_rate() -> usize {
    DEFAULT_SAMPLING_RATE
}

fn default_integration_step() -> f64 {
    DEFAULT_INTEGRATION_STEP
}

fn default_fiber_diameter() -> f64 {
    DEFAULT_FIBER_DIAMETER
}

fn default_fiber_length() -> f64 {
    DEFAULT_FIBER_LENGTH
}

fn default_driver() -> String {
    DEFAULT_STAGE_DRIVER.to_string()
}

/// Mounting side of a stage around the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Left,
    Right,
    Top,
    Bottom,
}

impl Orientation {
    /// Axis along which the fiber (and its envelope) extends.
    pub const fn long_axis(self) -> Axis {
        match self {
            Orientation::Left | Orientation::Right => Axis::X,
            Orientation::Top | Orientation::Bottom => Axis::Y,
        }
    }

    /// Sign of the direction pointing away from the chip along `long_axis`.
    pub const fn outward_sign(self) -> f64 {
        match self {
            Orientation::Left | Orientation::Bottom => -1.0,
            Orientation::Right | Orientation::Top => 1.0,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Left => "left",
            Orientation::Right => "right",
            Orientation::Top => "top",
            Orientation::Bottom => "bottom",
        };
        f.write_str(name)
    }
}

/// Which coupling point of a device a stage addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePort {
    #[default]
    Input,
    Output,
}

/// Speed and acceleration limit of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimit {
    /// Maximum speed [um/s].
    pub max_speed: f64,
    /// Maximum acceleration [um/s^2].
    pub max_acceleration: f64,
}

impl AxisLimit {
    pub const fn new(max_speed: f64, max_acceleration: f64) -> Self {
        Self {
            max_speed,
            max_acceleration,
        }
    }

    /// Both limits must be finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.max_speed.is_finite()
            && self.max_acceleration.is_finite()
            && self.max_speed > 0.0
            && self.max_acceleration > 0.0
    }
}

/// Per-axis limits of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub x: AxisLimit,
    pub y: AxisLimit,
    pub z: AxisLimit,
}

impl AxisLimits {
    /// Same limit on every axis.
    pub const fn uniform(limit: AxisLimit) -> Self {
        Self {
            x: limit,
            y: limit,
            z: limit,
        }
    }

    pub const fn get(&self, axis: Axis) -> AxisLimit {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, limit: AxisLimit) {
        match axis {
            Axis::X => self.x = limit,
            Axis::Y => self.y = limit,
            Axis::Z => self.z = limit,
        }
    }

    /// Validate every axis.
    pub fn validate(&self, stage: &str) -> Result<(), ConfigError> {
        for axis in Axis::ALL {
            let limit = self.get(axis);
            if !limit.is_valid() {
                return Err(ConfigError::ValidationError(format!(
                    "Stage '{stage}' axis {axis}: max_speed ({}) and max_acceleration ({}) must be positive",
                    limit.max_speed, limit.max_acceleration
                )));
            }
        }
        Ok(())
    }
}

impl Default for AxisLimits {
    fn default() -> Self {
        let lateral = AxisLimit::new(DEFAULT_SPEED_XY, DEFAULT_ACCELERATION);
        Self {
            x: lateral,
            y: lateral,
            z: AxisLimit::new(DEFAULT_SPEED_Z, DEFAULT_ACCELERATION),
        }
    }
}

/// Simulation loop parameters (`[simulation]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Pace playback to wall-clock time.
    #[serde(default)]
    pub realtime: bool,

    /// Safety margin around each fiber [um].
    #[serde(default = "default_fiber_safety_distance")]
    pub fiber_safety_distance: f64,

    /// Safety margin around the chip [um].
    #[serde(default = "default_chip_safety_distance")]
    pub chip_safety_distance: f64,

    /// Output decimation: every Nth integrated sample is played back.
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: usize,

    /// Profiler integration step [s].
    #[serde(default = "default_integration_step")]
    pub integration_step: f64,

    /// Height above a coupling point at which stages stop [um].
    #[serde(default)]
    pub approach_height: f64,

    /// Lift before lateral moves to a device; 0 moves directly [um].
    #[serde(default)]
    pub z_lift: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            realtime: false,
            fiber_safety_distance: DEFAULT_FIBER_SAFETY_DISTANCE,
            chip_safety_distance: DEFAULT_CHIP_SAFETY_DISTANCE,
            sampling_rate: DEFAULT_SAMPLING_RATE,
            integration_step: DEFAULT_INTEGRATION_STEP,
            approach_height: 0.0,
            z_lift: 0.0,
        }
    }
}

impl SimulationParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling_rate == 0 {
            return Err(ConfigError::ValidationError(
                "sampling_rate must be greater than 0".to_string(),
            ));
        }
        if !(self.integration_step.is_finite() && self.integration_step > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "integration_step must be positive, got {}",
                self.integration_step
            )));
        }
        if self.fiber_safety_distance < 0.0 || self.chip_safety_distance < 0.0 {
            return Err(ConfigError::ValidationError(
                "safety distances cannot be negative".to_string(),
            ));
        }
        if !self.approach_height.is_finite() {
            return Err(ConfigError::ValidationError(
                "approach_height must be finite".to_string(),
            ));
        }
        if !(self.z_lift.is_finite() && self.z_lift >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "z_lift must be non-negative, got {}",
                self.z_lift
            )));
        }
        Ok(())
    }
}

/// Fiber dimensions (`[envelope]` section).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Fiber diameter [um].
    #[serde(default = "default_fiber_diameter")]
    pub fiber_diameter: f64,

    /// Fiber length [um].
    #[serde(default = "default_fiber_length")]
    pub fiber_length: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            fiber_diameter: DEFAULT_FIBER_DIAMETER,
            fiber_length: DEFAULT_FIBER_LENGTH,
        }
    }
}

impl EnvelopeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fiber_diameter > 0.0 && self.fiber_length > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "fiber dimensions must be positive (diameter {}, length {})",
                self.fiber_diameter, self.fiber_length
            )));
        }
        Ok(())
    }
}

/// Configuration of a single stage (`[[stages]]` entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique stage name.
    pub name: String,

    /// Mounting side around the chip.
    pub orientation: Orientation,

    /// Device coupling point this stage addresses.
    #[serde(default)]
    pub port: DevicePort,

    /// Registered driver name.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Initial position in the stage's local frame [um].
    #[serde(default)]
    pub position: [f64; 3],

    /// Key into the calibration file. `None` uses the identity transform.
    #[serde(default)]
    pub calibration: Option<String>,

    /// Per-axis speed and acceleration limits.
    #[serde(default)]
    pub limits: AxisLimits,
}

impl StageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "stage name cannot be empty".to_string(),
            ));
        }
        if self.position.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "Stage '{}': initial position must be finite",
                self.name
            )));
        }
        self.limits.validate(&self.name)
    }
}

/// Main configuration loaded from `simulation.toml`.
///
/// # TOML Example
///
/// ```toml
/// chip = "chip.json"
/// calibrations = "calibrations.json"
///
/// [shared]
/// service_name = "stagesim"
///
/// [simulation]
/// realtime = false
/// sampling_rate = 10000
///
/// [[stages]]
/// name = "left"
/// orientation = "left"
/// port = "input"
/// calibration = "left"
///
/// [stages.limits]
/// x = { max_speed = 200.0, max_acceleration = 50.0 }
/// y = { max_speed = 200.0, max_acceleration = 50.0 }
/// z = { max_speed = 20.0, max_acceleration = 50.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub shared: SharedConfig,

    #[serde(default)]
    pub simulation: SimulationParameters,

    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// Chip description file (relative to the config directory).
    #[serde(default)]
    pub chip: Option<PathBuf>,

    /// Calibration file (relative to the config directory).
    #[serde(default)]
    pub calibrations: Option<PathBuf>,

    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

impl SimulationConfig {
    /// Validate the simulation configuration.
    ///
    /// # Validation Rules
    /// 1. Shared section valid
    /// 2. `sampling_rate` > 0, `integration_step` > 0
    /// 3. Fiber dimensions positive
    /// 4. `stages.len()` <= MAX_STAGES
    /// 5. Stage names unique, at most one stage per orientation
    /// 6. Every stage's axis limits positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.simulation.validate()?;
        self.envelope.validate()?;

        if self.stages.len() > MAX_STAGES {
            return Err(ConfigError::ValidationError(format!(
                "Too many stages: {} (max {})",
                self.stages.len(),
                MAX_STAGES
            )));
        }

        let mut names = HashSet::new();
        let mut orientations = HashSet::new();
        for stage in &self.stages {
            stage.validate()?;
            if !names.insert(stage.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate stage name: '{}'",
                    stage.name
                )));
            }
            if !orientations.insert(stage.orientation) {
                return Err(ConfigError::ValidationError(format!(
                    "More than one stage with orientation '{}'",
                    stage.orientation
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    const MINIMAL: &str = r#"
[shared]
service_name = "stagesim-test"

[[stages]]
name = "left"
orientation = "left"

[[stages]]
name = "right"
orientation = "right"
port = "output"
driver = "simulated"
position = [100.0, 0.0, 50.0]
calibration = "right"

[stages.limits]
x = { max_speed = 300.0, max_acceleration = 80.0 }
y = { max_speed = 300.0, max_acceleration = 80.0 }
z = { max_speed = 30.0, max_acceleration = 80.0 }
"#;

    #[test]
    fn parse_minimal_config_applies_defaults() {
        let config = SimulationConfig::parse(MINIMAL).unwrap();
        config.validate().unwrap();

        assert!(!config.simulation.realtime);
        assert_eq!(config.simulation.sampling_rate, DEFAULT_SAMPLING_RATE);
        assert_eq!(config.simulation.fiber_safety_distance, 125.0);
        assert_eq!(config.simulation.chip_safety_distance, 10.0);
        assert_eq!(config.envelope.fiber_length, 1e4);
        assert!(config.chip.is_none());

        let left = &config.stages[0];
        assert_eq!(left.port, DevicePort::Input);
        assert_eq!(left.driver, "simulated");
        assert_eq!(left.position, [0.0; 3]);
        assert_eq!(left.limits, AxisLimits::default());

        let right = &config.stages[1];
        assert_eq!(right.port, DevicePort::Output);
        assert_eq!(right.calibration.as_deref(), Some("right"));
        assert_eq!(right.limits.get(Axis::Z).max_speed, 30.0);
    }

    #[test]
    fn duplicate_orientation_is_rejected() {
        let mut config = SimulationConfig::parse(MINIMAL).unwrap();
        config.stages[1].orientation = Orientation::Left;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("orientation")
        ));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut config = SimulationConfig::parse(MINIMAL).unwrap();
        config.stages[1].name = "left".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("Duplicate")
        ));
    }

    #[test]
    fn non_positive_limits_are_rejected() {
        let mut config = SimulationConfig::parse(MINIMAL).unwrap();
        config.stages[0]
            .limits
            .set(Axis::Y, AxisLimit::new(0.0, 10.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_sampling_rate_is_rejected() {
        let mut config = SimulationConfig::parse(MINIMAL).unwrap();
        config.simulation.sampling_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn orientation_axes_and_signs() {
        assert_eq!(Orientation::Left.long_axis(), Axis::X);
        assert_eq!(Orientation::Right.long_axis(), Axis::X);
        assert_eq!(Orientation::Top.long_axis(), Axis::Y);
        assert_eq!(Orientation::Bottom.long_axis(), Axis::Y);
        assert_eq!(Orientation::Left.outward_sign(), -1.0);
        assert_eq!(Orientation::Top.outward_sign(), 1.0);
    }
}
