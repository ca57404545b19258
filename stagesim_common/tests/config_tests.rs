//! Configuration loading tests.
//!
//! Tests for `SimulationConfig` loaded from disk: defaults, full files,
//! stage-count and uniqueness rules, unknown enum values.

use stagesim_common::config::{ConfigError, ConfigLoader, LogLevel};
use stagesim_common::consts::{DEFAULT_INTEGRATION_STEP, MAX_STAGES};
use stagesim_common::stage::config::{AxisLimit, DevicePort, Orientation, SimulationConfig};
use stagesim_common::stage::types::Axis;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FULL: &str = r#"
chip = "chips/demo.json"
calibrations = "calibrations.json"

[shared]
log_level = "debug"
service_name = "lab-01"

[simulation]
realtime = true
fiber_safety_distance = 100.0
chip_safety_distance = 20.0
sampling_rate = 500
integration_step = 1e-4
approach_height = 25.0
z_lift = 300.0

[envelope]
fiber_diameter = 250.0
fiber_length = 8000.0

[[stages]]
name = "in"
orientation = "left"
calibration = "in"

[[stages]]
name = "out"
orientation = "right"
port = "output"
calibration = "out"

[stages.limits]
x = { max_speed = 400.0, max_acceleration = 100.0 }
y = { max_speed = 400.0, max_acceleration = 100.0 }
z = { max_speed = 40.0, max_acceleration = 100.0 }
"#;

/// Write `content` as simulation.toml in a fresh directory.
fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("simulation.toml");
    fs::write(&path, content).unwrap();
    (dir, path)
}

fn stage_block(name: &str, orientation: &str) -> String {
    format!("\n[[stages]]\nname = \"{name}\"\norientation = \"{orientation}\"\n")
}

#[test]
fn full_config_loads_every_section() {
    let (_dir, path) = write_config(FULL);
    let config = SimulationConfig::load(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.chip.as_deref(), Some(Path::new("chips/demo.json")));
    assert!(config.simulation.realtime);
    assert_eq!(config.simulation.sampling_rate, 500);
    assert_eq!(config.simulation.integration_step, 1e-4);
    assert_eq!(config.simulation.z_lift, 300.0);
    assert_eq!(config.envelope.fiber_diameter, 250.0);

    assert_eq!(config.stages.len(), 2);
    assert_eq!(config.stages[0].orientation, Orientation::Left);
    assert_eq!(config.stages[0].port, DevicePort::Input);
    assert_eq!(config.stages[1].port, DevicePort::Output);
    assert_eq!(
        config.stages[1].limits.get(Axis::Z),
        AxisLimit::new(40.0, 100.0)
    );
}

#[test]
fn minimal_config_uses_defaults() {
    let (_dir, path) = write_config("[shared]\nservice_name = \"bare\"\n");
    let config = SimulationConfig::load(&path).unwrap();
    config.validate().unwrap();

    assert!(config.stages.is_empty());
    assert!(config.calibrations.is_none());
    assert_eq!(config.simulation.integration_step, DEFAULT_INTEGRATION_STEP);
    assert_eq!(config.simulation.z_lift, 0.0);
}

#[test]
fn all_four_sides_are_accepted_but_no_more() {
    let mut content = "[shared]\nservice_name = \"ring\"\n".to_string();
    for (name, side) in [("a", "left"), ("b", "right"), ("c", "top"), ("d", "bottom")] {
        content.push_str(&stage_block(name, side));
    }
    let config = SimulationConfig::parse(&content).unwrap();
    assert_eq!(config.stages.len(), MAX_STAGES);
    config.validate().unwrap();

    content.push_str(&stage_block("e", "left"));
    let config = SimulationConfig::parse(&content).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(msg)) if msg.contains("Too many stages")
    ));
}

#[test]
fn unknown_orientation_is_a_parse_error() {
    let content = format!(
        "[shared]\nservice_name = \"x\"\n{}",
        stage_block("a", "diagonal")
    );
    assert!(matches!(
        SimulationConfig::parse(&content),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn missing_shared_section_is_a_parse_error() {
    let (_dir, path) = write_config("[simulation]\nrealtime = true\n");
    assert!(matches!(
        SimulationConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn negative_z_lift_is_rejected() {
    let content = FULL.replace("z_lift = 300.0", "z_lift = -1.0");
    let config = SimulationConfig::parse(&content).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(msg)) if msg.contains("z_lift")
    ));
}

#[test]
fn non_positive_fiber_dimensions_are_rejected() {
    let content = FULL.replace("fiber_length = 8000.0", "fiber_length = 0.0");
    let config = SimulationConfig::parse(&content).unwrap();
    assert!(config.validate().is_err());
}
