//! Integration test: scenarios driven from files on disk.
//!
//! Writes `simulation.toml`, a chip description and a calibration file into
//! a temporary directory, loads them through `SimulationEnvironment::load`
//! and runs the device scenarios.

use approx::assert_relative_eq;
use nalgebra::Point3;
use stagesim::scenario::{move_to_device, stress_test};
use stagesim::{CollisionLog, SimError, SimulationEnvironment, StageRegistry};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

const SIMULATION: &str = r#"
chip = "chip.json"
calibrations = "calibrations.json"

[shared]
log_level = "debug"
service_name = "file-scenarios"

[simulation]
integration_step = 1e-3
sampling_rate = 10
approach_height = 50.0

[envelope]
fiber_diameter = 125.0
fiber_length = 10000.0

[[stages]]
name = "left"
orientation = "left"
port = "input"
position = [100.0, 100.0, 50.0]
calibration = "left"
limits = { x = { max_speed = 1e4, max_acceleration = 1e5 }, y = { max_speed = 1e4, max_acceleration = 1e5 }, z = { max_speed = 1e4, max_acceleration = 1e5 } }

[[stages]]
name = "right"
orientation = "right"
port = "output"
position = [2000.0, 0.0, 50.0]
limits = { x = { max_speed = 1e4, max_acceleration = 1e5 }, y = { max_speed = 1e4, max_acceleration = 1e5 }, z = { max_speed = 1e4, max_acceleration = 1e5 } }
"#;

const CHIP: &str = r#"{
    "name": "demo",
    "devices": [
        { "id": 1, "inputCoordinate": [0, 0], "outputCoordinate": [2000, 0], "type": "ring" },
        { "id": 2, "inputCoordinate": [0, 500], "outputCoordinate": [2000, 500] },
        { "id": 3, "inputCoordinate": [1500, 0], "outputCoordinate": [1400, 0] }
    ]
}"#;

const CALIBRATIONS: &str = r#"{
    "chipName": "demo",
    "left": {
        "chipCoordinates":  [[0, 0, 0], [2000, 0, 0], [0, 500, 0]],
        "stageCoordinates": [[100, 100, 0], [2100, 100, 0], [100, 600, 0]]
    }
}"#;

fn write_files(dir: &Path, simulation: &str) {
    fs::write(dir.join("simulation.toml"), simulation).unwrap();
    fs::write(dir.join("chip.json"), CHIP).unwrap();
    fs::write(dir.join("calibrations.json"), CALIBRATIONS).unwrap();
}

fn load(simulation: &str) -> (TempDir, Result<SimulationEnvironment, SimError>) {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), simulation);
    let env = SimulationEnvironment::load(&dir.path().join("simulation.toml"), &StageRegistry::default());
    (dir, env)
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn calibrated_stage_reaches_device_in_local_frame() {
    let (_dir, env) = load(SIMULATION);
    let mut env = env.unwrap();
    let left = env.binding("left").unwrap().id;
    assert_relative_eq!(
        env.engine().world_pose(left).unwrap(),
        Point3::new(0.0, 0.0, 50.0),
        epsilon = 1e-6
    );

    let mut log = CollisionLog::new();
    let summary = move_to_device(&mut env, 2, &mut log).unwrap();

    assert!(summary.steps > 0);
    assert!(!log.stage_collision());
    assert_relative_eq!(
        env.engine().stage_pose(left).unwrap(),
        Point3::new(100.0, 600.0, 50.0),
        epsilon = 1e-6
    );
}

#[test]
fn stress_test_over_chip_file() {
    let (_dir, env) = load(SIMULATION);
    let mut env = env.unwrap();

    let report = stress_test(&mut env).unwrap();

    assert_eq!(report.total_pairs, 3);
    assert_eq!(report.completed_pairs, 3);
    assert_eq!(report.stage_collision_pairs, vec![(1, 3), (2, 3)]);
    assert_eq!(report.workpiece_collisions, 0);
}

#[test]
fn fibers_touching_the_chip_are_reported() {
    let simulation = SIMULATION.replace("approach_height = 50.0", "approach_height = 0.0");
    let (_dir, env) = load(&simulation);
    let mut env = env.unwrap();

    let mut log = CollisionLog::new();
    move_to_device(&mut env, 2, &mut log).unwrap();

    assert!(log.workpiece_collision());
}

#[test]
fn missing_chip_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("simulation.toml"), SIMULATION).unwrap();

    let result = SimulationEnvironment::load(&dir.path().join("simulation.toml"), &StageRegistry::default());

    assert!(matches!(result, Err(SimError::Io { .. })));
}

#[test]
fn invalid_configuration_is_rejected() {
    let simulation = SIMULATION.replace("sampling_rate = 10", "sampling_rate = 0");
    let (_dir, env) = load(&simulation);
    assert!(matches!(env, Err(SimError::Config(_))));
}
