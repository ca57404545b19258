//! Integration test: calibrated stages moving in world coordinates.
//!
//! A stage whose local frame is rotated 90 degrees about Z and shifted is
//! calibrated from point pairs, then commanded in world coordinates.

use approx::assert_relative_eq;
use nalgebra::{Point3, Rotation3, Vector3};
use stagesim::{
    AlignmentError, EnvelopeExtents, FrameAligner, MotionProfiler, Pacing, SimulatedStage,
    SimulationEngine, SimulationRunner, StepObserver, StepReport,
};
use stagesim_common::stage::config::{AxisLimit, AxisLimits, Orientation};
use stagesim_common::stage::types::StageId;
use std::f64::consts::FRAC_PI_2;

// ── Helpers ─────────────────────────────────────────────────────────

fn local_points() -> Vec<Point3<f64>> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1000.0, 0.0, 0.0),
        Point3::new(0.0, 800.0, 0.0),
        Point3::new(300.0, 200.0, 150.0),
    ]
}

/// world = Rz(90) * local + (5000, -200, 30)
fn to_world(local: &Point3<f64>) -> Point3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2) * local
        + Vector3::new(5000.0, -200.0, 30.0)
}

/// Records every world position reported for stage 0.
#[derive(Default)]
struct Trace(Vec<Point3<f64>>);

impl StepObserver for Trace {
    fn on_step(&mut self, report: &StepReport) {
        self.0.extend(
            report
                .updates
                .iter()
                .filter(|u| u.stage == StageId(0))
                .map(|u| u.world),
        );
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn fitted_transform_drives_world_moves() {
    let local = local_points();
    let world: Vec<_> = local.iter().map(to_world).collect();
    let transform = FrameAligner::default().fit(&local, &world).unwrap();
    assert!(transform.rms_residual() < 1e-6);

    let mut engine = SimulationEngine::new(MotionProfiler::new(1e-4).unwrap(), 10).unwrap();
    let driver = SimulatedStage::new(
        "rotated",
        AxisLimits::uniform(AxisLimit::new(5e3, 5e4)),
        Point3::origin(),
    );
    let extents = EnvelopeExtents {
        fiber_diameter: 125.0,
        fiber_length: 1e4,
        safety_distance: 125.0,
    };
    engine.add_stage("rotated", Orientation::Left, Box::new(driver), transform, &extents);
    assert_relative_eq!(
        engine.world_pose(StageId(0)).unwrap(),
        Point3::new(5000.0, -200.0, 30.0),
        epsilon = 1e-6
    );

    let mut runner = SimulationRunner::new(engine, Pacing::Offline);
    let target = Point3::new(4800.0, 300.0, 30.0);
    runner.engine_mut().request_move(StageId(0), target).unwrap();
    let mut trace = Trace::default();
    runner.run_until_idle(&mut trace).unwrap();

    assert_relative_eq!(runner.engine().world_pose(StageId(0)).unwrap(), target, epsilon = 1e-6);
    // World +Y is local -X, world -X is local -Y.
    assert_relative_eq!(
        runner.engine().stage_pose(StageId(0)).unwrap(),
        Point3::new(500.0, 200.0, 0.0),
        epsilon = 1e-6
    );
    // Both local axes move monotonically, so the world trace stays inside the
    // box spanned by start and target.
    for p in &trace.0 {
        assert!(p.x <= 5000.0 + 1e-6 && p.x >= 4800.0 - 1e-6);
        assert!(p.y >= -200.0 - 1e-6 && p.y <= 300.0 + 1e-6);
    }
}

#[test]
fn noisy_calibration_reports_residual() {
    let local = local_points();
    let mut world: Vec<_> = local.iter().map(to_world).collect();
    world[3].z += 2.0;

    let transform = FrameAligner::default().fit(&local, &world).unwrap();

    assert!(transform.rms_residual() > 0.1);
    assert!(transform.rms_residual() < 2.0);
    // The fitted rotation is still proper.
    assert_relative_eq!(transform.rotation_matrix().determinant(), 1.0, epsilon = 1e-6);
}

#[test]
fn collinear_calibration_is_rejected() {
    let local = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(100.0, 0.0, 0.0),
        Point3::new(250.0, 0.0, 0.0),
    ];
    let world: Vec<_> = local.iter().map(to_world).collect();

    assert!(matches!(
        FrameAligner::default().fit(&local, &world),
        Err(AlignmentError::DegenerateCalibration { .. })
    ));
}
