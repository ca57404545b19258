//! Integration test: two stages approaching each other.
//!
//! Stages mounted on the same side, 10000 um apart. A short move stays
//! clear, a long one drives the envelopes into each other. Stages moving
//! together never see each other's stale pose.

use nalgebra::Point3;
use stagesim::{
    Collider, Collision, CollisionLog, EngineError, EnvelopeExtents, MotionProfiler, Pacing,
    RigidTransform, SimulatedStage, SimulationEngine, SimulationRunner,
};
use stagesim_common::stage::config::{AxisLimit, AxisLimits, Orientation};
use stagesim_common::stage::types::StageId;

// ── Helpers ─────────────────────────────────────────────────────────

fn extents() -> EnvelopeExtents {
    EnvelopeExtents {
        fiber_diameter: 50.0,
        fiber_length: 1000.0,
        safety_distance: 125.0,
    }
}

fn runner() -> SimulationRunner {
    runner_at(&[("first", 0.0), ("second", 10_000.0)])
}

fn runner_at(stages: &[(&str, f64)]) -> SimulationRunner {
    let profiler = MotionProfiler::new(1e-5).unwrap();
    let mut engine = SimulationEngine::new(profiler, 100).unwrap();
    for &(name, x) in stages {
        let driver = SimulatedStage::new(
            name,
            AxisLimits::uniform(AxisLimit::new(1e5, 1e6)),
            Point3::new(x, 0.0, 0.0),
        );
        engine.add_stage(
            name,
            Orientation::Top,
            Box::new(driver),
            RigidTransform::identity(),
            &extents(),
        );
    }
    SimulationRunner::new(engine, Pacing::Offline)
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn short_move_stays_clear() {
    let mut runner = runner();
    runner
        .engine_mut()
        .request_move(StageId(0), Point3::new(100.0, 0.0, 0.0))
        .unwrap();

    let mut log = CollisionLog::new();
    let summary = runner.run_until_idle(&mut log).unwrap();

    assert!(summary.steps > 0);
    assert_eq!(summary.collision_steps, 0);
    assert!(log.pairs.is_empty());
    assert_eq!(
        runner.engine().stage_pose(StageId(0)),
        Ok(Point3::new(100.0, 0.0, 0.0))
    );
}

#[test]
fn long_move_collides_with_neighbour() {
    let mut runner = runner();
    runner
        .engine_mut()
        .request_move(StageId(0), Point3::new(9_950.0, 0.0, 0.0))
        .unwrap();

    let mut log = CollisionLog::new();
    let summary = runner.run_until_idle(&mut log).unwrap();

    assert!(summary.collision_steps > 0);
    assert!(log.stage_collision());
    assert!(log.pairs.contains(&Collision::new(
        Collider::Stage(StageId(1)),
        Collider::Stage(StageId(0)),
    )));
    // Collisions are reported, not prevented.
    assert_eq!(
        runner.engine().stage_pose(StageId(0)),
        Ok(Point3::new(9_950.0, 0.0, 0.0))
    );
    assert_eq!(runner.engine().current_collisions().len(), 1);
}

#[test]
fn busy_stage_rejects_second_move_until_idle() {
    let mut runner = runner();
    let engine = runner.engine_mut();
    engine
        .request_move(StageId(1), Point3::new(12_000.0, 0.0, 0.0))
        .unwrap();
    assert_eq!(
        engine.request_move(StageId(1), Point3::new(0.0, 0.0, 0.0)),
        Err(EngineError::StageBusy(StageId(1)))
    );

    runner.run_until_idle(&mut ()).unwrap();

    assert!(
        runner
            .engine_mut()
            .request_move(StageId(1), Point3::new(11_000.0, 0.0, 0.0))
            .is_ok()
    );
}

#[test]
fn stages_moving_in_lockstep_never_collide() {
    // Envelopes are 300 wide on x, leaving a 10 um gap.
    let mut runner = runner_at(&[("first", 0.0), ("second", 310.0)]);
    let engine = runner.engine_mut();
    let waypoints = engine
        .request_move(StageId(0), Point3::new(1_000.0, 0.0, 0.0))
        .unwrap();
    assert_eq!(
        engine.request_move(StageId(1), Point3::new(1_310.0, 0.0, 0.0)),
        Ok(waypoints)
    );
    assert_eq!(engine.remaining_waypoints(StageId(0)), Ok(waypoints));

    let mut log = CollisionLog::new();
    let summary = runner.run_until_idle(&mut log).unwrap();

    assert_eq!(summary.steps, waypoints as u64);
    assert_eq!(summary.collision_steps, 0);
    assert!(log.pairs.is_empty());
    assert_eq!(runner.engine().remaining_waypoints(StageId(0)), Ok(0));
    assert_eq!(
        runner.engine().stage_pose(StageId(1)),
        Ok(Point3::new(1_310.0, 0.0, 0.0))
    );
}
