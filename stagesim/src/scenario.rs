//! Movement scenarios over the loaded chip.
//!
//! - `move_stage` - one stage to a world position
//! - `move_to_device` - every stage to its port's coupling point of a device
//! - `move_to_all_devices` - visit every device in id order
//! - `wiggle_axis` / `wiggle_all_axes` - jog one stage back and forth along
//!   its own axes and return it to the start
//! - `stress_test` - every unordered device pair: start at the first device,
//!   move to the second, record which pairs collide
//!
//! With a non-zero `z_lift` a device move runs in three phases: lift, lateral
//! move at the lifted height, lower onto the target.

use crate::clock::Pacing;
use crate::engine::EngineError;
use crate::environment::SimulationEnvironment;
use crate::error::SimError;
use crate::motion::MotionError;
use crate::runner::{CollisionLog, RunSummary, StepObserver};
use nalgebra::{Point3, Vector3};
use stagesim_common::stage::types::{Axis, StageId};
use tracing::{debug, info, warn};

/// Outcome of the device-pair stress test.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StressReport {
    /// Unordered device pairs on the chip.
    pub total_pairs: usize,
    /// Pairs simulated before completion or interruption.
    pub completed_pairs: usize,
    /// Pairs with at least one stage-vs-stage collision.
    pub stage_collisions: usize,
    /// Pairs with at least one stage-vs-workpiece collision.
    pub workpiece_collisions: usize,
    /// Device ids `(from, to)` of the pairs with a stage-vs-stage collision.
    pub stage_collision_pairs: Vec<(u32, u32)>,
    pub interrupted: bool,
}

/// Start the given moves together and run until all stages are idle.
///
/// Stages already at their target are skipped.
fn run_moves(
    env: &mut SimulationEnvironment,
    targets: &[(StageId, Point3<f64>)],
    observer: &mut dyn StepObserver,
) -> Result<RunSummary, SimError> {
    let engine = env.engine_mut();
    let mut started = 0;
    for &(id, target) in targets {
        match engine.request_move(id, target) {
            Ok(_) => started += 1,
            Err(EngineError::Motion(MotionError::NoMotion)) => {
                debug!("{id} already at {target}");
            }
            Err(e) => {
                engine.cancel_all();
                return Err(e.into());
            }
        }
    }
    if started == 0 {
        return Ok(RunSummary::default());
    }
    env.runner_mut().run_until_idle(observer)
}

/// Move stages to world targets, lifting first when `z_lift` is set.
pub fn move_stages(
    env: &mut SimulationEnvironment,
    targets: &[(StageId, Point3<f64>)],
    observer: &mut dyn StepObserver,
) -> Result<RunSummary, SimError> {
    let z_lift = env.parameters().z_lift;
    if z_lift <= 0.0 {
        return run_moves(env, targets, observer);
    }

    let lift = Vector3::new(0.0, 0.0, z_lift);
    let mut lifted = Vec::with_capacity(targets.len());
    for &(id, _) in targets {
        lifted.push((id, env.engine().world_pose(id)? + lift));
    }
    let traverse: Vec<_> = targets
        .iter()
        .zip(&lifted)
        .map(|(&(id, target), (_, up))| (id, Point3::new(target.x, target.y, up.z)))
        .collect();

    let mut summary = RunSummary::default();
    for phase in [lifted.as_slice(), traverse.as_slice(), targets] {
        let run = run_moves(env, phase, observer)?;
        summary.absorb(&run);
        if run.interrupted {
            break;
        }
    }
    Ok(summary)
}

/// Move one stage, by name, to a world position.
pub fn move_stage(
    env: &mut SimulationEnvironment,
    name: &str,
    target: Point3<f64>,
    observer: &mut dyn StepObserver,
) -> Result<RunSummary, SimError> {
    let id = env.binding(name)?.id;
    info!("Moving stage '{name}' to {target}");
    run_moves(env, &[(id, target)], observer)
}

/// World targets of every stage for `device_id`.
pub fn device_targets(
    env: &SimulationEnvironment,
    device_id: u32,
) -> Result<Vec<(StageId, Point3<f64>)>, SimError> {
    let chip = env.workpiece().ok_or(SimError::NoWorkpiece)?;
    let device = chip.device(device_id)?;
    let approach = Vector3::new(0.0, 0.0, env.parameters().approach_height);
    Ok(env
        .bindings()
        .iter()
        .map(|b| (b.id, device.coupling_point(b.port) + approach))
        .collect())
}

/// Move every stage to its coupling point of `device_id`.
pub fn move_to_device(
    env: &mut SimulationEnvironment,
    device_id: u32,
    observer: &mut dyn StepObserver,
) -> Result<RunSummary, SimError> {
    let targets = device_targets(env, device_id)?;
    info!("Moving {} stages to device {device_id}", targets.len());
    move_stages(env, &targets, observer)
}

/// Visit every device in ascending id order.
pub fn move_to_all_devices(
    env: &mut SimulationEnvironment,
    observer: &mut dyn StepObserver,
) -> Result<Vec<(u32, RunSummary)>, SimError> {
    let ids: Vec<u32> = env
        .workpiece()
        .ok_or(SimError::NoWorkpiece)?
        .devices()
        .map(|d| d.id)
        .collect();

    let mut runs = Vec::with_capacity(ids.len());
    for id in ids {
        let summary = move_to_device(env, id, observer)?;
        let interrupted = summary.interrupted;
        runs.push((id, summary));
        if interrupted {
            warn!("Stopped before visiting every device");
            break;
        }
    }
    Ok(runs)
}

/// Wiggle one stage along a local axis: `+amplitude`, then `-2 * amplitude`,
/// then back to the start pose. An interrupted leg ends the wiggle.
pub fn wiggle_axis(
    env: &mut SimulationEnvironment,
    name: &str,
    axis: Axis,
    amplitude: f64,
    observer: &mut dyn StepObserver,
) -> Result<RunSummary, SimError> {
    if !amplitude.is_finite() || amplitude <= 0.0 {
        return Err(SimError::InvalidAmplitude(amplitude));
    }
    let id = env.binding(name)?.id;
    let engine = env.engine();
    let start = engine.stage_pose(id)?;
    let transform = engine.transform(id)?;

    let mut offset = Vector3::zeros();
    offset[axis.index()] = amplitude;
    let legs = [start + offset, start - offset, start].map(|local| transform.to_world(&local));

    info!("Wiggling stage '{name}' on {axis} by {amplitude}");
    let mut summary = RunSummary::default();
    for target in legs {
        let run = run_moves(env, &[(id, target)], observer)?;
        summary.absorb(&run);
        if run.interrupted {
            break;
        }
    }
    Ok(summary)
}

/// Wiggle one stage along X, Y and Z in turn.
pub fn wiggle_all_axes(
    env: &mut SimulationEnvironment,
    name: &str,
    amplitude: f64,
    observer: &mut dyn StepObserver,
) -> Result<RunSummary, SimError> {
    let mut summary = RunSummary::default();
    for axis in Axis::ALL {
        let run = wiggle_axis(env, name, axis, amplitude, observer)?;
        summary.absorb(&run);
        if run.interrupted {
            warn!("Stopped wiggling '{name}' at the {axis} axis");
            break;
        }
    }
    Ok(summary)
}

/// Simulate every unordered device pair `(d1, d2)`: place all stages at
/// `d1`, move them to `d2`, and record collisions. Runs offline.
pub fn stress_test(env: &mut SimulationEnvironment) -> Result<StressReport, SimError> {
    let ids: Vec<u32> = env
        .workpiece()
        .ok_or(SimError::NoWorkpiece)?
        .devices()
        .map(|d| d.id)
        .collect();
    if ids.len() < 2 {
        return Err(SimError::NoWorkpiece);
    }

    let realtime = env.parameters().realtime;
    env.runner_mut().set_pacing(Pacing::Offline);
    let result = run_stress_pairs(env, &ids);
    env.runner_mut().set_pacing(Pacing::from_realtime(realtime));

    let report = result?;
    info!(
        "Stress test: {}/{} pairs, stage collisions {}, chip collisions {}",
        report.completed_pairs, report.total_pairs, report.stage_collisions, report.workpiece_collisions
    );
    Ok(report)
}

fn run_stress_pairs(env: &mut SimulationEnvironment, ids: &[u32]) -> Result<StressReport, SimError> {
    let mut report = StressReport {
        total_pairs: ids.len() * (ids.len() - 1) / 2,
        ..StressReport::default()
    };

    for (i, &from) in ids.iter().enumerate() {
        for &to in &ids[i + 1..] {
            env.engine_mut().cancel_all();
            for (id, start) in device_targets(env, from)? {
                env.engine_mut().reposition(id, start)?;
            }

            let mut log = CollisionLog::new();
            let summary = move_to_device(env, to, &mut log)?;
            if summary.interrupted {
                report.interrupted = true;
                return Ok(report);
            }

            debug!(
                "Pair {from} -> {to}: stage ticks {}, chip ticks {}",
                log.stage_ticks, log.workpiece_ticks
            );
            report.completed_pairs += 1;
            if log.stage_collision() {
                report.stage_collisions += 1;
                report.stage_collision_pairs.push((from, to));
            }
            if log.workpiece_collision() {
                report.workpiece_collisions += 1;
            }
        }
    }
    Ok(report)
}
