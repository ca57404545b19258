//! Simulation engine: stage poses, move execution and collision checks.
//!
//! Each stage is `Idle` or `Moving`. A move request converts the world
//! target into the stage's local frame, profiles every axis with the stage's
//! limits, synchronizes the axes and stores the waypoints with a cursor.
//! Every `step()` advances the cursor of each moving stage by one waypoint,
//! shifts its safety envelope by the world-frame delta and, once all stages
//! are advanced, checks every pair of volumes. Collisions are reported and
//! never stop a move.
//!
//! ```text
//!   request_move            step() * N           last waypoint
//!  Idle ──────────► Moving ──────────► Moving ──────────────► Idle
//!                     │
//!                     └── cancel() ──► Idle (stays where it is)
//! ```

use crate::alignment::RigidTransform;
use crate::collision::{Collider, Collision, CollisionVolume, EnvelopeExtents, detect_collisions};
use crate::motion::{MotionError, MotionProfiler, SynchronizedWaypoints, synchronize};
use nalgebra::Point3;
use stagesim_common::stage::config::{Orientation, SimulationParameters};
use stagesim_common::stage::driver::StageDriver;
use stagesim_common::stage::types::{Axis, StageId};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors raised by engine requests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The stage already executes a move.
    #[error("{0} is busy with another move")]
    StageBusy(StageId),

    /// `step()` called while no stage moves.
    #[error("No stage is moving")]
    NotMoving,

    /// No stage registered under this id.
    #[error("Unknown stage: {0}")]
    UnknownStage(StageId),

    /// Trajectory could not be built.
    #[error(transparent)]
    Motion(#[from] MotionError),
}

/// Lifecycle state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Idle,
    Moving,
}

/// Pose change of one stage during a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StageUpdate {
    pub stage: StageId,
    /// Local-frame position after the step.
    pub local: Point3<f64>,
    /// World-frame position after the step.
    pub world: Point3<f64>,
    /// Waypoint time within the stage's move [s].
    pub time: f64,
    /// This was the last waypoint of the move.
    pub finished: bool,
}

/// Outcome of one `step()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepReport {
    /// Step counter, starting at 1.
    pub tick: u64,
    /// Largest waypoint time increment among advanced stages [s].
    pub sim_dt: f64,
    pub updates: Vec<StageUpdate>,
    /// Overlapping pairs after all stages advanced.
    pub collisions: Vec<Collision>,
}

impl StepReport {
    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }
}

#[derive(Debug)]
struct ActiveMove {
    waypoints: SynchronizedWaypoints,
    cursor: usize,
}

struct SimStage {
    name: String,
    orientation: Orientation,
    driver: Box<dyn StageDriver>,
    transform: RigidTransform,
    volume: CollisionVolume,
    active: Option<ActiveMove>,
}

impl SimStage {
    fn world_position(&self) -> Point3<f64> {
        self.transform.to_world(&self.driver.position())
    }
}

/// Step-driven simulation of all stages around one workpiece.
pub struct SimulationEngine {
    profiler: MotionProfiler,
    decimation: usize,
    stages: Vec<SimStage>,
    workpiece: Option<CollisionVolume>,
    tick: u64,
    last_report: Option<StepReport>,
}

impl SimulationEngine {
    /// Create an engine without stages.
    ///
    /// # Errors
    /// `MotionError::InvalidDecimation` if `decimation` is 0.
    pub fn new(profiler: MotionProfiler, decimation: usize) -> Result<Self, EngineError> {
        if decimation == 0 {
            return Err(MotionError::InvalidDecimation.into());
        }
        Ok(Self {
            profiler,
            decimation,
            stages: Vec::new(),
            workpiece: None,
            tick: 0,
            last_report: None,
        })
    }

    /// Engine using the integration step and sampling rate of `parameters`.
    pub fn from_parameters(parameters: &SimulationParameters) -> Result<Self, EngineError> {
        let profiler = MotionProfiler::new(parameters.integration_step)?;
        Self::new(profiler, parameters.sampling_rate)
    }

    /// Register a stage. Its envelope is placed at the driver's current
    /// position mapped through `transform`.
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        orientation: Orientation,
        driver: Box<dyn StageDriver>,
        transform: RigidTransform,
        extents: &EnvelopeExtents,
    ) -> StageId {
        let id = StageId(self.stages.len());
        let name = name.into();
        let world = transform.to_world(&driver.position());
        let volume = CollisionVolume::at(world, orientation, extents);
        info!("Added {id} '{name}' ({orientation}) at world {world}");
        self.stages.push(SimStage {
            name,
            orientation,
            driver,
            transform,
            volume,
            active: None,
        });
        id
    }

    /// Set (or replace) the static workpiece envelope.
    pub fn set_workpiece(&mut self, volume: CollisionVolume) {
        debug!(
            "Workpiece envelope {} .. {}",
            volume.min(),
            volume.max()
        );
        self.workpiece = Some(volume);
    }

    pub fn workpiece(&self) -> Option<&CollisionVolume> {
        self.workpiece.as_ref()
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stage_ids(&self) -> impl Iterator<Item = StageId> + '_ {
        (0..self.stages.len()).map(StageId)
    }

    /// Look up a stage by its configured name.
    pub fn find_stage(&self, name: &str) -> Option<StageId> {
        self.stages.iter().position(|s| s.name == name).map(StageId)
    }

    fn stage(&self, id: StageId) -> Result<&SimStage, EngineError> {
        self.stages.get(id.index()).ok_or(EngineError::UnknownStage(id))
    }

    fn stage_mut(&mut self, id: StageId) -> Result<&mut SimStage, EngineError> {
        self.stages
            .get_mut(id.index())
            .ok_or(EngineError::UnknownStage(id))
    }

    pub fn stage_name(&self, id: StageId) -> Result<&str, EngineError> {
        self.stage(id).map(|s| s.name.as_str())
    }

    pub fn orientation(&self, id: StageId) -> Result<Orientation, EngineError> {
        Ok(self.stage(id)?.orientation)
    }

    pub fn transform(&self, id: StageId) -> Result<&RigidTransform, EngineError> {
        Ok(&self.stage(id)?.transform)
    }

    pub fn state(&self, id: StageId) -> Result<StageState, EngineError> {
        Ok(if self.stage(id)?.active.is_some() {
            StageState::Moving
        } else {
            StageState::Idle
        })
    }

    /// True while at least one stage moves.
    pub fn is_moving(&self) -> bool {
        self.stages.iter().any(|s| s.active.is_some())
    }

    /// Local-frame position of a stage.
    pub fn stage_pose(&self, id: StageId) -> Result<Point3<f64>, EngineError> {
        Ok(self.stage(id)?.driver.position())
    }

    /// World-frame position of a stage.
    pub fn world_pose(&self, id: StageId) -> Result<Point3<f64>, EngineError> {
        Ok(self.stage(id)?.world_position())
    }

    pub fn volume(&self, id: StageId) -> Result<&CollisionVolume, EngineError> {
        Ok(&self.stage(id)?.volume)
    }

    /// Waypoints remaining in a stage's active move (0 when idle).
    pub fn remaining_waypoints(&self, id: StageId) -> Result<usize, EngineError> {
        Ok(self
            .stage(id)?
            .active
            .as_ref()
            .map_or(0, |m| m.waypoints.len() - m.cursor))
    }

    /// Start moving `id` to `target_world`.
    ///
    /// Returns the number of waypoints of the move.
    ///
    /// # Errors
    /// - `StageBusy` if the stage is already moving
    /// - `Motion(NoMotion)` if the stage already sits at the target
    /// - `Motion(InvalidLimits)` if the stage reports unusable limits
    pub fn request_move(
        &mut self,
        id: StageId,
        target_world: Point3<f64>,
    ) -> Result<usize, EngineError> {
        let profiler = self.profiler;
        let decimation = self.decimation;
        let stage = self.stage_mut(id)?;
        if stage.active.is_some() {
            return Err(EngineError::StageBusy(id));
        }

        let start = stage.driver.position();
        let target = stage.transform.to_local(&target_world);
        let limits = stage.driver.axis_limits();

        let segments = Axis::ALL
            .iter()
            .map(|&axis| {
                let limit = limits.get(axis);
                profiler.profile(
                    start[axis.index()],
                    target[axis.index()],
                    limit.max_speed,
                    limit.max_acceleration,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let waypoints = synchronize(&segments, decimation)?;
        let count = waypoints.len();

        info!(
            "{id} '{}': move {start} -> {target} (local), {count} waypoints over {:.3}s",
            stage.name,
            waypoints.duration()
        );
        stage.active = Some(ActiveMove {
            waypoints,
            cursor: 0,
        });
        Ok(count)
    }

    /// Place an idle stage at `target_world` immediately.
    ///
    /// # Errors
    /// `StageBusy` if the stage is moving.
    pub fn reposition(&mut self, id: StageId, target_world: Point3<f64>) -> Result<(), EngineError> {
        let stage = self.stage_mut(id)?;
        if stage.active.is_some() {
            return Err(EngineError::StageBusy(id));
        }
        let local = stage.transform.to_local(&target_world);
        stage.driver.set_position(local);
        stage.volume.reposition(target_world);
        debug!("{id} '{}' repositioned to world {target_world}", stage.name);
        Ok(())
    }

    /// Abandon the active move of a stage, leaving it where it is.
    ///
    /// Returns `false` if the stage was idle.
    pub fn cancel(&mut self, id: StageId) -> Result<bool, EngineError> {
        let stage = self.stage_mut(id)?;
        let cancelled = stage.active.take().is_some();
        if cancelled {
            info!(
                "{id} '{}': move cancelled at local {}",
                stage.name,
                stage.driver.position()
            );
        }
        Ok(cancelled)
    }

    /// Cancel every active move. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for index in 0..self.stages.len() {
            if matches!(self.cancel(StageId(index)), Ok(true)) {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Advance every moving stage by one waypoint and check collisions.
    ///
    /// # Errors
    /// `NotMoving` if no stage is moving.
    pub fn step(&mut self) -> Result<&StepReport, EngineError> {
        if !self.is_moving() {
            return Err(EngineError::NotMoving);
        }
        self.tick += 1;

        let mut updates = Vec::new();
        let mut sim_dt = 0.0_f64;
        for (index, stage) in self.stages.iter_mut().enumerate() {
            let Some(active) = stage.active.as_mut() else {
                continue;
            };
            let id = StageId(index);
            let cursor = active.cursor;
            let (Some(local), Some(time)) = (active.waypoints.point(cursor), active.waypoints.time(cursor))
            else {
                stage.active = None;
                continue;
            };
            if let Some(previous) = cursor.checked_sub(1).and_then(|i| active.waypoints.time(i)) {
                sim_dt = sim_dt.max(time - previous);
            }
            active.cursor += 1;
            let finished = active.cursor >= active.waypoints.len();

            let before = stage.world_position();
            stage.driver.set_position(local);
            let world = stage.transform.to_world(&local);
            stage.volume.translate(&(world - before));

            trace!("{id}: waypoint {cursor} t={time:.5} local={local}");
            if finished {
                stage.active = None;
                info!("{id} '{}': move finished at world {world}", stage.name);
            }
            updates.push(StageUpdate {
                stage: id,
                local,
                world,
                time,
                finished,
            });
        }

        let report = StepReport {
            tick: self.tick,
            sim_dt,
            updates,
            collisions: self.current_collisions(),
        };
        Ok(&*self.last_report.insert(report))
    }

    /// Collisions of the current snapshot, without stepping.
    pub fn current_collisions(&self) -> Vec<Collision> {
        let mut volumes: Vec<(Collider, &CollisionVolume)> = self
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| (Collider::Stage(StageId(index)), &stage.volume))
            .collect();
        if let Some(workpiece) = &self.workpiece {
            volumes.push((Collider::Workpiece, workpiece));
        }
        detect_collisions(&volumes)
    }

    /// Collisions reported by the latest step.
    pub fn active_events(&self) -> &[Collision] {
        self.last_report
            .as_ref()
            .map(|report| report.collisions.as_slice())
            .unwrap_or_default()
    }

    pub fn last_report(&self) -> Option<&StepReport> {
        self.last_report.as_ref()
    }

    /// Steps executed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}
