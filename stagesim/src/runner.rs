//! Driving loop: steps the engine until idle, paced by the clock.
//!
//! Observers receive every [`StepReport`]. The loop stops early when the
//! shared running flag is cleared (Ctrl-C), cancelling all moves so stages
//! stay where they are.

use crate::clock::{Pacing, SimulationClock};
use crate::collision::Collision;
use crate::engine::{SimulationEngine, StepReport};
use crate::error::SimError;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receives the outcome of every simulation step.
pub trait StepObserver {
    fn on_step(&mut self, report: &StepReport);
}

/// Observer that ignores everything.
impl StepObserver for () {
    fn on_step(&mut self, _report: &StepReport) {}
}

/// Logs collisions and counts the ticks in which they occurred.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CollisionLog {
    /// Ticks with at least one stage-vs-stage collision
    pub stage_ticks: u64,
    /// Ticks with at least one stage-vs-workpiece collision
    pub workpiece_ticks: u64,
    /// Every distinct pair seen so far
    pub pairs: BTreeSet<Collision>,
    /// Log every collision tick instead of only new pairs
    pub verbose: bool,
}

impl CollisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_collision(&self) -> bool {
        self.stage_ticks > 0
    }

    pub fn workpiece_collision(&self) -> bool {
        self.workpiece_ticks > 0
    }
}

impl StepObserver for CollisionLog {
    fn on_step(&mut self, report: &StepReport) {
        if report.collisions.iter().any(Collision::is_between_stages) {
            self.stage_ticks += 1;
        }
        if report.collisions.iter().any(Collision::involves_workpiece) {
            self.workpiece_ticks += 1;
        }
        for collision in &report.collisions {
            let new = self.pairs.insert(*collision);
            if new || self.verbose {
                warn!("Collision at tick {}: {}", report.tick, collision);
            }
        }
    }
}

/// Result of running the engine until idle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub steps: u64,
    /// Steps that reported at least one collision.
    pub collision_steps: u64,
    /// Simulated time covered [s].
    pub simulated_time: f64,
    pub average_step_time: Duration,
    /// The loop was stopped through the running flag.
    pub interrupted: bool,
}

impl RunSummary {
    /// Fold a later run into this one.
    pub fn absorb(&mut self, other: &RunSummary) {
        let steps = self.steps + other.steps;
        if steps > 0 {
            let total = self.average_step_time.mul_f64(self.steps as f64)
                + other.average_step_time.mul_f64(other.steps as f64);
            self.average_step_time = total.div_f64(steps as f64);
        }
        self.steps = steps;
        self.collision_steps += other.collision_steps;
        self.simulated_time += other.simulated_time;
        self.interrupted |= other.interrupted;
    }
}

/// Engine plus clock plus stop flag.
pub struct SimulationRunner {
    engine: SimulationEngine,
    clock: SimulationClock,
    running: Arc<AtomicBool>,
}

impl SimulationRunner {
    pub fn new(engine: SimulationEngine, pacing: Pacing) -> Self {
        Self {
            engine,
            clock: SimulationClock::new(pacing),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SimulationEngine {
        &mut self.engine
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.clock.set_pacing(pacing);
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Step until no stage moves or the running flag is cleared.
    pub fn run_until_idle(&mut self, observer: &mut dyn StepObserver) -> Result<RunSummary, SimError> {
        self.clock.reset_stats();
        let mut collision_steps = 0;
        let mut interrupted = false;

        while self.engine.is_moving() {
            if !self.is_running() {
                let cancelled = self.engine.cancel_all();
                info!("Run interrupted, cancelled {cancelled} moves");
                interrupted = true;
                break;
            }

            let started = self.clock.begin_step();
            let report = self.engine.step()?;
            if report.has_collisions() {
                collision_steps += 1;
            }
            observer.on_step(report);
            let sim_dt = report.sim_dt;
            self.clock.finish_step(started, sim_dt);
        }

        let stats = self.clock.stats();
        let summary = RunSummary {
            steps: stats.step_count,
            collision_steps,
            simulated_time: stats.simulated_time,
            average_step_time: stats.average_step_time(),
            interrupted,
        };
        debug!(
            "Run finished: {} steps, {:.3}s simulated, avg step {}us",
            summary.steps,
            summary.simulated_time,
            summary.average_step_time.as_micros()
        );
        Ok(summary)
    }
}
