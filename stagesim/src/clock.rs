//! Wall-clock pacing of simulation steps.
//!
//! The engine itself is purely step-driven and never reads the time. The
//! clock wraps each `step()` call: in real-time mode it sleeps for whatever
//! is left of the step's simulated duration after the wall time the step
//! took, in offline mode it never sleeps.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Pacing mode of the driving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Align wall-clock time with simulated time.
    RealTime,
    /// Run as fast as possible.
    #[default]
    Offline,
}

impl Pacing {
    pub fn from_realtime(realtime: bool) -> Self {
        if realtime {
            Pacing::RealTime
        } else {
            Pacing::Offline
        }
    }
}

/// Timing statistics of the driving loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingStats {
    /// Steps executed
    pub step_count: u64,
    /// Steps whose wall time exceeded their simulated duration (real time only)
    pub overruns: u64,
    /// Longest wall time of a single step
    pub max_step_time: Duration,
    /// Sum of wall times of all steps
    pub total_step_time: Duration,
    /// Sum of simulated step durations [s]
    pub simulated_time: f64,
}

impl TimingStats {
    /// Mean wall time per step.
    pub fn average_step_time(&self) -> Duration {
        if self.step_count == 0 {
            Duration::ZERO
        } else {
            self.total_step_time.div_f64(self.step_count as f64)
        }
    }
}

/// Paces simulation steps and records their timing.
#[derive(Debug, Default)]
pub struct SimulationClock {
    pacing: Pacing,
    stats: TimingStats,
}

impl SimulationClock {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            stats: TimingStats::default(),
        }
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = pacing;
    }

    pub fn stats(&self) -> &TimingStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TimingStats::default();
    }

    /// Mark the start of a step.
    pub fn begin_step(&self) -> Instant {
        Instant::now()
    }

    /// Record a finished step and, in real-time mode, sleep off the rest of
    /// its simulated duration. Returns the time slept.
    pub fn finish_step(&mut self, started: Instant, sim_dt: f64) -> Duration {
        let wall = started.elapsed();
        let delay = self.record(wall, sim_dt);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        delay
    }

    /// Update statistics for one step and return the pacing delay it needs.
    fn record(&mut self, wall: Duration, sim_dt: f64) -> Duration {
        self.stats.step_count += 1;
        self.stats.total_step_time += wall;
        self.stats.max_step_time = self.stats.max_step_time.max(wall);
        self.stats.simulated_time += sim_dt.max(0.0);

        if self.pacing == Pacing::Offline {
            return Duration::ZERO;
        }

        if wall.as_secs_f64() > sim_dt {
            self.stats.overruns += 1;
            if self.stats.overruns <= 10 || self.stats.overruns % 1000 == 0 {
                warn!(
                    "Pacing overrun #{}: step took {}us (simulated {:.0}us)",
                    self.stats.overruns,
                    wall.as_micros(),
                    sim_dt * 1e6
                );
            }
        }

        if self.stats.step_count % 1000 == 0 {
            debug!(
                "Clock: {} steps, avg={}us, max={}us, overruns={}",
                self.stats.step_count,
                self.stats.average_step_time().as_micros(),
                self.stats.max_step_time.as_micros(),
                self.stats.overruns
            );
        }

        pacing_delay(sim_dt, wall)
    }
}

/// `max(0, sim_dt - wall)` as a duration.
pub fn pacing_delay(sim_dt: f64, wall: Duration) -> Duration {
    let remaining = sim_dt - wall.as_secs_f64();
    if remaining.is_finite() && remaining > 0.0 {
        Duration::from_secs_f64(remaining)
    } else {
        Duration::ZERO
    }
}
