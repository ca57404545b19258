//! Trapezoidal velocity profiles.
//!
//! The profile is produced by integrating velocity over a fixed time step
//! rather than in closed form. Each step the commanded velocity is the lesser
//! of the speed limit and the stopping velocity `sqrt(2 * a * remaining)`,
//! and the change in velocity is clamped to `a * dt`. This yields the
//! accelerate / cruise / decelerate shape, degenerating to a triangle for
//! short moves.

use super::MotionError;
use stagesim_common::consts::{DEFAULT_INTEGRATION_STEP, MOTION_TOLERANCE};
use tracing::{debug, trace};

/// Samples kept in memory at most, regardless of the estimated duration.
const MAX_RESERVED_SAMPLES: usize = 1 << 24;

/// One `(time, position)` sample of an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub time: f64,
    pub position: f64,
}

/// Time-parameterized positions of one axis over one move.
///
/// Samples are spaced by the integration step, so the `i`th sample is at
/// `i * step`. An empty segment means the axis does not move.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSegment {
    start: f64,
    target: f64,
    step: f64,
    positions: Vec<f64>,
}

impl MotionSegment {
    /// A segment with no samples: the axis stays at `position`.
    pub fn stationary(position: f64) -> Self {
        Self {
            start: position,
            target: position,
            step: DEFAULT_INTEGRATION_STEP,
            positions: Vec::new(),
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Integration step between consecutive samples.
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Time of the last sample (0 for an empty segment).
    pub fn duration(&self) -> f64 {
        self.time_at(self.positions.len().saturating_sub(1))
    }

    /// Time of the `index`th sample.
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.step
    }

    pub fn sample(&self, index: usize) -> Option<MotionSample> {
        self.positions.get(index).map(|&position| MotionSample {
            time: self.time_at(index),
            position,
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = MotionSample> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, &position)| MotionSample {
                time: self.time_at(i),
                position,
            })
    }

    pub fn last(&self) -> Option<MotionSample> {
        self.sample(self.positions.len().checked_sub(1)?)
    }

    /// Position at time `t`, linearly interpolated between samples.
    ///
    /// Before the first sample this is `start`; at or past the last sample
    /// (and always for an empty segment) it is `target` exactly.
    pub fn position_at(&self, t: f64) -> f64 {
        let Some(last) = self.positions.len().checked_sub(1) else {
            return self.target;
        };
        if t <= 0.0 {
            return self.start;
        }
        let scaled = t / self.step;
        let lower = scaled.floor() as usize;
        if lower >= last {
            return self.target;
        }
        let frac = scaled - lower as f64;
        let a = self.positions[lower];
        let b = self.positions[lower + 1];
        a + (b - a) * frac
    }
}

/// Produces per-axis motion segments by fixed-step integration.
#[derive(Debug, Clone, Copy)]
pub struct MotionProfiler {
    integration_step: f64,
}

impl Default for MotionProfiler {
    fn default() -> Self {
        Self {
            integration_step: DEFAULT_INTEGRATION_STEP,
        }
    }
}

impl MotionProfiler {
    /// Profiler with a custom integration step.
    ///
    /// # Errors
    /// `InvalidLimits` if the step is not strictly positive and finite.
    pub fn new(integration_step: f64) -> Result<Self, MotionError> {
        if !(integration_step.is_finite() && integration_step > 0.0) {
            return Err(MotionError::InvalidLimits {
                max_speed: f64::NAN,
                max_acceleration: f64::NAN,
            });
        }
        Ok(Self { integration_step })
    }

    pub fn integration_step(&self) -> f64 {
        self.integration_step
    }

    /// Integrate a trapezoidal profile from `start` to `target`.
    ///
    /// Returns an empty segment when `|target - start|` is within the motion
    /// tolerance. Otherwise the first sample is `start` at time 0 and the
    /// last sample is `target` exactly.
    ///
    /// # Errors
    /// - `InvalidLimits` if `max_speed` or `max_acceleration` is not positive
    /// - `NonFinitePosition` if `start` or `target` is NaN or infinite
    pub fn profile(
        &self,
        start: f64,
        target: f64,
        max_speed: f64,
        max_acceleration: f64,
    ) -> Result<MotionSegment, MotionError> {
        let limits_valid = max_speed.is_finite()
            && max_acceleration.is_finite()
            && max_speed > 0.0
            && max_acceleration > 0.0;
        if !limits_valid {
            return Err(MotionError::InvalidLimits {
                max_speed,
                max_acceleration,
            });
        }
        if !(start.is_finite() && target.is_finite()) {
            return Err(MotionError::NonFinitePosition { start, target });
        }

        let dt = self.integration_step;
        let distance = (target - start).abs();
        if distance <= MOTION_TOLERANCE {
            trace!("Zero-length move at {start}");
            return Ok(MotionSegment {
                start,
                target,
                step: dt,
                positions: Vec::new(),
            });
        }
        let direction = (target - start).signum();

        let mut positions = Vec::with_capacity(estimate_samples(distance, max_speed, max_acceleration, dt));
        positions.push(start);

        let max_velocity_change = max_acceleration * dt;
        let mut velocity = 0.0_f64;
        let mut travelled = 0.0_f64;
        loop {
            let remaining = distance - travelled;
            let desired = (2.0 * max_acceleration * remaining).sqrt().min(max_speed);
            velocity += (desired - velocity).clamp(-max_velocity_change, max_velocity_change);
            travelled += velocity * dt;

            if distance - travelled <= MOTION_TOLERANCE {
                positions.push(target);
                break;
            }
            positions.push(start + direction * travelled);
        }

        let segment = MotionSegment {
            start,
            target,
            step: dt,
            positions,
        };
        debug!(
            "Profiled {start:.3} -> {target:.3}: {} samples over {:.4}s",
            segment.len(),
            segment.duration()
        );
        Ok(segment)
    }
}

/// Sample count of an ideal trapezoid, used only to size the buffer.
fn estimate_samples(distance: f64, max_speed: f64, max_acceleration: f64, dt: f64) -> usize {
    let duration = if distance * max_acceleration >= max_speed * max_speed {
        distance / max_speed + max_speed / max_acceleration
    } else {
        2.0 * (distance / max_acceleration).sqrt()
    };
    ((duration / dt) as usize).saturating_add(2).min(MAX_RESERVED_SAMPLES)
}
