//! Trajectory synthesis.
//!
//! - [`profile`] - Per-axis trapezoidal velocity profiles by fixed-step integration
//! - [`sync`] - Resampling of per-axis segments onto one shared timeline

pub mod profile;
pub mod sync;

pub use profile::{MotionProfiler, MotionSample, MotionSegment};
pub use sync::{synchronize, SynchronizedWaypoints};

use thiserror::Error;

/// Errors raised while building a trajectory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// No axis has anything to do.
    #[error("No motion: every axis is already at its target")]
    NoMotion,

    /// Speed or acceleration limit is not strictly positive.
    #[error("Invalid axis limits: max_speed={max_speed}, max_acceleration={max_acceleration}")]
    InvalidLimits { max_speed: f64, max_acceleration: f64 },

    /// Output decimation of zero.
    #[error("Output decimation must be at least 1")]
    InvalidDecimation,

    /// Start or target coordinate is NaN or infinite.
    #[error("Non-finite position: start={start}, target={target}")]
    NonFinitePosition { start: f64, target: f64 },
}
