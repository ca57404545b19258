//! Prelude module for common re-exports.
//!
//! # Usage
//!
//! ```rust
//! use stagesim_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::stage::config::{
    AxisLimit, AxisLimits, DevicePort, EnvelopeConfig, Orientation, SimulationConfig,
    SimulationParameters, StageConfig,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_INTEGRATION_STEP, DEFAULT_SAMPLING_RATE, MOTION_TOLERANCE};

// ─── Stages ─────────────────────────────────────────────────────────
pub use crate::stage::driver::{StageDriver, StageError, StageFactory};
pub use crate::stage::types::{Axis, StageId};
