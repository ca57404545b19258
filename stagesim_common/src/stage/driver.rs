//! Stage driver trait and error types.
//!
//! This module defines:
//! - `StageDriver` trait - Capability interface every stage variant implements
//! - `StageError` enum - Error types for stage creation
//! - `StageFactory` type alias - Factory function type

use crate::stage::config::{AxisLimits, StageConfig};
use nalgebra::Point3;
use thiserror::Error;

/// Error types for stage operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// No factory registered under the requested driver name.
    #[error("Stage driver not found: {0}")]
    DriverNotFound(String),

    /// Stage configuration rejected by the driver.
    #[error("Invalid stage configuration: {0}")]
    InvalidConfig(String),
}

/// Factory function type for creating stage instances from configuration.
pub type StageFactory = fn(&StageConfig) -> Result<Box<dyn StageDriver>, StageError>;

/// Capability interface of a positioning stage.
///
/// The simulation engine owns one driver per stage and only relies on the
/// limits getter and the pose accessors. Positions are in the stage's local
/// frame.
pub trait StageDriver: Send {
    /// Stage name as configured.
    fn name(&self) -> &str;

    /// Per-axis speed and acceleration limits.
    fn axis_limits(&self) -> AxisLimits;

    /// Current local-frame position.
    fn position(&self) -> Point3<f64>;

    /// Command the stage to an absolute local-frame position.
    fn set_position(&mut self, position: Point3<f64>);
}
