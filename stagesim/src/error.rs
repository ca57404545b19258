//! Top-level error type of the simulation crate.

use crate::alignment::AlignmentError;
use crate::engine::EngineError;
use crate::motion::MotionError;
use stagesim_common::config::ConfigError;
use stagesim_common::stage::driver::StageError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by the environment, scenarios and the binary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// File could not be read.
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// File content is not valid JSON for the expected schema.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Device not found: {0}")]
    DeviceNotFound(u32),

    #[error("Stage not found: {0}")]
    StageNotFound(String),

    #[error("Calibration '{0}' not found")]
    CalibrationNotFound(String),

    /// A scenario needs a chip but none is configured or it has no devices.
    #[error("No workpiece devices available")]
    NoWorkpiece,

    /// Wiggle amplitude must be finite and positive.
    #[error("Invalid wiggle amplitude: {0}")]
    InvalidAmplitude(f64),

    /// The run was stopped before all moves completed.
    #[error("Simulation interrupted")]
    Interrupted,
}

impl From<MotionError> for SimError {
    fn from(e: MotionError) -> Self {
        SimError::Engine(EngineError::Motion(e))
    }
}

/// Read a whole file, mapping failures to `SimError::Io`.
pub(crate) fn read_file(path: &Path) -> Result<String, SimError> {
    std::fs::read_to_string(path).map_err(|e| SimError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse JSON text read from `path`, mapping failures to `SimError::Parse`.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    path: &Path,
    content: &str,
) -> Result<T, SimError> {
    serde_json::from_str(content).map_err(|e| SimError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
