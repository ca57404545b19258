//! Calibration point-set loader.
//!
//! A calibration file pairs stage (local) coordinates with chip (world)
//! coordinates for each calibrated stage:
//!
//! ```json
//! {
//!   "chipName": "demo",
//!   "left": {
//!     "chipCoordinates":  [[0, 0, 0], [2000, 0, 0], [0, 500, 0]],
//!     "stageCoordinates": [[100, 50, 0], [2100, 50, 0], [100, 550, 0]]
//!   }
//! }
//! ```

use crate::alignment::{FrameAligner, RigidTransform};
use crate::error::{SimError, parse_json, read_file};
use crate::workpiece::Coordinate;
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Paired points of one stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationPoints {
    /// World-frame points.
    pub chip_coordinates: Vec<Coordinate>,
    /// Matching local-frame points.
    pub stage_coordinates: Vec<Coordinate>,
}

impl CalibrationPoints {
    pub fn local(&self) -> Vec<Point3<f64>> {
        self.stage_coordinates.iter().map(|c| c.0).collect()
    }

    pub fn world(&self) -> Vec<Point3<f64>> {
        self.chip_coordinates.iter().map(|c| c.0).collect()
    }
}

/// All calibrations of one file, keyed by name.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CalibrationSet {
    #[serde(rename = "chipName", default)]
    chip_name: Option<String>,
    #[serde(flatten)]
    entries: BTreeMap<String, CalibrationPoints>,
}

impl CalibrationSet {
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let content = read_file(path)?;
        let set: Self = parse_json(path, &content)?;
        info!(
            "Loaded {} calibrations from {}",
            set.entries.len(),
            path.display()
        );
        Ok(set)
    }

    pub fn chip_name(&self) -> Option<&str> {
        self.chip_name.as_deref()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Result<&CalibrationPoints, SimError> {
        self.entries
            .get(key)
            .ok_or_else(|| SimError::CalibrationNotFound(key.to_string()))
    }

    /// Fit the transform stored under `key`.
    pub fn fit(&self, key: &str, aligner: &FrameAligner) -> Result<RigidTransform, SimError> {
        let points = self.get(key)?;
        let transform = aligner.fit(&points.local(), &points.world())?;
        info!(
            "Calibration '{key}': rms residual {:.3}",
            transform.rms_residual()
        );
        Ok(transform)
    }

    /// Warn when the calibration was recorded for a different chip.
    pub fn check_chip(&self, chip_name: &str) {
        if let Some(expected) = self.chip_name() {
            if !chip_name.is_empty() && expected != chip_name {
                warn!("Calibrations were recorded for chip '{expected}', loaded chip is '{chip_name}'");
            }
        }
    }
}
