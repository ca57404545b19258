//! Workpiece (chip) description.
//!
//! The chip is only needed for its coupling points: stages move to them, and
//! their bounding box (grown by the chip safety distance) is the workpiece's
//! collision volume.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "name": "demo-chip",
//!   "devices": [
//!     { "id": 1, "inputCoordinate": [0, 0], "outputCoordinate": [2000, 0], "type": "ring" }
//!   ]
//! }
//! ```
//!
//! Coordinates have two or three components; a missing Z is 0.

use crate::collision::CollisionVolume;
use crate::error::{SimError, parse_json, read_file};
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use stagesim_common::stage::config::DevicePort;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// World coordinate parsed from a 2- or 3-element JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct Coordinate(pub Point3<f64>);

impl TryFrom<Vec<f64>> for Coordinate {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(format!("coordinate {values:?} is not finite"));
        }
        match values.as_slice() {
            [x, y] => Ok(Self(Point3::new(*x, *y, 0.0))),
            [x, y, z] => Ok(Self(Point3::new(*x, *y, *z))),
            _ => Err(format!(
                "coordinate must have 2 or 3 components, got {}",
                values.len()
            )),
        }
    }
}

/// One device with its input and output coupling points.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: u32,
    pub input: Point3<f64>,
    pub output: Point3<f64>,
    pub kind: Option<String>,
}

impl Device {
    pub fn coupling_point(&self, port: DevicePort) -> Point3<f64> {
        match port {
            DevicePort::Input => self.input,
            DevicePort::Output => self.output,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceRecord {
    id: u32,
    input_coordinate: Coordinate,
    output_coordinate: Coordinate,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkpieceRecord {
    #[serde(default)]
    name: String,
    devices: Vec<DeviceRecord>,
}

/// The chip: a named set of devices keyed by id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workpiece {
    name: String,
    devices: BTreeMap<u32, Device>,
}

impl Workpiece {
    pub fn new(name: impl Into<String>, devices: impl IntoIterator<Item = Device>) -> Self {
        Self {
            name: name.into(),
            devices: devices.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    /// Load a chip description from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let content = read_file(path)?;
        let record: WorkpieceRecord = parse_json(path, &content)?;
        let workpiece = Self::new(
            record.name,
            record.devices.into_iter().map(|d| Device {
                id: d.id,
                input: d.input_coordinate.0,
                output: d.output_coordinate.0,
                kind: d.kind,
            }),
        );
        info!(
            "Loaded chip '{}' with {} devices from {}",
            workpiece.name,
            workpiece.len(),
            path.display()
        );
        Ok(workpiece)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, id: u32) -> Result<&Device, SimError> {
        self.devices.get(&id).ok_or(SimError::DeviceNotFound(id))
    }

    /// Devices in ascending id order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Input and output coupling points of every device.
    pub fn coupling_points(&self) -> Vec<Point3<f64>> {
        self.devices()
            .flat_map(|d| [d.input, d.output])
            .collect()
    }

    /// Mean of all coupling points.
    pub fn center(&self) -> Option<Point3<f64>> {
        let points = self.coupling_points();
        if points.is_empty() {
            return None;
        }
        let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / points.len() as f64))
    }

    /// Bounding box of all coupling points grown by `margin`.
    pub fn bounding_volume(&self, margin: f64) -> Option<CollisionVolume> {
        CollisionVolume::from_points(&self.coupling_points(), margin)
    }
}
