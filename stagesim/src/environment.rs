//! Assembly of a runnable simulation from `simulation.toml`.
//!
//! Loads the chip and calibration files referenced by the configuration,
//! creates every stage through the [`StageRegistry`], fits its calibration
//! (identity when none is configured) and hands the engine to a
//! [`SimulationRunner`].

use crate::alignment::{FrameAligner, RigidTransform};
use crate::calibration::CalibrationSet;
use crate::clock::Pacing;
use crate::collision::EnvelopeExtents;
use crate::engine::SimulationEngine;
use crate::error::SimError;
use crate::runner::SimulationRunner;
use crate::stages::StageRegistry;
use crate::workpiece::Workpiece;
use stagesim_common::config::ConfigLoader;
use stagesim_common::stage::config::{DevicePort, SimulationConfig, SimulationParameters};
use stagesim_common::stage::types::StageId;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Stage as configured: engine id plus the device port it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct StageBinding {
    pub id: StageId,
    pub name: String,
    pub port: DevicePort,
}

/// Everything a scenario needs: runner, chip and stage bindings.
pub struct SimulationEnvironment {
    runner: SimulationRunner,
    workpiece: Option<Workpiece>,
    bindings: Vec<StageBinding>,
    parameters: SimulationParameters,
}

/// Resolve `path` against `base_dir` unless it is absolute.
fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

impl SimulationEnvironment {
    /// Load and validate `simulation.toml` and everything it references.
    pub fn load(config_path: &Path, registry: &StageRegistry) -> Result<Self, SimError> {
        info!("Loading configuration from {:?}", config_path);
        let config = SimulationConfig::load(config_path)?;
        let base_dir = config_path.parent().unwrap_or(Path::new("."));
        Self::from_config(&config, base_dir, registry)
    }

    /// Build from an already parsed configuration; relative file paths are
    /// resolved against `base_dir`.
    pub fn from_config(
        config: &SimulationConfig,
        base_dir: &Path,
        registry: &StageRegistry,
    ) -> Result<Self, SimError> {
        config.validate()?;

        let workpiece = config
            .chip
            .as_deref()
            .map(|p| Workpiece::load(&resolve_path(base_dir, p)))
            .transpose()?;
        let calibrations = config
            .calibrations
            .as_deref()
            .map(|p| CalibrationSet::load(&resolve_path(base_dir, p)))
            .transpose()?;

        Self::build(config, workpiece, calibrations.as_ref(), registry)
    }

    /// Build from a configuration plus already loaded chip and calibrations.
    pub fn build(
        config: &SimulationConfig,
        workpiece: Option<Workpiece>,
        calibrations: Option<&CalibrationSet>,
        registry: &StageRegistry,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let parameters = config.simulation.clone();
        let mut engine = SimulationEngine::from_parameters(&parameters)?;
        let extents = EnvelopeExtents::new(&config.envelope, parameters.fiber_safety_distance);
        let aligner = FrameAligner::default();

        if let (Some(set), Some(chip)) = (calibrations, workpiece.as_ref()) {
            set.check_chip(chip.name());
        }

        let mut bindings = Vec::with_capacity(config.stages.len());
        for stage in &config.stages {
            let driver = registry.create(stage)?;
            let transform = match (&stage.calibration, calibrations) {
                (Some(key), Some(set)) => set.fit(key, &aligner)?,
                (Some(key), None) => return Err(SimError::CalibrationNotFound(key.clone())),
                (None, _) => {
                    warn!("Stage '{}' has no calibration, using identity transform", stage.name);
                    RigidTransform::identity()
                }
            };
            let id = engine.add_stage(stage.name.clone(), stage.orientation, driver, transform, &extents);
            bindings.push(StageBinding {
                id,
                name: stage.name.clone(),
                port: stage.port,
            });
        }

        if let Some(chip) = &workpiece {
            match chip.bounding_volume(parameters.chip_safety_distance) {
                Some(volume) => engine.set_workpiece(volume),
                None => warn!("Chip '{}' has no devices, no workpiece envelope", chip.name()),
            }
        }

        info!(
            "Simulation ready: {} stages, chip {}, decimation {}, {}",
            bindings.len(),
            workpiece.as_ref().map_or("<none>", |c| c.name()),
            parameters.sampling_rate,
            if parameters.realtime { "real time" } else { "offline" }
        );

        let runner = SimulationRunner::new(engine, Pacing::from_realtime(parameters.realtime));
        Ok(Self {
            runner,
            workpiece,
            bindings,
            parameters,
        })
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut SimulationRunner {
        &mut self.runner
    }

    pub fn engine(&self) -> &SimulationEngine {
        self.runner.engine()
    }

    pub fn engine_mut(&mut self) -> &mut SimulationEngine {
        self.runner.engine_mut()
    }

    pub fn workpiece(&self) -> Option<&Workpiece> {
        self.workpiece.as_ref()
    }

    pub fn bindings(&self) -> &[StageBinding] {
        &self.bindings
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.parameters
    }

    /// Find a stage binding by configured name.
    pub fn binding(&self, name: &str) -> Result<&StageBinding, SimError> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| SimError::StageNotFound(name.to_string()))
    }

    /// Switch between real-time and offline pacing.
    pub fn set_realtime(&mut self, realtime: bool) {
        self.parameters.realtime = realtime;
        self.runner.set_pacing(Pacing::from_realtime(realtime));
    }
}
