//! Stage variants and the stage driver registry.
//!
//! Provides `SimulatedStage`, a purely kinematic stage, and `StageRegistry`
//! for mapping configured driver names to factories. The registry is built
//! at startup and passed by value; there is no global state.

use nalgebra::Point3;
use stagesim_common::consts::DEFAULT_STAGE_DRIVER;
use stagesim_common::prelude::{AxisLimits, StageConfig, StageDriver, StageError, StageFactory};
use std::collections::HashMap;
use tracing::debug;

/// Kinematic stage: holds a position and limits, nothing else.
#[derive(Debug, Clone)]
pub struct SimulatedStage {
    name: String,
    limits: AxisLimits,
    position: Point3<f64>,
}

impl SimulatedStage {
    pub fn new(name: impl Into<String>, limits: AxisLimits, position: Point3<f64>) -> Self {
        Self {
            name: name.into(),
            limits,
            position,
        }
    }

    /// Factory registered under [`DEFAULT_STAGE_DRIVER`].
    pub fn from_config(config: &StageConfig) -> Result<Box<dyn StageDriver>, StageError> {
        config
            .limits
            .validate(&config.name)
            .map_err(|e| StageError::InvalidConfig(e.to_string()))?;
        let [x, y, z] = config.position;
        Ok(Box::new(Self::new(
            config.name.clone(),
            config.limits,
            Point3::new(x, y, z),
        )))
    }

    pub fn set_axis_limits(&mut self, limits: AxisLimits) {
        self.limits = limits;
    }
}

impl StageDriver for SimulatedStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn axis_limits(&self) -> AxisLimits {
        self.limits
    }

    fn position(&self) -> Point3<f64> {
        self.position
    }

    fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
    }
}

/// Registry of available stage drivers.
pub struct StageRegistry {
    factories: HashMap<&'static str, StageFactory>,
}

impl StageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with all built-in drivers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_STAGE_DRIVER, SimulatedStage::from_config);
        registry
    }

    /// Register a driver factory, replacing any factory of the same name.
    ///
    /// Returns `true` if a previous factory was replaced.
    pub fn register(&mut self, name: &'static str, factory: StageFactory) -> bool {
        self.factories.insert(name, factory).is_some()
    }

    pub fn get_factory(&self, name: &str) -> Option<StageFactory> {
        self.factories.get(name).copied()
    }

    /// Create the stage described by `config`.
    ///
    /// # Errors
    /// `StageError::DriverNotFound` if `config.driver` is not registered.
    pub fn create(&self, config: &StageConfig) -> Result<Box<dyn StageDriver>, StageError> {
        let factory = self
            .get_factory(&config.driver)
            .ok_or_else(|| StageError::DriverNotFound(config.driver.clone()))?;
        debug!("Creating stage '{}' with driver '{}'", config.name, config.driver);
        factory(config)
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
