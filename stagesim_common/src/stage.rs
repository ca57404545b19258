//! Stage definitions shared between the simulation core and its drivers.
//!
//! - [`types`] - Stage identifiers and the axis enumeration
//! - [`config`] - `SimulationConfig` loaded from `simulation.toml`
//! - [`driver`] - `StageDriver` capability trait and `StageError`

pub mod config;
pub mod driver;
pub mod types;
