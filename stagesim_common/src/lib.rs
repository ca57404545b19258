//! Stage Simulation Common Library
//!
//! This crate provides shared constants, configuration loading utilities and
//! the stage capability interface for all stage simulation workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and shared config types
//! - [`consts`] - Numeric defaults and tolerances
//! - [`stage`] - Stage identifiers, axis limits, simulation config, driver trait
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use stagesim_common::prelude::*;
//! use stagesim_common::stage::config::{AxisLimits, Orientation};
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod stage;
