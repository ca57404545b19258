//! TOML loading for `simulation.toml` and the `[shared]` table.
//!
//! Any deserializable struct gets [`ConfigLoader::load`] through a blanket
//! impl; semantic checks live in each config's own `validate()`.
//!
//! ```rust,no_run
//! use stagesim_common::config::{ConfigError, ConfigLoader};
//! use stagesim_common::stage::config::SimulationConfig;
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SimulationConfig::load(Path::new("lab/simulation.toml"))?;
//!     println!("{} stages", config.stages.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    FileNotFound,

    /// Unreadable file or malformed TOML.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Well-formed TOML with out-of-range or inconsistent values.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// `log_level` of the `[shared]` table, written in lowercase.
///
/// `-v` on the command line overrides it with `Debug`, and `RUST_LOG`
/// overrides both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-sample profiler output.
    Trace,
    Debug,
    /// Move requests and run summaries.
    #[default]
    Info,
    /// Collision reports.
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// The `[shared]` table of `simulation.toml`.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "stagesim-lab-01"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Name of this simulation instance, shown in the startup log.
    pub service_name: String,
}

impl SharedConfig {
    /// Rejects an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads a config struct from TOML text or a file.
///
/// A missing file is `FileNotFound`; every other read or syntax failure is
/// `ParseError`. Loading does not call `validate()`.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
