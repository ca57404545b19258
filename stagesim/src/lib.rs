//! # Stage Simulation Library
//!
//! Motion and geometry core for simulating multi-axis positioning stages
//! mounted around a chip.
//!
//! # Module Structure
//!
//! - [`alignment`] - Rigid transform fit between stage and chip frames
//! - [`motion`] - Trapezoidal per-axis profiles and waypoint synchronization
//! - [`collision`] - Stage safety envelopes and overlap detection
//! - [`engine`] - Stage table, move requests and the step loop
//! - [`clock`] - Real-time or offline pacing with timing statistics
//! - [`runner`] - Drives the engine until idle, reports to observers
//! - [`stages`] - Stage drivers and their factory registry
//! - [`workpiece`] / [`calibration`] - Chip and calibration file loaders
//! - [`environment`] - Assembly from `simulation.toml`
//! - [`scenario`] - Device moves and the device-pair stress test
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           stagesim                               │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │  scenario   │───►│   runner     │───►│  SimulationEngine   │  │
//! │  │             │    │  (clock)     │    │                     │  │
//! │  └─────────────┘    └──────────────┘    └──────────┬──────────┘  │
//! │                                                    │             │
//! │                     ┌──────────────┬───────────────┼──────────┐  │
//! │                     ▼              ▼               ▼          │  │
//! │              ┌────────────┐ ┌────────────┐ ┌──────────────┐   │  │
//! │              │ alignment  │ │  motion    │ │  collision   │   │  │
//! │              └────────────┘ └────────────┘ └──────────────┘   │  │
//! │                                                               │  │
//! │                     StageDriver (trait object) ◄──────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod alignment;
pub mod calibration;
pub mod clock;
pub mod collision;
pub mod engine;
pub mod environment;
pub mod error;
pub mod motion;
pub mod runner;
pub mod scenario;
pub mod stages;
pub mod workpiece;

// Re-export key types for convenience
pub use crate::alignment::{AlignmentError, FrameAligner, RigidTransform};
pub use crate::clock::{Pacing, SimulationClock};
pub use crate::collision::{Collider, Collision, CollisionVolume, EnvelopeExtents};
pub use crate::engine::{EngineError, SimulationEngine, StageState, StepReport};
pub use crate::environment::SimulationEnvironment;
pub use crate::error::SimError;
pub use crate::motion::{MotionError, MotionProfiler, MotionSegment, SynchronizedWaypoints};
pub use crate::runner::{CollisionLog, RunSummary, SimulationRunner, StepObserver};
pub use crate::stages::{SimulatedStage, StageRegistry};
pub use crate::workpiece::Workpiece;
