//! Prelude module for common re-exports.
//!
//! ```rust
//! use hal402_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::hal::config::{FleetConfig, ManagerConfig, SimulationConfig};

// ─── DS-402 ─────────────────────────────────────────────────────────
pub use crate::ds402::classifier::{
    ClassificationRule, StateClassifier, canonical_status_word, classify,
};
pub use crate::ds402::path::{
    PATH_TO_OPERATION_ENABLED, PATH_TO_SWITCH_ON_DISABLED, PathStep, TransitionPath,
};
pub use crate::ds402::state::{DriveState, LogicalState};
pub use crate::ds402::word::{BitField, ControlWord, StatusWord};

// ─── I/O boundary ───────────────────────────────────────────────────
pub use crate::hal::driver::{HalError, IoDriver};
pub use crate::hal::signal::{INPUT_SIGNALS, OUTPUT_SIGNALS, SignalDirection, SignalSpec};

// ─── Telemetry ──────────────────────────────────────────────────────
pub use crate::telemetry::{ErrorEvent, StatusEvent, TelemetryPublisher};
