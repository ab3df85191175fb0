//! TOML configuration plumbing shared by hal402 binaries.
//!
//! Any `DeserializeOwned` type gets [`ConfigLoader`] for free; the
//! `[shared]` table ([`SharedConfig`]) carries the service name used for
//! telemetry topics and the log level handed to the tracing filter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading or validation failure.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// The file exists but could not be read.
    #[error("Failed to read configuration: {0}")]
    ReadError(String),

    /// Not valid TOML, or a field has the wrong type or value.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Parsed, but out of bounds.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every status word and control word.
    Trace,
    /// State changes.
    Debug,
    /// Requests and lifecycle (default).
    #[default]
    Info,
    /// Exhausted requests and timing violations.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// The `[shared]` table.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "hal_402_mgr"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Log level when neither `RUST_LOG` nor `-v` overrides it.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Service name; prefixes every telemetry topic.
    pub service_name: String,
}

impl SharedConfig {
    /// Rejects an empty service name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a config struct from TOML.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse `path`. A missing file is `FileNotFound`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound,
            _ => ConfigError::ReadError(format!("{}: {e}", path.display())),
        })?;
        Self::from_toml(&content)
    }

    /// Parse from an in-memory TOML document.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
