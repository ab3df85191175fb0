//! Fleet manager configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "hal_402_mgr"
//!
//! [fleet]
//! drive_count = 6
//! drive_prefix = "drive_"
//! update_rate_hz = 1.0
//!
//! [simulation]
//! enabled = true
//! initial_state = "SWITCH_ON_DISABLED"
//!
//! [simulation.pinned]
//! drive_3 = "FAULT"
//! ```

use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
use crate::ds402::state::DriveState;
use crate::hal::consts::{
    DEFAULT_DRIVE_COUNT, DEFAULT_DRIVE_PREFIX, DEFAULT_UPDATE_RATE_HZ, HAL_COMPONENT_NAME,
    MAX_DRIVES, MAX_UPDATE_RATE_HZ,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Top-level manager configuration. Every section is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Logging and instance name.
    #[serde(default = "default_shared")]
    pub shared: SharedConfig,

    /// Fleet layout and cycle rate.
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Simulation setup.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_shared() -> SharedConfig {
    SharedConfig {
        log_level: LogLevel::Info,
        service_name: HAL_COMPONENT_NAME.to_string(),
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            shared: default_shared(),
            fleet: FleetConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Load from a TOML file and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        info!(
            "Loaded config from {:?}: {} drives at {} Hz, simulation={}",
            path, config.fleet.drive_count, config.fleet.update_rate_hz, config.simulation.enabled
        );
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.fleet.validate()?;

        let names = self.fleet.drive_names();
        for (drive, state) in &self.simulation.pinned {
            if !names.iter().any(|name| name == drive) {
                return Err(ConfigError::ValidationError(format!(
                    "simulation.pinned references unknown drive '{drive}' ({state})"
                )));
            }
        }
        if !self.simulation.pinned.is_empty() && !self.simulation.enabled {
            return Err(ConfigError::ValidationError(
                "simulation.pinned requires simulation.enabled = true".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fleet layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    /// Number of drives (1..=64).
    #[serde(default = "default_drive_count")]
    pub drive_count: usize,

    /// Drive name prefix; drives are named `<prefix>1..<prefix>N`.
    #[serde(default = "default_drive_prefix")]
    pub drive_prefix: String,

    /// Idle inspection rate in Hz.
    #[serde(default = "default_update_rate_hz")]
    pub update_rate_hz: f64,
}

fn default_drive_count() -> usize {
    DEFAULT_DRIVE_COUNT
}

fn default_drive_prefix() -> String {
    DEFAULT_DRIVE_PREFIX.to_string()
}

fn default_update_rate_hz() -> f64 {
    DEFAULT_UPDATE_RATE_HZ
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            drive_count: DEFAULT_DRIVE_COUNT,
            drive_prefix: default_drive_prefix(),
            update_rate_hz: DEFAULT_UPDATE_RATE_HZ,
        }
    }
}

impl FleetConfig {
    /// Validate bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drive_count == 0 || self.drive_count > MAX_DRIVES {
            return Err(ConfigError::ValidationError(format!(
                "fleet.drive_count must be in 1..={MAX_DRIVES}, got {}",
                self.drive_count
            )));
        }
        if self.drive_prefix.is_empty() || self.drive_prefix.contains('.') {
            return Err(ConfigError::ValidationError(
                "fleet.drive_prefix must be non-empty and contain no '.'".to_string(),
            ));
        }
        if !self.update_rate_hz.is_finite()
            || self.update_rate_hz <= 0.0
            || self.update_rate_hz > MAX_UPDATE_RATE_HZ
        {
            return Err(ConfigError::ValidationError(format!(
                "fleet.update_rate_hz must be in (0, {MAX_UPDATE_RATE_HZ}], got {}",
                self.update_rate_hz
            )));
        }
        Ok(())
    }

    /// Drive names in insertion order.
    pub fn drive_names(&self) -> Vec<String> {
        (1..=self.drive_count)
            .map(|i| format!("{}{}", self.drive_prefix, i))
            .collect()
    }

    /// Idle cycle period.
    pub fn cycle_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.update_rate_hz)
    }
}

/// Simulation setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Mark drives as simulated (enables status injection).
    #[serde(default)]
    pub enabled: bool,

    /// Start state of every simulated device.
    #[serde(default = "default_initial_state")]
    pub initial_state: DriveState,

    /// Drives whose inputs are pinned to a state at startup.
    #[serde(default)]
    pub pinned: BTreeMap<String, DriveState>,
}

fn default_initial_state() -> DriveState {
    DriveState::SwitchOnDisabled
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_state: default_initial_state(),
            pinned: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ManagerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.shared.service_name, HAL_COMPONENT_NAME);
        assert_eq!(config.fleet.drive_count, 6);
        assert_eq!(config.fleet.cycle_time(), Duration::from_secs(1));
    }

    #[test]
    fn test_drive_names_in_insertion_order() {
        let fleet = FleetConfig {
            drive_count: 3,
            ..FleetConfig::default()
        };
        assert_eq!(fleet.drive_names(), vec!["drive_1", "drive_2", "drive_3"]);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ManagerConfig::from_toml("").unwrap();
        assert_eq!(config.fleet.drive_count, DEFAULT_DRIVE_COUNT);
        assert!(!config.simulation.enabled);
        assert_eq!(config.simulation.initial_state, DriveState::SwitchOnDisabled);
    }

    #[test]
    fn test_drive_count_bounds() {
        let mut config = ManagerConfig::default();
        config.fleet.drive_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
        config.fleet.drive_count = MAX_DRIVES + 1;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
        config.fleet.drive_count = MAX_DRIVES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_update_rate_bounds() {
        let mut config = ManagerConfig::default();
        for bad in [0.0, -1.0, f64::NAN, MAX_UPDATE_RATE_HZ * 2.0] {
            config.fleet.update_rate_hz = bad;
            assert!(config.validate().is_err(), "rate {bad} accepted");
        }
    }

    #[test]
    fn test_pinned_drive_must_exist() {
        let config = ManagerConfig::from_toml(
            r#"
[fleet]
drive_count = 2

[simulation]
enabled = true

[simulation.pinned]
drive_7 = "FAULT"
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_pinned_requires_simulation() {
        let config = ManagerConfig::from_toml(
            r#"
[simulation.pinned]
drive_1 = "FAULT"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ManagerConfig::from_toml("[fleet]\ndrives = 4\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
