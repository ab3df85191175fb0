//! I/O boundary and fleet constants.

/// Canonical manager component name (pin/topic prefix and logging).
pub const HAL_COMPONENT_NAME: &str = "hal_402_mgr";

/// Maximum number of drives in one fleet.
pub const MAX_DRIVES: usize = 64;

/// Default number of drives.
pub const DEFAULT_DRIVE_COUNT: usize = 6;

/// Default drive name prefix (`drive_1`, `drive_2`, ...).
pub const DEFAULT_DRIVE_PREFIX: &str = "drive_";

/// Default idle inspection rate in Hz.
pub const DEFAULT_UPDATE_RATE_HZ: f64 = 1.0;

/// Highest accepted idle inspection rate in Hz.
pub const MAX_UPDATE_RATE_HZ: f64 = 1000.0;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hal402/manager.toml";
