//! Drive and fleet state enums.
//!
//! `DriveState` is the per-drive DS-402 power state derived from the status
//! word. `LogicalState` is the fleet-wide state requested through the
//! command boundary.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// DS-402 drive state.
///
/// A drive is always in exactly one state; `Unknown` is held until the
/// first classification and whenever the status word matches no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum DriveState {
    /// Not yet classified, or no rule matched.
    Unknown = 0,
    /// Low-level power applied, drive initialising.
    NotReadyToSwitchOn = 1,
    /// Initialisation complete, high voltage may not be applied.
    SwitchOnDisabled = 2,
    /// High voltage may be applied.
    ReadyToSwitchOn = 3,
    /// Power amplifier ready.
    SwitchedOn = 4,
    /// Drive function enabled.
    OperationEnabled = 5,
    /// Drive fault latched.
    Fault = 6,
    /// Fault reaction in progress.
    FaultReactionActive = 7,
    /// Quick stop function executing.
    QuickStopActive = 8,
}

impl DriveState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Unknown,
        Self::NotReadyToSwitchOn,
        Self::SwitchOnDisabled,
        Self::ReadyToSwitchOn,
        Self::SwitchedOn,
        Self::OperationEnabled,
        Self::Fault,
        Self::FaultReactionActive,
        Self::QuickStopActive,
    ];

    /// Number of distinct drive states.
    pub const COUNT: usize = Self::ALL.len();

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::NotReadyToSwitchOn),
            2 => Some(Self::SwitchOnDisabled),
            3 => Some(Self::ReadyToSwitchOn),
            4 => Some(Self::SwitchedOn),
            5 => Some(Self::OperationEnabled),
            6 => Some(Self::Fault),
            7 => Some(Self::FaultReactionActive),
            8 => Some(Self::QuickStopActive),
            _ => None,
        }
    }

    /// Human-readable name as used on the telemetry topics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::NotReadyToSwitchOn => "NOT READY TO SWITCH ON",
            Self::SwitchOnDisabled => "SWITCH ON DISABLED",
            Self::ReadyToSwitchOn => "READY TO SWITCH ON",
            Self::SwitchedOn => "SWITCHED ON",
            Self::OperationEnabled => "OPERATION ENABLED",
            Self::Fault => "FAULT",
            Self::FaultReactionActive => "FAULT REACTION ACTIVE",
            Self::QuickStopActive => "QUICK STOP ACTIVE",
        }
    }

    /// Returns true for the two fault states.
    #[inline]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault | Self::FaultReactionActive)
    }
}

impl Default for DriveState {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for DriveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveState {
    type Err = String;

    /// Accepts both `"SWITCH ON DISABLED"` and `"SWITCH_ON_DISABLED"`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', " ").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == wanted)
            .ok_or_else(|| format!("unknown DriveState: {s:?}"))
    }
}

/// Fleet-wide logical state, selected by name through the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogicalState {
    /// Initial state, nothing requested yet.
    Unknown = 0,
    /// All drives switch-on-disabled.
    Stopped = 1,
    /// All drives operation-enabled.
    Started = 2,
    /// Last request did not converge.
    Error = 3,
}

impl LogicalState {
    /// Every recognised logical state.
    pub const ALL: [Self; 4] = [Self::Unknown, Self::Stopped, Self::Started, Self::Error];

    /// Name used on the command boundary.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Error => "error",
        }
    }
}

impl Default for LogicalState {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for LogicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalState {
    type Err = String;

    /// Exact, case-sensitive match on the command-boundary name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown LogicalState: {s:?}"))
    }
}
