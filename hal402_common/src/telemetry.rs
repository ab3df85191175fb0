//! Per-drive telemetry events.
//!
//! Every cycle each drive emits one status event and one error event on its
//! own topics (`<service>/<drive>_status`, `<service>/<drive>_error`).
//! Delivery is fire-and-forget; publishers keep the last value per topic so
//! late subscribers still see the current state.

use crate::ds402::state::DriveState;
use serde::{Deserialize, Serialize};

/// No error.
pub const ERROR_NONE: u16 = 0x0000;
/// `step()` called before any transition path was installed.
pub const ERROR_NO_ACTIVE_PATH: u16 = 0x0001;
/// Observed state has no entry in the active path; entry point emitted.
pub const ERROR_UNROUTED_STATE: u16 = 0x0002;
/// Status word matched no classification rule.
pub const ERROR_CLASSIFICATION_MISS: u16 = 0x0003;
/// Injection requested on a drive that is not simulated.
pub const ERROR_NOT_SIMULATED: u16 = 0x0004;
/// I/O boundary failure.
pub const ERROR_IO: u16 = 0x00FF;

/// Drive status event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Drive name.
    pub drive_name: String,
    /// Classified state.
    pub state: DriveState,
    /// Status word the state was classified from.
    pub status_word: u16,
    /// Free text, only set on the startup test message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusEvent {
    /// Startup test message: state `UNKNOWN` and a line of text.
    pub fn test_message(drive_name: &str) -> Self {
        Self {
            drive_name: drive_name.to_string(),
            state: DriveState::Unknown,
            status_word: 0,
            message: Some(test_message_text("status", drive_name)),
        }
    }
}

/// Drive error event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Drive name.
    pub drive_name: String,
    /// Human-readable message.
    pub message: String,
    /// Error code (`ERROR_*`), `ERROR_NONE` when healthy.
    pub code: u16,
}

impl ErrorEvent {
    /// Startup test message on the error topic, code `ERROR_NONE`.
    pub fn test_message(drive_name: &str) -> Self {
        Self {
            drive_name: drive_name.to_string(),
            message: test_message_text("error", drive_name),
            code: ERROR_NONE,
        }
    }

    /// Event reporting a healthy cycle.
    pub fn none(drive_name: &str) -> Self {
        Self {
            drive_name: drive_name.to_string(),
            message: String::new(),
            code: ERROR_NONE,
        }
    }
}

/// Sink for per-drive telemetry.
///
/// Publishing must not fail the caller; implementations log and drop.
pub trait TelemetryPublisher: Send {
    /// Publish a status event on `topic`.
    fn publish_status(&mut self, topic: &str, event: &StatusEvent);

    /// Publish an error event on `topic`.
    fn publish_error(&mut self, topic: &str, event: &ErrorEvent);
}

fn test_message_text(channel: &str, drive_name: &str) -> String {
    format!("test message on the {channel} channel of {drive_name}")
}

/// Status topic of a drive.
pub fn status_topic(service: &str, drive_name: &str) -> String {
    format!("{service}/{drive_name}_status")
}

/// Error topic of a drive.
pub fn error_topic(service: &str, drive_name: &str) -> String {
    format!("{service}/{drive_name}_error")
}
