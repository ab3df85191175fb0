//! Discrete I/O driver trait and error types.
//!
//! This module defines:
//! - `IoDriver` trait - Interface for pluggable discrete I/O backends
//! - `HalError` enum - Error types for I/O operations
//! - `DriverFactory` type alias - Factory function type

use crate::hal::config::ManagerConfig;
use crate::hal::signal::SignalDirection;
use std::time::Duration;
use thiserror::Error;

/// Error types for I/O boundary operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Pin was never registered
    #[error("Unknown pin: {0}")]
    UnknownPin(String),

    /// Operation not allowed on this pin or driver
    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn IoDriver>;

/// Trait defining the interface for discrete I/O drivers.
///
/// The fleet manager only needs named boolean pins: `read(name)` for
/// status-word inputs and `write(name, value)` for control-word outputs.
///
/// # Lifecycle
///
/// 1. `init()` - Called once before any pin is registered
/// 2. `register_pin()` - Called for every signal of every drive
/// 3. `ready()` - Called once all pins exist
/// 4. `write()` / `cycle()` / `read()` - Called every cycle, in that order
/// 5. `shutdown()` - Called when the manager is stopping
pub trait IoDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the driver with the manager configuration.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if initialization cannot complete.
    fn init(&mut self, config: &ManagerConfig) -> Result<(), HalError>;

    /// Create a named pin.
    ///
    /// # Errors
    /// Return `HalError::ConfigError` if the pin already exists.
    fn register_pin(&mut self, pin: &str, direction: SignalDirection) -> Result<(), HalError>;

    /// Mark the pin set as complete.
    fn ready(&mut self) -> Result<(), HalError> {
        Ok(())
    }

    /// Read the current value of a pin.
    fn read(&mut self, pin: &str) -> Result<bool, HalError>;

    /// Drive an output pin.
    fn write(&mut self, pin: &str, value: bool) -> Result<(), HalError>;

    /// Exchange one cycle with the hardware: latch written outputs, refresh inputs.
    ///
    /// Default implementation does nothing (for drivers whose pins are live).
    fn cycle(&mut self, _dt: Duration) -> Result<(), HalError> {
        Ok(())
    }

    /// Graceful shutdown of the driver.
    fn shutdown(&mut self) -> Result<(), HalError>;
}

impl<T: IoDriver + ?Sized> IoDriver for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn version(&self) -> &'static str {
        (**self).version()
    }

    fn init(&mut self, config: &ManagerConfig) -> Result<(), HalError> {
        (**self).init(config)
    }

    fn register_pin(&mut self, pin: &str, direction: SignalDirection) -> Result<(), HalError> {
        (**self).register_pin(pin, direction)
    }

    fn ready(&mut self) -> Result<(), HalError> {
        (**self).ready()
    }

    fn read(&mut self, pin: &str) -> Result<bool, HalError> {
        (**self).read(pin)
    }

    fn write(&mut self, pin: &str, value: bool) -> Result<(), HalError> {
        (**self).write(pin, value)
    }

    fn cycle(&mut self, dt: Duration) -> Result<(), HalError> {
        (**self).cycle(dt)
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        (**self).shutdown()
    }
}
