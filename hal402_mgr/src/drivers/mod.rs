//! I/O driver implementations.
//!
//! - [`simulation`] - Software DS-402 devices for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `IoDriver` trait from `hal402_common::hal::driver`
//! 3. Register the driver in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use hal402_common::hal::driver::HalError;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) -> Result<(), HalError> {
    registry.register("simulation", simulation::create_driver)?;
    Ok(())
}
