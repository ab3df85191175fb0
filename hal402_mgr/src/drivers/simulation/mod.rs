//! Simulation driver module.
//!
//! This module provides a software DS-402 device per drive for development
//! and testing without physical hardware.

mod device;
mod driver;

pub use device::{DeviceCommand, SimulatedDevice};
pub use driver::{SimulationDriver, presented_status_word};

use hal402_common::hal::driver::IoDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn IoDriver> {
    Box::new(SimulationDriver::new())
}
