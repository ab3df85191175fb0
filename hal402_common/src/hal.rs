//! Discrete I/O boundary: driver trait, signal layout and configuration.

pub mod config;
pub mod consts;
pub mod driver;
pub mod signal;
