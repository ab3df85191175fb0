//! CiA/DS-402 device profile types.
//!
//! - [`word`] - `StatusWord` / `ControlWord` bit fields
//! - [`state`] - `DriveState` and the fleet-level `LogicalState`
//! - [`classifier`] - ordered (mask, expected) rules mapping a status word to a state
//! - [`path`] - transition paths steering a drive toward a target state

pub mod classifier;
pub mod path;
pub mod state;
pub mod word;
