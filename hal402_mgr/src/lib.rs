//! # hal402 Fleet Manager Library
//!
//! Commands a fleet of DS-402 drives through discrete I/O signals.
//!
//! Drivers implement the `IoDriver` trait defined in
//! `hal402_common::hal::driver`; the manager only needs named boolean pins.
//!
//! # Module Structure
//!
//! - [`drive`] - One drive: signals, status/control words, active path
//! - [`fleet`] - FleetManager, requested-state table, convergence loop
//! - [`core`] - ManagerCore idle loop and request handles
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - I/O driver implementations
//! - [`telemetry`] - Telemetry publishers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      hal402_mgr (single crate)                   │
//! │  ┌───────────────┐   ┌──────────────┐   ┌─────────────────────┐  │
//! │  │ RequestHandle │──►│ ManagerCore  │   │  Driver Registry    │  │
//! │  │ (any thread)  │   │ (idle loop)  │   │                     │  │
//! │  └───────────────┘   └──────┬───────┘   └──────────┬──────────┘  │
//! │                             ▼                      ▼             │
//! │  ┌───────────────┐   ┌──────────────┐   ┌─────────────────────┐  │
//! │  │  Telemetry    │◄──│ FleetManager │──►│  IoDriver           │  │
//! │  │  Publisher    │   │  [Drive; N]  │   │  (trait object)     │  │
//! │  └───────────────┘   └──────────────┘   └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod core;
pub mod drive;
pub mod driver_registry;
pub mod drivers;
pub mod fleet;
pub mod telemetry;

// Re-export key types for convenience
pub use crate::core::{ManagerCore, RequestHandle, TimingStats};
pub use crate::drive::{Drive, DriveError};
pub use crate::driver_registry::DriverRegistry;
pub use crate::fleet::{FleetError, FleetManager, StateTable};
