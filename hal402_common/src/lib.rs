//! hal402 Common Library
//!
//! This crate provides the shared DS-402 vocabulary and configuration loading
//! utilities for all hal402 workspace crates.
//!
//! # Module Structure
//!
//! - [`ds402`] - Status/control words, drive states, classification and transition paths
//! - [`hal`] - Discrete I/O driver trait, signal layout and manager configuration
//! - [`telemetry`] - Per-drive status/error events and the publisher trait
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use hal402_common::prelude::*;
//!
//! let word = StatusWord::from_bits_truncate(0x27);
//! assert_eq!(classify(word), DriveState::OperationEnabled);
//! ```

pub mod config;
pub mod ds402;
pub mod hal;
pub mod prelude;
pub mod telemetry;
