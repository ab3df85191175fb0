//! Per-drive discrete signal layout.
//!
//! Every drive owns 6 output signals (control word) and 8 input signals
//! (status word). Pin names on the I/O boundary are `<drive>.<signal>`.

use core::fmt;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::ds402::word::{ControlWord, StatusWord};

/// Direction of a signal as seen from the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalDirection {
    /// Driven by the drive, read by the manager (status word bit).
    In,
    /// Driven by the manager (control word bit).
    Out,
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "in"),
            Self::Out => write!(f, "out"),
        }
    }
}

/// Static description of one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSpec {
    /// Signal name, unique within a drive.
    pub name: &'static str,
    /// Direction.
    pub direction: SignalDirection,
    /// Bit position within the associated word.
    pub bit: u8,
}

impl SignalSpec {
    const fn input(name: &'static str, bit: u8) -> Self {
        Self {
            name,
            direction: SignalDirection::In,
            bit,
        }
    }

    const fn output(name: &'static str, bit: u8) -> Self {
        Self {
            name,
            direction: SignalDirection::Out,
            bit,
        }
    }

    /// Single-bit mask of this signal.
    #[inline]
    pub const fn mask(&self) -> u16 {
        1 << self.bit
    }
}

const OUTPUT_TABLE: [SignalSpec; 6] = [
    SignalSpec::output("switch_on", 0),
    SignalSpec::output("enable_voltage", 1),
    SignalSpec::output("quick_stop", 2),
    SignalSpec::output("enable_operation", 3),
    SignalSpec::output("fault_reset", 7),
    SignalSpec::output("halt", 8),
];

const INPUT_TABLE: [SignalSpec; 8] = [
    SignalSpec::input("ready_to_switch_on", 0),
    SignalSpec::input("switched_on", 1),
    SignalSpec::input("operation_enabled", 2),
    SignalSpec::input("fault", 3),
    SignalSpec::input("voltage_enabled", 4),
    SignalSpec::input("quick_stop_active", 5),
    SignalSpec::input("switch_on_disabled", 6),
    SignalSpec::input("warning", 7),
];

/// OR of all signal masks, or 0 if two signals share a bit.
const fn disjoint_mask(specs: &[SignalSpec]) -> u16 {
    let mut acc = 0u16;
    let mut i = 0;
    while i < specs.len() {
        let mask = specs[i].mask();
        if acc & mask != 0 {
            return 0;
        }
        acc |= mask;
        i += 1;
    }
    acc
}

const_assert!(disjoint_mask(&INPUT_TABLE) == StatusWord::all().bits());
const_assert!(disjoint_mask(&OUTPUT_TABLE) == ControlWord::all().bits());

/// Control word outputs. Bits 4..=6 and 9..=15 are not wired.
pub static OUTPUT_SIGNALS: [SignalSpec; 6] = OUTPUT_TABLE;

/// Status word inputs. Bits 8..=15 are not wired.
///
/// `quick_stop_active` avoids clashing with the `quick_stop` output.
pub static INPUT_SIGNALS: [SignalSpec; 8] = INPUT_TABLE;

/// Pin name on the I/O boundary.
pub fn pin_name(drive_name: &str, signal: &str) -> String {
    format!("{drive_name}.{signal}")
}

/// Split a pin name into `(drive, signal)`.
pub fn split_pin_name(pin: &str) -> Option<(&str, &str)> {
    pin.rsplit_once('.')
        .filter(|(drive, signal)| !drive.is_empty() && !signal.is_empty())
}

/// Look up a signal by name in either table.
pub fn find_signal(name: &str) -> Option<&'static SignalSpec> {
    INPUT_SIGNALS
        .iter()
        .chain(OUTPUT_SIGNALS.iter())
        .find(|spec| spec.name == name)
}
