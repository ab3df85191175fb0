//! DS-402 status word and control word bit fields.
//!
//! Both words are 16 bits wide. Only the bits listed here are assigned;
//! every other bit is reserved and is always cleared on construction via
//! `from_bits_truncate`, so reserved bits read and compare as zero.

use bitflags::bitflags;
use static_assertions::const_assert_eq;

bitflags! {
    /// Status word reported by a drive (bits 0..=7 assigned).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusWord: u16 {
        /// Bit 0: ready to switch on.
        const READY_TO_SWITCH_ON = 1 << 0;
        /// Bit 1: switched on.
        const SWITCHED_ON        = 1 << 1;
        /// Bit 2: operation enabled.
        const OPERATION_ENABLED  = 1 << 2;
        /// Bit 3: fault.
        const FAULT              = 1 << 3;
        /// Bit 4: voltage enabled.
        const VOLTAGE_ENABLED    = 1 << 4;
        /// Bit 5: quick stop.
        const QUICK_STOP_ACTIVE  = 1 << 5;
        /// Bit 6: switch on disabled.
        const SWITCH_ON_DISABLED = 1 << 6;
        /// Bit 7: warning.
        const WARNING            = 1 << 7;
    }
}

impl Default for StatusWord {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Control word written to a drive.
    ///
    /// Bits 4..=6 (operation mode specific) and 9..=15 are not driven.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlWord: u16 {
        /// Bit 0: switch on.
        const SWITCH_ON        = 1 << 0;
        /// Bit 1: enable voltage.
        const ENABLE_VOLTAGE   = 1 << 1;
        /// Bit 2: quick stop (active low).
        const QUICK_STOP       = 1 << 2;
        /// Bit 3: enable operation.
        const ENABLE_OPERATION = 1 << 3;
        /// Bit 7: fault reset (rising edge).
        const FAULT_RESET      = 1 << 7;
        /// Bit 8: halt.
        const HALT             = 1 << 8;
    }
}

impl Default for ControlWord {
    fn default() -> Self {
        Self::empty()
    }
}

impl ControlWord {
    /// "Disable voltage" command (0x0000). Entry point of every path.
    pub const CMD_DISABLE_VOLTAGE: Self = Self::empty();

    /// "Shutdown" command (0x0006).
    pub const CMD_SHUTDOWN: Self =
        Self::from_bits_truncate(Self::ENABLE_VOLTAGE.bits() | Self::QUICK_STOP.bits());

    /// "Switch on" command (0x0007). Doubles as "disable operation".
    pub const CMD_SWITCH_ON: Self = Self::from_bits_truncate(
        Self::SWITCH_ON.bits() | Self::ENABLE_VOLTAGE.bits() | Self::QUICK_STOP.bits(),
    );

    /// "Enable operation" command (0x000F).
    pub const CMD_ENABLE_OPERATION: Self =
        Self::from_bits_truncate(Self::CMD_SWITCH_ON.bits() | Self::ENABLE_OPERATION.bits());

    /// "Quick stop" command (0x0002).
    pub const CMD_QUICK_STOP: Self = Self::ENABLE_VOLTAGE;

    /// "Fault reset" command (0x0080).
    pub const CMD_FAULT_RESET: Self = Self::FAULT_RESET;
}

/// Named single-bit access shared by both word kinds.
pub trait BitField: Copy {
    /// Raw 16-bit value (reserved bits cleared).
    fn raw(self) -> u16;

    /// Build from a raw value, dropping reserved bits.
    fn from_raw(raw: u16) -> Self;

    /// Read bit `pos` (0..=15). Reserved bits always read `false`.
    #[inline]
    fn bit(self, pos: u8) -> bool {
        pos < 16 && self.raw() & (1 << pos) != 0
    }

    /// Return a copy with bit `pos` set to `value`; every other bit is unchanged.
    #[inline]
    fn with_bit(self, pos: u8, value: bool) -> Self {
        if pos >= 16 {
            return self;
        }
        let mask = 1u16 << pos;
        let raw = if value {
            self.raw() | mask
        } else {
            self.raw() & !mask
        };
        Self::from_raw(raw)
    }
}

impl BitField for StatusWord {
    #[inline]
    fn raw(self) -> u16 {
        self.bits()
    }

    #[inline]
    fn from_raw(raw: u16) -> Self {
        Self::from_bits_truncate(raw)
    }
}

impl BitField for ControlWord {
    #[inline]
    fn raw(self) -> u16 {
        self.bits()
    }

    #[inline]
    fn from_raw(raw: u16) -> Self {
        Self::from_bits_truncate(raw)
    }
}

const_assert_eq!(StatusWord::all().bits(), 0x00FF);
const_assert_eq!(ControlWord::all().bits(), 0x018F);
const_assert_eq!(ControlWord::CMD_SHUTDOWN.bits(), 0x0006);
const_assert_eq!(ControlWord::CMD_SWITCH_ON.bits(), 0x0007);
const_assert_eq!(ControlWord::CMD_ENABLE_OPERATION.bits(), 0x000F);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_status_bits_are_dropped() {
        let word = StatusWord::from_raw(0xFF27);
        assert_eq!(word.raw(), 0x0027);
        for pos in 8..16 {
            assert!(!word.bit(pos));
        }
    }

    #[test]
    fn test_reserved_control_bits_are_dropped() {
        let word = ControlWord::from_raw(0xFFFF);
        assert_eq!(word.raw(), 0x018F);
        assert!(word.bit(8));
        assert!(!word.bit(4));
        assert!(!word.bit(9));
    }

    #[test]
    fn test_command_values() {
        assert_eq!(ControlWord::CMD_DISABLE_VOLTAGE.bits(), 0x0000);
        assert_eq!(ControlWord::CMD_QUICK_STOP.bits(), 0x0002);
        assert_eq!(ControlWord::CMD_FAULT_RESET.bits(), 0x0080);
    }

    #[test]
    fn test_single_bit_write_is_isolated() {
        let assigned: Vec<u8> = (0..16)
            .filter(|&pos| ControlWord::all().bits() & (1 << pos) != 0)
            .collect();
        assert_eq!(assigned, vec![0, 1, 2, 3, 7, 8]);

        for start in [0x0000u16, 0x0006, 0x000F, 0x0080, 0x018F] {
            let base = ControlWord::from_raw(start);
            for &pos in &assigned {
                for value in [true, false] {
                    let written = base.with_bit(pos, value);
                    assert_eq!(written.bit(pos), value);
                    for &other in assigned.iter().filter(|&&p| p != pos) {
                        assert_eq!(
                            written.bit(other),
                            base.bit(other),
                            "writing bit {pos} changed bit {other} of {start:#06x}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_with_bit_on_reserved_position_is_noop() {
        let word = ControlWord::CMD_SWITCH_ON;
        assert_eq!(word.with_bit(5, true), word);
        assert_eq!(word.with_bit(20, true), word);
    }
}
