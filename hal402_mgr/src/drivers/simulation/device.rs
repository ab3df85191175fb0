//! Simulated DS-402 device.
//!
//! The `SimulatedDevice` is the device side of the state machine: it decodes
//! the control word latched by the driver each cycle and reports the status
//! word of its current state. Fault reset acts on the rising edge of bit 7.

use hal402_common::ds402::classifier::canonical_status_word;
use hal402_common::ds402::state::DriveState;
use hal402_common::ds402::word::{ControlWord, StatusWord};
use tracing::{debug, trace};

/// Device command decoded from a control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Rising edge on `fault_reset`.
    FaultReset,
    /// `enable_voltage` low.
    DisableVoltage,
    /// `quick_stop` low (active-low).
    QuickStop,
    /// Voltage and quick-stop high, `switch_on` low.
    Shutdown,
    /// Switched on, operation not enabled.
    SwitchOn,
    /// All of `switch_on`, `enable_voltage`, `quick_stop`, `enable_operation`.
    EnableOperation,
    /// `fault_reset` held high after the edge.
    None,
}

impl DeviceCommand {
    /// Decode `word` given the previous `fault_reset` level.
    pub fn decode(word: ControlWord, prev_fault_reset: bool) -> Self {
        if word.contains(ControlWord::FAULT_RESET) {
            return if prev_fault_reset {
                Self::None
            } else {
                Self::FaultReset
            };
        }
        if !word.contains(ControlWord::ENABLE_VOLTAGE) {
            Self::DisableVoltage
        } else if !word.contains(ControlWord::QUICK_STOP) {
            Self::QuickStop
        } else if !word.contains(ControlWord::SWITCH_ON) {
            Self::Shutdown
        } else if !word.contains(ControlWord::ENABLE_OPERATION) {
            Self::SwitchOn
        } else {
            Self::EnableOperation
        }
    }
}

/// Device-side state machine of one drive.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    state: DriveState,
    control_word: ControlWord,
    prev_fault_reset: bool,
}

impl SimulatedDevice {
    /// Create a device in `initial` state.
    pub fn new(initial: DriveState) -> Self {
        Self {
            state: initial,
            control_word: ControlWord::default(),
            prev_fault_reset: false,
        }
    }

    /// Current device state.
    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Status word the device reports.
    pub fn status_word(&self) -> StatusWord {
        canonical_status_word(self.state)
    }

    /// Force the device into `state` (fault scenarios).
    pub fn force_state(&mut self, state: DriveState) {
        debug!("device forced {} -> {}", self.state, state);
        self.state = state;
    }

    /// Latch the control word written by the manager.
    pub fn latch(&mut self, word: ControlWord) {
        self.control_word = word;
    }

    /// Advance one cycle using the latched control word.
    pub fn cycle(&mut self) -> DriveState {
        let command = DeviceCommand::decode(self.control_word, self.prev_fault_reset);
        self.prev_fault_reset = self.control_word.contains(ControlWord::FAULT_RESET);

        let next = Self::transition(self.state, command);
        if next != self.state {
            trace!("device {:?}: {} -> {}", command, self.state, next);
            self.state = next;
        }
        self.state
    }

    fn transition(state: DriveState, command: DeviceCommand) -> DriveState {
        use DeviceCommand as C;
        use DriveState as S;

        match (state, command) {
            (S::NotReadyToSwitchOn, _) => S::SwitchOnDisabled,
            (S::FaultReactionActive, _) => S::Fault,
            (S::Fault, C::FaultReset) => S::SwitchOnDisabled,

            (S::SwitchOnDisabled, C::Shutdown) => S::ReadyToSwitchOn,

            (S::ReadyToSwitchOn, C::SwitchOn | C::EnableOperation) => S::SwitchedOn,
            (S::ReadyToSwitchOn, C::DisableVoltage | C::QuickStop) => S::SwitchOnDisabled,

            (S::SwitchedOn, C::EnableOperation) => S::OperationEnabled,
            (S::SwitchedOn, C::Shutdown) => S::ReadyToSwitchOn,
            (S::SwitchedOn, C::DisableVoltage | C::QuickStop) => S::SwitchOnDisabled,

            (S::OperationEnabled, C::SwitchOn) => S::SwitchedOn,
            (S::OperationEnabled, C::Shutdown) => S::ReadyToSwitchOn,
            (S::OperationEnabled, C::DisableVoltage) => S::SwitchOnDisabled,
            (S::OperationEnabled, C::QuickStop) => S::QuickStopActive,

            (S::QuickStopActive, C::DisableVoltage) => S::SwitchOnDisabled,
            (S::QuickStopActive, C::EnableOperation) => S::OperationEnabled,

            (current, _) => current,
        }
    }
}
