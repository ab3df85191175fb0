//! One DS-402 drive: its signals, words, states and active path.
//!
//! Per cycle the fleet calls, in order:
//! `step()` (writes the next control word) → driver cycle →
//! `read_status()` → `classify_state()` → publish.

use hal402_common::ds402::classifier::StateClassifier;
use hal402_common::ds402::path::TransitionPath;
use hal402_common::ds402::state::DriveState;
use hal402_common::ds402::word::{BitField, ControlWord, StatusWord};
use hal402_common::hal::driver::{HalError, IoDriver};
use hal402_common::hal::signal::{INPUT_SIGNALS, OUTPUT_SIGNALS, SignalSpec, pin_name};
use hal402_common::telemetry::{
    ERROR_CLASSIFICATION_MISS, ERROR_IO, ERROR_NO_ACTIVE_PATH, ERROR_NOT_SIMULATED,
    ERROR_UNROUTED_STATE, ErrorEvent, StatusEvent,
};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Per-drive error conditions. All are recoverable.
#[derive(Debug, Clone, Error)]
pub enum DriveError {
    /// `step()` without an installed path; the last control word is kept.
    #[error("no active transition path")]
    NoActivePath,

    /// Observed state not routed by the active path; entry point emitted.
    #[error("state {state} not routed by {path}, emitted entry point")]
    UnroutedState {
        /// Observed state.
        state: DriveState,
        /// Active path name.
        path: &'static str,
    },

    /// Status word matched no rule.
    #[error("status word {0:#010b} matches no DS-402 state")]
    ClassificationMiss(u16),

    /// Injection on a drive that is not simulated.
    #[error("drive is not simulated, status injection rejected")]
    NotSimulated,

    /// I/O boundary failure.
    #[error(transparent)]
    Io(#[from] HalError),
}

impl DriveError {
    /// Telemetry error code.
    pub const fn code(&self) -> u16 {
        match self {
            Self::NoActivePath => ERROR_NO_ACTIVE_PATH,
            Self::UnroutedState { .. } => ERROR_UNROUTED_STATE,
            Self::ClassificationMiss(_) => ERROR_CLASSIFICATION_MISS,
            Self::NotSimulated => ERROR_NOT_SIMULATED,
            Self::Io(_) => ERROR_IO,
        }
    }
}

/// Where an input signal takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Sampled from the I/O driver.
    Hardware,
    /// Pinned by simulation injection.
    Injected(bool),
}

/// One discrete signal owned by a drive.
#[derive(Debug, Clone)]
pub struct Signal {
    spec: &'static SignalSpec,
    pin: String,
    value: bool,
    source: SignalSource,
}

impl Signal {
    fn new(drive_name: &str, spec: &'static SignalSpec) -> Self {
        Self {
            spec,
            pin: pin_name(drive_name, spec.name),
            value: false,
            source: SignalSource::Hardware,
        }
    }

    /// Static layout entry.
    pub fn spec(&self) -> &'static SignalSpec {
        self.spec
    }

    /// Full pin name.
    pub fn pin(&self) -> &str {
        &self.pin
    }

    /// Last sampled (input) or written (output) value.
    pub fn value(&self) -> bool {
        self.value
    }

    /// Value source.
    pub fn source(&self) -> SignalSource {
        self.source
    }
}

/// A single drive and its read → classify → step pipeline.
#[derive(Debug)]
pub struct Drive {
    name: String,
    inputs: Vec<Signal>,
    outputs: Vec<Signal>,
    prev_status_word: StatusWord,
    curr_status_word: StatusWord,
    prev_state: DriveState,
    curr_state: DriveState,
    active_path: Option<&'static TransitionPath>,
    last_control_word: ControlWord,
    simulated: bool,
    classifier: StateClassifier,
    pending_error: Option<DriveError>,
}

impl Drive {
    /// Create a drive with its 8 input and 6 output signals.
    pub fn new(name: &str, simulated: bool) -> Self {
        Self {
            name: name.to_string(),
            inputs: INPUT_SIGNALS.iter().map(|spec| Signal::new(name, spec)).collect(),
            outputs: OUTPUT_SIGNALS.iter().map(|spec| Signal::new(name, spec)).collect(),
            prev_status_word: StatusWord::default(),
            curr_status_word: StatusWord::default(),
            prev_state: DriveState::Unknown,
            curr_state: DriveState::Unknown,
            active_path: None,
            last_control_word: ControlWord::default(),
            simulated,
            classifier: StateClassifier::ds402(),
            pending_error: None,
        }
    }

    /// Create every pin of this drive on the driver.
    pub fn register_pins<D: IoDriver + ?Sized>(&self, driver: &mut D) -> Result<(), HalError> {
        for signal in self.inputs.iter().chain(self.outputs.iter()) {
            driver.register_pin(&signal.pin, signal.spec.direction)?;
        }
        Ok(())
    }

    /// Sample the input signals and assemble the status word.
    ///
    /// Injected signals keep their pinned value and never touch the driver.
    pub fn read_status<D: IoDriver + ?Sized>(
        &mut self,
        driver: &mut D,
    ) -> Result<StatusWord, DriveError> {
        let mut raw = 0u16;
        for signal in &mut self.inputs {
            signal.value = match signal.source {
                SignalSource::Hardware => driver.read(&signal.pin)?,
                SignalSource::Injected(value) => value,
            };
            raw |= u16::from(signal.value) << signal.spec.bit;
        }
        self.prev_status_word = self.curr_status_word;
        self.curr_status_word = StatusWord::from_raw(raw);
        Ok(self.curr_status_word)
    }

    /// Classify the current status word.
    pub fn classify_state(&mut self) -> DriveState {
        self.prev_state = self.curr_state;
        self.curr_state = self.classifier.classify(self.curr_status_word);
        if self.curr_state == DriveState::Unknown {
            self.record(DriveError::ClassificationMiss(self.curr_status_word.bits()));
        }
        if self.curr_state != self.prev_state {
            debug!(
                "{}: {} -> {} (status_word: {:#010b})",
                self.name, self.prev_state, self.curr_state, self.curr_status_word.bits()
            );
        }
        self.curr_state
    }

    /// Write the next control word of the active path.
    ///
    /// Without an active path nothing is written and `NoActivePath` is
    /// recorded for the next error event.
    pub fn step<D: IoDriver + ?Sized>(&mut self, driver: &mut D) -> Result<ControlWord, DriveError> {
        let Some(path) = self.active_path else {
            warn!("{}: step() without an active transition path", self.name);
            self.record(DriveError::NoActivePath);
            return Err(DriveError::NoActivePath);
        };

        if !path.is_routed(self.curr_state) {
            self.record(DriveError::UnroutedState {
                state: self.curr_state,
                path: path.name(),
            });
        }

        let word = path.next_control_word(self.curr_state, self.last_control_word);
        trace!(
            "{}: {} via {} -> control_word {:#06x}",
            self.name,
            self.curr_state,
            path.name(),
            word.bits()
        );
        self.write_control(driver, word)?;
        Ok(word)
    }

    /// Write `word` to the output signals.
    pub fn write_control<D: IoDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        word: ControlWord,
    ) -> Result<(), DriveError> {
        for signal in &mut self.outputs {
            let value = word.bit(signal.spec.bit);
            driver.write(&signal.pin, value)?;
            signal.value = value;
        }
        self.last_control_word = word;
        Ok(())
    }

    /// Install a transition path, replacing any in-flight one.
    ///
    /// State history is kept.
    pub fn set_active_path(&mut self, path: &'static TransitionPath) {
        self.active_path = Some(path);
    }

    /// Pin the inputs to the canonical status word of `state`.
    pub fn inject_status(&mut self, state: DriveState) -> Result<(), DriveError> {
        let word = self.classifier.canonical_word(state);
        self.inject_status_word(word)
    }

    /// Pin the inputs to an arbitrary status word.
    pub fn inject_status_word(&mut self, word: StatusWord) -> Result<(), DriveError> {
        if !self.simulated {
            return Err(DriveError::NotSimulated);
        }
        for signal in &mut self.inputs {
            signal.source = SignalSource::Injected(word.bit(signal.spec.bit));
        }
        debug!("{}: inputs pinned to {:#010b}", self.name, word.bits());
        Ok(())
    }

    /// Return every input to the hardware source.
    pub fn release_injection(&mut self) {
        for signal in &mut self.inputs {
            signal.source = SignalSource::Hardware;
        }
    }

    /// Returns true if any input is pinned.
    pub fn is_injected(&self) -> bool {
        self.inputs
            .iter()
            .any(|s| matches!(s.source, SignalSource::Injected(_)))
    }

    fn record(&mut self, error: DriveError) {
        self.pending_error = Some(error);
    }

    /// Error recorded in the current cycle, if any.
    pub fn last_error(&self) -> Option<&DriveError> {
        self.pending_error.as_ref()
    }

    /// Take the error recorded since the last call.
    pub fn take_error(&mut self) -> Option<DriveError> {
        self.pending_error.take()
    }

    /// Status event for the current cycle.
    pub fn status_event(&self) -> StatusEvent {
        StatusEvent {
            drive_name: self.name.clone(),
            state: self.curr_state,
            status_word: self.curr_status_word.bits(),
            message: None,
        }
    }

    /// Error event for the current cycle; consumes the recorded error.
    pub fn error_event(&mut self) -> ErrorEvent {
        match self.take_error() {
            Some(error) => ErrorEvent {
                drive_name: self.name.clone(),
                message: error.to_string(),
                code: error.code(),
            },
            None => ErrorEvent::none(&self.name),
        }
    }

    /// Drive name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> DriveState {
        self.curr_state
    }

    /// Previous state.
    pub fn prev_state(&self) -> DriveState {
        self.prev_state
    }

    /// Current status word.
    pub fn status_word(&self) -> StatusWord {
        self.curr_status_word
    }

    /// Previous status word.
    pub fn prev_status_word(&self) -> StatusWord {
        self.prev_status_word
    }

    /// Last written control word.
    pub fn last_control_word(&self) -> ControlWord {
        self.last_control_word
    }

    /// Active path, if any.
    pub fn active_path(&self) -> Option<&'static TransitionPath> {
        self.active_path
    }

    /// Simulation flag.
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Input signals in bit order.
    pub fn inputs(&self) -> &[Signal] {
        &self.inputs
    }

    /// Output signals in table order.
    pub fn outputs(&self) -> &[Signal] {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulationDriver;
    use hal402_common::ds402::classifier::canonical_status_word;
    use hal402_common::ds402::path::{PATH_TO_OPERATION_ENABLED, PATH_TO_SWITCH_ON_DISABLED};
    use hal402_common::hal::config::ManagerConfig;
    use std::time::Duration;

    fn setup(initial: DriveState, simulated: bool) -> (Drive, SimulationDriver) {
        let mut config = ManagerConfig::default();
        config.simulation.initial_state = initial;
        let mut driver = SimulationDriver::new();
        driver.init(&config).unwrap();
        let drive = Drive::new("drive_1", simulated);
        drive.register_pins(&mut driver).unwrap();
        driver.ready().unwrap();
        (drive, driver)
    }

    #[test]
    fn test_new_drive_is_unknown() {
        let drive = Drive::new("drive_1", false);
        assert_eq!(drive.state(), DriveState::Unknown);
        assert_eq!(drive.inputs().len(), 8);
        assert_eq!(drive.outputs().len(), 6);
        assert_eq!(drive.outputs()[5].pin(), "drive_1.halt");
        assert!(drive.active_path().is_none());
    }

    #[test]
    fn test_read_status_assembles_word() {
        let (mut drive, mut driver) = setup(DriveState::OperationEnabled, false);
        let word = drive.read_status(&mut driver).unwrap();
        assert_eq!(word, canonical_status_word(DriveState::OperationEnabled));
        assert_eq!(drive.classify_state(), DriveState::OperationEnabled);
        assert_eq!(drive.prev_state(), DriveState::Unknown);
    }

    #[test]
    fn test_read_keeps_previous_word() {
        let (mut drive, mut driver) = setup(DriveState::SwitchOnDisabled, true);
        drive.read_status(&mut driver).unwrap();
        drive.inject_status(DriveState::Fault).unwrap();
        drive.read_status(&mut driver).unwrap();
        assert_eq!(drive.prev_status_word(), canonical_status_word(DriveState::SwitchOnDisabled));
        assert_eq!(drive.status_word(), canonical_status_word(DriveState::Fault));
    }

    #[test]
    fn test_step_without_path_records_error() {
        let (mut drive, mut driver) = setup(DriveState::SwitchOnDisabled, false);
        let before = drive.last_control_word();
        assert!(matches!(drive.step(&mut driver), Err(DriveError::NoActivePath)));
        assert_eq!(drive.last_control_word(), before);
        assert!(matches!(drive.last_error(), Some(DriveError::NoActivePath)));
        let event = drive.error_event();
        assert_eq!(event.code, ERROR_NO_ACTIVE_PATH);
        // Consumed.
        assert_eq!(drive.error_event().code, hal402_common::telemetry::ERROR_NONE);
    }

    #[test]
    fn test_step_writes_output_pins() {
        let (mut drive, mut driver) = setup(DriveState::SwitchOnDisabled, false);
        drive.read_status(&mut driver).unwrap();
        drive.classify_state();
        drive.set_active_path(&PATH_TO_OPERATION_ENABLED);

        let word = drive.step(&mut driver).unwrap();
        assert_eq!(word, ControlWord::CMD_SHUTDOWN);
        assert!(!driver.read("drive_1.switch_on").unwrap());
        assert!(driver.read("drive_1.enable_voltage").unwrap());
        assert!(driver.read("drive_1.quick_stop").unwrap());
        assert!(!driver.read("drive_1.enable_operation").unwrap());
        assert!(!driver.read("drive_1.fault_reset").unwrap());
        assert!(!driver.read("drive_1.halt").unwrap());
    }

    #[test]
    fn test_step_at_target_holds_last_word() {
        let (mut drive, mut driver) = setup(DriveState::SwitchOnDisabled, false);
        drive
            .write_control(&mut driver, ControlWord::CMD_FAULT_RESET)
            .unwrap();
        drive.read_status(&mut driver).unwrap();
        drive.classify_state();
        drive.set_active_path(&PATH_TO_SWITCH_ON_DISABLED);
        for _ in 0..3 {
            assert_eq!(drive.step(&mut driver).unwrap(), ControlWord::CMD_FAULT_RESET);
        }
        assert!(driver.read("drive_1.fault_reset").unwrap());
    }

    #[test]
    fn test_unknown_state_steps_to_entry_point() {
        let (mut drive, mut driver) = setup(DriveState::SwitchOnDisabled, true);
        drive.inject_status(DriveState::Unknown).unwrap();
        drive.read_status(&mut driver).unwrap();
        assert_eq!(drive.classify_state(), DriveState::Unknown);
        assert_eq!(drive.error_event().code, ERROR_CLASSIFICATION_MISS);

        drive.set_active_path(&PATH_TO_OPERATION_ENABLED);
        drive
            .write_control(&mut driver, ControlWord::CMD_ENABLE_OPERATION)
            .unwrap();
        let word = drive.step(&mut driver).unwrap();
        assert_eq!(word, PATH_TO_OPERATION_ENABLED.entry_point());
        assert_eq!(drive.error_event().code, ERROR_UNROUTED_STATE);
    }

    #[test]
    fn test_injection_requires_simulation() {
        let mut drive = Drive::new("drive_1", false);
        assert!(matches!(
            drive.inject_status(DriveState::Fault),
            Err(DriveError::NotSimulated)
        ));
        assert!(!drive.is_injected());
    }

    #[test]
    fn test_injection_bypasses_driver_until_released() {
        let (mut drive, mut driver) = setup(DriveState::SwitchOnDisabled, true);
        drive.inject_status(DriveState::QuickStopActive).unwrap();
        assert!(drive.is_injected());
        driver.cycle(Duration::from_millis(1)).unwrap();
        drive.read_status(&mut driver).unwrap();
        assert_eq!(drive.classify_state(), DriveState::QuickStopActive);

        drive.release_injection();
        drive.read_status(&mut driver).unwrap();
        assert_eq!(drive.classify_state(), DriveState::SwitchOnDisabled);
    }

    #[test]
    fn test_set_active_path_keeps_history() {
        let (mut drive, mut driver) = setup(DriveState::ReadyToSwitchOn, false);
        drive.read_status(&mut driver).unwrap();
        drive.classify_state();
        drive.set_active_path(&PATH_TO_OPERATION_ENABLED);
        drive.set_active_path(&PATH_TO_SWITCH_ON_DISABLED);
        assert_eq!(drive.state(), DriveState::ReadyToSwitchOn);
        assert_eq!(
            drive.active_path().map(|p| p.target()),
            Some(DriveState::SwitchOnDisabled)
        );
    }
}
