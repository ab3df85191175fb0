//! Transition paths: observed state → next control word.
//!
//! A path steers a drive one legal DS-402 edge at a time toward its target
//! state. The entry for the target itself is a hold, which re-emits the last
//! control word unchanged so edge-sensitive bits are never re-triggered.
//! States without an entry fall back to the path's entry point.
//!
//! Fault reset is an edge entry: the device only acts on a rising edge of
//! bit 7, so a reset word still latched from an earlier recovery is dropped
//! for one step before it is written again.

use super::state::DriveState;
use super::word::ControlWord;

/// What a path emits for one observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    /// Write this control word.
    Emit(ControlWord),
    /// Keep the last written control word.
    Hold,
    /// Write this control word as a rising edge of its bits. If the last
    /// word already carries them, they are cleared for one step first.
    Edge(ControlWord),
}

/// State → control word table steering drives toward `target`.
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionPath {
    name: &'static str,
    target: DriveState,
    entry_point: ControlWord,
    steps: &'static [(DriveState, PathStep)],
}

impl TransitionPath {
    /// Build a path. `steps` should contain a `Hold` entry for `target`.
    pub const fn new(
        name: &'static str,
        target: DriveState,
        entry_point: ControlWord,
        steps: &'static [(DriveState, PathStep)],
    ) -> Self {
        Self {
            name,
            target,
            entry_point,
            steps,
        }
    }

    /// Path name (for logs).
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// State this path converges to.
    pub const fn target(&self) -> DriveState {
        self.target
    }

    /// Control word used for states the path does not route.
    pub const fn entry_point(&self) -> ControlWord {
        self.entry_point
    }

    /// Table entry for `state`, if routed.
    pub fn step_for(&self, state: DriveState) -> Option<PathStep> {
        self.steps
            .iter()
            .find(|(from, _)| *from == state)
            .map(|&(_, step)| step)
    }

    /// Returns true if `state` has an entry in this path.
    pub fn is_routed(&self, state: DriveState) -> bool {
        self.step_for(state).is_some()
    }

    /// Next control word for a drive observed in `current` whose last
    /// written word was `last`.
    pub fn next_control_word(&self, current: DriveState, last: ControlWord) -> ControlWord {
        match self.step_for(current) {
            Some(PathStep::Emit(word)) => word,
            Some(PathStep::Hold) => last,
            Some(PathStep::Edge(word)) if last.contains(word) => last.difference(word),
            Some(PathStep::Edge(word)) => word,
            None => self.entry_point,
        }
    }
}

const DISABLE: PathStep = PathStep::Emit(ControlWord::CMD_DISABLE_VOLTAGE);
const FAULT_RESET: PathStep = PathStep::Edge(ControlWord::CMD_FAULT_RESET);

/// Disable/shutdown sequence, target `SWITCH_ON_DISABLED`.
pub static PATH_TO_SWITCH_ON_DISABLED: TransitionPath = TransitionPath::new(
    "path_to_switch_on_disabled",
    DriveState::SwitchOnDisabled,
    ControlWord::CMD_DISABLE_VOLTAGE,
    &[
        (DriveState::NotReadyToSwitchOn, DISABLE),
        (DriveState::SwitchOnDisabled, PathStep::Hold),
        (DriveState::ReadyToSwitchOn, DISABLE),
        (DriveState::SwitchedOn, DISABLE),
        (DriveState::OperationEnabled, DISABLE),
        (DriveState::QuickStopActive, DISABLE),
        (DriveState::Fault, FAULT_RESET),
        (DriveState::FaultReactionActive, DISABLE),
    ],
);

/// Full enable sequence, target `OPERATION_ENABLED`.
pub static PATH_TO_OPERATION_ENABLED: TransitionPath = TransitionPath::new(
    "path_to_operation_enabled",
    DriveState::OperationEnabled,
    ControlWord::CMD_DISABLE_VOLTAGE,
    &[
        (DriveState::NotReadyToSwitchOn, DISABLE),
        (DriveState::SwitchOnDisabled, PathStep::Emit(ControlWord::CMD_SHUTDOWN)),
        (DriveState::ReadyToSwitchOn, PathStep::Emit(ControlWord::CMD_SWITCH_ON)),
        (DriveState::SwitchedOn, PathStep::Emit(ControlWord::CMD_ENABLE_OPERATION)),
        (DriveState::OperationEnabled, PathStep::Hold),
        (DriveState::QuickStopActive, DISABLE),
        (DriveState::Fault, FAULT_RESET),
        (DriveState::FaultReactionActive, DISABLE),
    ],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_entry_is_hold() {
        for path in [&PATH_TO_SWITCH_ON_DISABLED, &PATH_TO_OPERATION_ENABLED] {
            assert_eq!(path.step_for(path.target()), Some(PathStep::Hold), "{}", path.name());
        }
    }

    #[test]
    fn test_hold_reproduces_last_word() {
        let path = &PATH_TO_OPERATION_ENABLED;
        for raw in [0x0000u16, 0x000F, 0x0080, 0x018F] {
            let last = ControlWord::from_bits_truncate(raw);
            let mut word = last;
            for _ in 0..5 {
                word = path.next_control_word(DriveState::OperationEnabled, word);
                assert_eq!(word, last);
            }
        }
    }

    #[test]
    fn test_enable_sequence_edges() {
        let path = &PATH_TO_OPERATION_ENABLED;
        let last = ControlWord::default();
        assert_eq!(
            path.next_control_word(DriveState::SwitchOnDisabled, last),
            ControlWord::CMD_SHUTDOWN
        );
        assert_eq!(
            path.next_control_word(DriveState::ReadyToSwitchOn, last),
            ControlWord::CMD_SWITCH_ON
        );
        assert_eq!(
            path.next_control_word(DriveState::SwitchedOn, last),
            ControlWord::CMD_ENABLE_OPERATION
        );
        assert_eq!(
            path.next_control_word(DriveState::Fault, last),
            ControlWord::CMD_FAULT_RESET
        );
    }

    #[test]
    fn test_disable_sequence_edges() {
        let path = &PATH_TO_SWITCH_ON_DISABLED;
        let last = ControlWord::CMD_ENABLE_OPERATION;
        for state in [
            DriveState::ReadyToSwitchOn,
            DriveState::SwitchedOn,
            DriveState::OperationEnabled,
            DriveState::QuickStopActive,
        ] {
            assert_eq!(path.next_control_word(state, last), ControlWord::CMD_DISABLE_VOLTAGE);
        }
        assert_eq!(
            path.next_control_word(DriveState::Fault, last),
            ControlWord::CMD_FAULT_RESET
        );
    }

    #[test]
    fn test_fault_reset_rearms_latched_edge() {
        for path in [&PATH_TO_SWITCH_ON_DISABLED, &PATH_TO_OPERATION_ENABLED] {
            let latched = path.next_control_word(DriveState::Fault, ControlWord::CMD_FAULT_RESET);
            assert_eq!(latched, ControlWord::CMD_DISABLE_VOLTAGE, "{}", path.name());
            assert_eq!(
                path.next_control_word(DriveState::Fault, latched),
                ControlWord::CMD_FAULT_RESET
            );
        }
    }

    #[test]
    fn test_unrouted_state_falls_back_to_entry_point() {
        for path in [&PATH_TO_SWITCH_ON_DISABLED, &PATH_TO_OPERATION_ENABLED] {
            assert!(!path.is_routed(DriveState::Unknown));
            let last = ControlWord::CMD_ENABLE_OPERATION;
            let word = path.next_control_word(DriveState::Unknown, last);
            assert_eq!(word, path.entry_point());
            assert_ne!(word, last);
        }
    }

    #[test]
    fn test_every_classified_state_is_routed() {
        for path in [&PATH_TO_SWITCH_ON_DISABLED, &PATH_TO_OPERATION_ENABLED] {
            for state in DriveState::ALL.into_iter().filter(|s| *s != DriveState::Unknown) {
                assert!(path.is_routed(state), "{} misses {state}", path.name());
            }
        }
    }
}
