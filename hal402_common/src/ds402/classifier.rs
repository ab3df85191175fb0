//! Status word → `DriveState` classification.
//!
//! Rules are a priority-ordered sequence of (mask, expected) pairs. A status
//! word matches a rule iff `word & mask == expected`, and the FIRST matching
//! rule wins. Order matters: masks of different rules may overlap.

use super::state::DriveState;
use super::word::StatusWord;

/// One (mask, expected) classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRule {
    /// State selected when this rule matches.
    pub state: DriveState,
    /// Bits taken into account.
    pub mask: StatusWord,
    /// Required value of the masked bits.
    pub expected: StatusWord,
}

impl ClassificationRule {
    /// Build a rule from raw mask/expected values.
    pub const fn new(state: DriveState, mask: u16, expected: u16) -> Self {
        Self {
            state,
            mask: StatusWord::from_bits_truncate(mask),
            expected: StatusWord::from_bits_truncate(expected),
        }
    }

    /// Returns true if `word` satisfies this rule.
    #[inline]
    pub const fn matches(&self, word: StatusWord) -> bool {
        word.bits() & self.mask.bits() == self.expected.bits()
    }
}

/// DS-402 classification table, highest priority first.
pub const DS402_RULES: [ClassificationRule; 8] = [
    ClassificationRule::new(DriveState::FaultReactionActive, 0x4F, 0x0F),
    ClassificationRule::new(DriveState::Fault, 0x4F, 0x08),
    ClassificationRule::new(DriveState::QuickStopActive, 0x6F, 0x07),
    ClassificationRule::new(DriveState::OperationEnabled, 0x6F, 0x27),
    ClassificationRule::new(DriveState::SwitchedOn, 0x6F, 0x23),
    ClassificationRule::new(DriveState::ReadyToSwitchOn, 0x6F, 0x21),
    ClassificationRule::new(DriveState::SwitchOnDisabled, 0x4F, 0x40),
    ClassificationRule::new(DriveState::NotReadyToSwitchOn, 0x4F, 0x00),
];

/// Status word matching no DS-402 rule (only `READY_TO_SWITCH_ON` set).
///
/// Used as the synthetic pattern for `DriveState::Unknown`.
pub const UNKNOWN_STATUS_PATTERN: StatusWord = StatusWord::READY_TO_SWITCH_ON;

/// Ordered rule evaluator.
#[derive(Debug, Clone, Copy)]
pub struct StateClassifier {
    rules: &'static [ClassificationRule],
}

impl StateClassifier {
    /// Classifier over a custom priority-ordered rule set.
    pub const fn new(rules: &'static [ClassificationRule]) -> Self {
        Self { rules }
    }

    /// Classifier over the standard DS-402 table.
    pub const fn ds402() -> Self {
        Self::new(&DS402_RULES)
    }

    /// Rules in evaluation order.
    pub const fn rules(&self) -> &'static [ClassificationRule] {
        self.rules
    }

    /// Classify a status word. Total and pure: `Unknown` when nothing matches.
    pub fn classify(&self, word: StatusWord) -> DriveState {
        self.rules
            .iter()
            .find(|rule| rule.matches(word))
            .map_or(DriveState::Unknown, |rule| rule.state)
    }

    /// Canonical status word for `state`: the `expected` value of its rule.
    ///
    /// `Unknown` (or a state without a rule) maps to [`UNKNOWN_STATUS_PATTERN`].
    pub fn canonical_word(&self, state: DriveState) -> StatusWord {
        self.rules
            .iter()
            .find(|rule| rule.state == state)
            .map_or(UNKNOWN_STATUS_PATTERN, |rule| rule.expected)
    }
}

impl Default for StateClassifier {
    fn default() -> Self {
        Self::ds402()
    }
}

/// Classify with the standard DS-402 table.
#[inline]
pub fn classify(word: StatusWord) -> DriveState {
    StateClassifier::ds402().classify(word)
}

/// Canonical DS-402 status word for `state`.
#[inline]
pub fn canonical_status_word(state: DriveState) -> StatusWord {
    StateClassifier::ds402().canonical_word(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_patterns_classify_to_their_state() {
        for state in DriveState::ALL {
            assert_eq!(classify(canonical_status_word(state)), state);
        }
    }

    #[test]
    fn test_every_8bit_word_resolves_to_first_matching_rule() {
        for raw in 0u16..=0xFF {
            let word = StatusWord::from_bits_truncate(raw);
            let expected = DS402_RULES
                .iter()
                .find(|rule| word.bits() & rule.mask.bits() == rule.expected.bits())
                .map_or(DriveState::Unknown, |rule| rule.state);
            assert_eq!(classify(word), expected, "word {raw:#04x}");
        }
    }

    #[test]
    fn test_fault_bit_never_classifies_as_operational() {
        for raw in 0u16..=0xFF {
            let word = StatusWord::from_bits_truncate(raw);
            if word.contains(StatusWord::FAULT) {
                let state = classify(word);
                assert!(
                    matches!(state, DriveState::Fault | DriveState::FaultReactionActive | DriveState::Unknown),
                    "word {raw:#04x} with fault bit classified as {state}"
                );
            }
        }
    }

    #[test]
    fn test_classify_is_pure() {
        let words: Vec<StatusWord> = (0u16..=0xFF).map(StatusWord::from_bits_truncate).collect();
        let first: Vec<DriveState> = words.iter().map(|&w| classify(w)).collect();
        let second: Vec<DriveState> = words.iter().rev().map(|&w| classify(w)).collect();
        assert!(first.iter().eq(second.iter().rev()));
    }

    #[test]
    fn test_unknown_pattern_matches_no_rule() {
        assert!(DS402_RULES.iter().all(|rule| !rule.matches(UNKNOWN_STATUS_PATTERN)));
        assert_eq!(classify(UNKNOWN_STATUS_PATTERN), DriveState::Unknown);
    }

    #[test]
    fn test_warning_and_voltage_bits_are_ignored() {
        // 0x27 | voltage_enabled | warning
        let word = StatusWord::from_bits_truncate(0x27 | 0x10 | 0x80);
        assert_eq!(classify(word), DriveState::OperationEnabled);
    }

    #[test]
    fn test_overlapping_rules_resolve_by_priority() {
        // Deliberately overlapping: a fault bit alone is enough for FAULT,
        // operation_enabled alone is enough for OPERATION_ENABLED.
        static OVERLAPPING: [ClassificationRule; 2] = [
            ClassificationRule::new(DriveState::Fault, 0x08, 0x08),
            ClassificationRule::new(DriveState::OperationEnabled, 0x04, 0x04),
        ];
        static REVERSED: [ClassificationRule; 2] = [
            ClassificationRule::new(DriveState::OperationEnabled, 0x04, 0x04),
            ClassificationRule::new(DriveState::Fault, 0x08, 0x08),
        ];

        let both = StatusWord::FAULT | StatusWord::OPERATION_ENABLED;
        assert_eq!(StateClassifier::new(&OVERLAPPING).classify(both), DriveState::Fault);
        assert_eq!(
            StateClassifier::new(&REVERSED).classify(both),
            DriveState::OperationEnabled
        );
    }

    #[test]
    fn test_rule_priority_order() {
        let order: Vec<DriveState> = StateClassifier::ds402().rules().iter().map(|r| r.state).collect();
        assert_eq!(
            order,
            vec![
                DriveState::FaultReactionActive,
                DriveState::Fault,
                DriveState::QuickStopActive,
                DriveState::OperationEnabled,
                DriveState::SwitchedOn,
                DriveState::ReadyToSwitchOn,
                DriveState::SwitchOnDisabled,
                DriveState::NotReadyToSwitchOn,
            ]
        );
    }
}
