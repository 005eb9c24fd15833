use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::FlashcardId;

/// Correct/incorrect counts of one finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// 1-based round index.
    pub round_index: u32,
    pub correct: u32,
    pub incorrect: u32,
}

impl RoundSummary {
    #[must_use]
    pub fn answered(&self) -> u32 {
        self.correct + self.incorrect
    }
}

/// Session-wide and per-round answer counters.
///
/// Answers land in the round counters; `fold_round` moves them into the
/// running totals, which only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTally {
    running_correct: u32,
    running_incorrect: u32,
    round_correct: u32,
    round_incorrect: u32,
}

impl SessionTally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, correct: bool) {
        if correct {
            self.round_correct = self.round_correct.saturating_add(1);
        } else {
            self.round_incorrect = self.round_incorrect.saturating_add(1);
        }
    }

    /// Folds the current round into the running totals and resets it.
    pub fn fold_round(&mut self, round_index: u32) -> RoundSummary {
        let summary = RoundSummary {
            round_index,
            correct: self.round_correct,
            incorrect: self.round_incorrect,
        };
        self.running_correct = self.running_correct.saturating_add(self.round_correct);
        self.running_incorrect = self.running_incorrect.saturating_add(self.round_incorrect);
        self.round_correct = 0;
        self.round_incorrect = 0;
        summary
    }

    #[must_use]
    pub fn running_correct(&self) -> u32 {
        self.running_correct
    }

    #[must_use]
    pub fn running_incorrect(&self) -> u32 {
        self.running_incorrect
    }

    #[must_use]
    pub fn round_correct(&self) -> u32 {
        self.round_correct
    }

    #[must_use]
    pub fn round_incorrect(&self) -> u32 {
        self.round_incorrect
    }

    /// Correct answers so far, including the unfolded current round.
    #[must_use]
    pub fn session_correct(&self) -> u32 {
        self.running_correct + self.round_correct
    }

    #[must_use]
    pub fn session_incorrect(&self) -> u32 {
        self.running_incorrect + self.round_incorrect
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.session_correct() + self.session_incorrect()
    }
}

/// Latest correctness per flashcard. A card drawn again in a later round
/// overwrites its earlier result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredRecord(BTreeMap<FlashcardId, bool>);

impl AnsweredRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, card: FlashcardId, correct: bool) {
        self.0.insert(card, correct);
    }

    #[must_use]
    pub fn get(&self, card: FlashcardId) -> Option<bool> {
        self.0.get(&card).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlashcardId, bool)> + '_ {
        self.0.iter().map(|(id, correct)| (*id, *correct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_moves_round_into_running() {
        let mut tally = SessionTally::new();
        tally.record(true);
        tally.record(true);
        tally.record(false);
        assert_eq!(tally.session_correct(), 2);
        assert_eq!(tally.running_correct(), 0);

        let summary = tally.fold_round(1);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.incorrect, 1);
        assert_eq!(summary.answered(), 3);
        assert_eq!(tally.running_correct(), 2);
        assert_eq!(tally.running_incorrect(), 1);
        assert_eq!(tally.round_correct(), 0);
        assert_eq!(tally.round_incorrect(), 0);

        tally.record(false);
        let summary = tally.fold_round(2);
        assert_eq!(summary.round_index, 2);
        assert_eq!(tally.running_incorrect(), 2);
        assert_eq!(tally.answered(), 4);
    }

    #[test]
    fn answered_record_keeps_latest_attempt() {
        let mut record = AnsweredRecord::new();
        record.record(FlashcardId::new(3), false);
        record.record(FlashcardId::new(3), true);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get(FlashcardId::new(3)), Some(true));
        assert_eq!(record.get(FlashcardId::new(4)), None);
    }
}
