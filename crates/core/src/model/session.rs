use chrono::{DateTime, Utc};

use crate::mastery::{MasteryPercent, MasteryState};
use crate::model::config::StudyMode;
use crate::model::ids::{DeckId, SessionId, UserId};
use crate::model::tally::{AnsweredRecord, RoundSummary};

/// Everything needed to assemble a `SessionSnapshot`.
#[derive(Debug, Clone)]
pub struct SessionSnapshotParts {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub mode: StudyMode,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    pub answered: AnsweredRecord,
    pub rounds: Vec<RoundSummary>,
    pub prior_mastery: MasteryPercent,
    pub ended_early: bool,
}

/// Immutable record of a finished session, handed to persistence once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    session_id: SessionId,
    user_id: UserId,
    deck_id: DeckId,
    mode: StudyMode,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    elapsed_secs: u64,
    correct: u32,
    incorrect: u32,
    answered: AnsweredRecord,
    rounds: Vec<RoundSummary>,
    mastery: MasteryState,
    ended_early: bool,
}

impl SessionSnapshot {
    /// Builds the snapshot. Session totals and the mastery delta are derived
    /// from the round summaries; a completion time earlier than the start is
    /// pinned to the start.
    #[must_use]
    pub fn new(parts: SessionSnapshotParts) -> Self {
        let correct = parts.rounds.iter().map(|r| r.correct).sum();
        let incorrect = parts.rounds.iter().map(|r| r.incorrect).sum();
        let mastery = MasteryState::compute(parts.prior_mastery, correct, incorrect);

        Self {
            session_id: parts.session_id,
            user_id: parts.user_id,
            deck_id: parts.deck_id,
            mode: parts.mode,
            started_at: parts.started_at,
            completed_at: parts.completed_at.max(parts.started_at),
            elapsed_secs: parts.elapsed_secs,
            correct,
            incorrect,
            answered: parts.answered,
            rounds: parts.rounds,
            mastery,
            ended_early: parts.ended_early,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.correct + self.incorrect
    }

    #[must_use]
    pub fn answered(&self) -> &AnsweredRecord {
        &self.answered
    }

    #[must_use]
    pub fn rounds(&self) -> &[RoundSummary] {
        &self.rounds
    }

    #[must_use]
    pub fn mastery(&self) -> MasteryState {
        self.mastery
    }

    #[must_use]
    pub fn ended_early(&self) -> bool {
        self.ended_early
    }
}
