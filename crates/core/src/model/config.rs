use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::DeckId;

/// Per-question countdown used when a session is timed.
pub const DEFAULT_QUESTION_SECONDS: u32 = 15;

/// Number of adaptive questions requested for a quiz pass.
pub const DEFAULT_QUIZ_QUESTIONS: u32 = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionConfigError {
    #[error("a deck id is required to start a session")]
    MissingDeckId,

    #[error("unsupported number of rounds: {0} (expected 1, 3 or 5)")]
    UnsupportedRoundCount(u32),

    #[error("per-question time limit must be > 0")]
    ZeroTimeLimit,

    #[error("quiz question count must be > 0")]
    ZeroQuizQuestions,

    #[error("unknown study mode: {0}")]
    UnknownMode(String),
}

//
// ─── MODE & ROUNDS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    /// Multi-round multiple choice drawn from the deck's own flashcards.
    Challenge,
    /// Single pass over an adaptive question list.
    Quiz,
}

impl StudyMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StudyMode::Challenge => "challenge",
            StudyMode::Quiz => "quiz",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = SessionConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "challenge" => Ok(StudyMode::Challenge),
            "quiz" => Ok(StudyMode::Quiz),
            other => Err(SessionConfigError::UnknownMode(other.to_owned())),
        }
    }
}

/// The enumerated round counts a challenge can be played with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundCount {
    One,
    Three,
    Five,
}

impl RoundCount {
    #[must_use]
    pub fn get(self) -> u32 {
        match self {
            RoundCount::One => 1,
            RoundCount::Three => 3,
            RoundCount::Five => 5,
        }
    }
}

impl TryFrom<u32> for RoundCount {
    type Error = SessionConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RoundCount::One),
            3 => Ok(RoundCount::Three),
            5 => Ok(RoundCount::Five),
            other => Err(SessionConfigError::UnsupportedRoundCount(other)),
        }
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Unvalidated session parameters as collected from a launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfigDraft {
    pub deck_id: Option<DeckId>,
    pub mode: StudyMode,
    pub rounds: u32,
    pub timed: bool,
    pub question_seconds: u32,
    pub quiz_questions: u32,
}

impl Default for SessionConfigDraft {
    fn default() -> Self {
        Self {
            deck_id: None,
            mode: StudyMode::Challenge,
            rounds: 1,
            timed: false,
            question_seconds: DEFAULT_QUESTION_SECONDS,
            quiz_questions: DEFAULT_QUIZ_QUESTIONS,
        }
    }
}

impl SessionConfigDraft {
    #[must_use]
    pub fn challenge(deck_id: DeckId, rounds: u32) -> Self {
        Self {
            deck_id: Some(deck_id),
            rounds,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn quiz(deck_id: DeckId) -> Self {
        Self {
            deck_id: Some(deck_id),
            mode: StudyMode::Quiz,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn timed(mut self, timed: bool) -> Self {
        self.timed = timed;
        self
    }

    /// Validate into a `SessionConfig`.
    ///
    /// Quiz mode is always a single pass, so its round count is not checked.
    ///
    /// # Errors
    ///
    /// Returns `SessionConfigError` for a missing deck id, a round count outside
    /// {1, 3, 5}, or zero limits.
    pub fn validate(self) -> Result<SessionConfig, SessionConfigError> {
        let deck_id = self.deck_id.ok_or(SessionConfigError::MissingDeckId)?;
        let rounds = match self.mode {
            StudyMode::Challenge => RoundCount::try_from(self.rounds)?,
            StudyMode::Quiz => RoundCount::One,
        };
        if self.question_seconds == 0 {
            return Err(SessionConfigError::ZeroTimeLimit);
        }
        if self.mode == StudyMode::Quiz && self.quiz_questions == 0 {
            return Err(SessionConfigError::ZeroQuizQuestions);
        }

        Ok(SessionConfig {
            deck_id,
            mode: self.mode,
            rounds,
            timed: self.timed,
            question_seconds: self.question_seconds,
            quiz_questions: self.quiz_questions,
        })
    }
}

/// Validated, immutable parameters of one study session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    deck_id: DeckId,
    mode: StudyMode,
    rounds: RoundCount,
    timed: bool,
    question_seconds: u32,
    quiz_questions: u32,
}

impl SessionConfig {
    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn rounds(&self) -> RoundCount {
        self.rounds
    }

    #[must_use]
    pub fn timed(&self) -> bool {
        self.timed
    }

    #[must_use]
    pub fn question_seconds(&self) -> u32 {
        self.question_seconds
    }

    #[must_use]
    pub fn quiz_questions(&self) -> u32 {
        self.quiz_questions
    }
}
