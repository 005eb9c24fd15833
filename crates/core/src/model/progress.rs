use chrono::{DateTime, Utc};

use crate::mastery::MasteryPercent;
use crate::model::ids::{DeckId, UserId};

/// A learner's accumulated progress on one deck, read at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckProgress {
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub mastery: MasteryPercent,
    pub last_studied: Option<DateTime<Utc>>,
    pub completed_sessions: u32,
    pub total_study_secs: u64,
}

impl DeckProgress {
    /// Progress for a deck the learner has never studied.
    #[must_use]
    pub fn fresh(user_id: UserId, deck_id: DeckId) -> Self {
        Self {
            user_id,
            deck_id,
            mastery: MasteryPercent::default(),
            last_studied: None,
            completed_sessions: 0,
            total_study_secs: 0,
        }
    }
}
