use rand::Rng;
use rand::seq::SliceRandom;

use study_core::model::RoundCount;

use crate::error::ContentError;

/// Smallest deck that can fill an option set of one answer and three distractors.
pub const MIN_DECK_SIZE: usize = 4;

/// Questions asked per round for a configured round count.
#[must_use]
pub fn questions_per_round(rounds: u32) -> usize {
    match rounds {
        1 => 10,
        3 => 8,
        5 => 5,
        _ => 8,
    }
}

/// The flashcards drawn for one round, as indices into the session's deck snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPlan {
    round_index: u32,
    indices: Vec<usize>,
}

impl RoundPlan {
    /// A plan walking `len` questions in their given order.
    #[must_use]
    pub fn sequential(round_index: u32, len: usize) -> Self {
        Self {
            round_index,
            indices: (0..len).collect(),
        }
    }

    /// 1-based round index.
    #[must_use]
    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Draws a fresh without-replacement subset of the deck for every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSampler {
    deck_size: usize,
    per_round: usize,
}

impl RoundSampler {
    /// # Errors
    ///
    /// Returns `ContentError::TooFewFlashcards` when the deck has fewer than
    /// `MIN_DECK_SIZE` cards.
    pub fn new(deck_size: usize, rounds: RoundCount) -> Result<Self, ContentError> {
        if deck_size < MIN_DECK_SIZE {
            return Err(ContentError::TooFewFlashcards {
                found: deck_size,
                required: MIN_DECK_SIZE,
            });
        }
        Ok(Self {
            deck_size,
            per_round: questions_per_round(rounds.get()),
        })
    }

    /// Questions per round after capping at the deck size.
    #[must_use]
    pub fn questions_per_round(&self) -> usize {
        self.per_round.min(self.deck_size)
    }

    pub fn draw<R: Rng + ?Sized>(&self, round_index: u32, rng: &mut R) -> RoundPlan {
        let mut indices: Vec<usize> = (0..self.deck_size).collect();
        indices.as_mut_slice().shuffle(rng);
        indices.truncate(self.questions_per_round());
        RoundPlan {
            round_index,
            indices,
        }
    }
}
