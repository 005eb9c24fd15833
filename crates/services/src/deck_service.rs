use std::sync::Arc;

use storage::repository::{DeckRepository, ProgressRepository, Storage};
use study_core::model::{Deck, DeckId, DeckProgress, UserId};

use crate::error::{AccessError, DeckServiceError, SessionError};

/// A deck cleared for study together with the learner's prior progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyDeck {
    pub deck: Deck,
    pub progress: DeckProgress,
}

/// Deck lookups and writes on behalf of a learner.
#[derive(Clone)]
pub struct StudyDeckService {
    decks: Arc<dyn DeckRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl StudyDeckService {
    #[must_use]
    pub fn new(decks: Arc<dyn DeckRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { decks, progress }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(Arc::clone(&storage.decks), Arc::clone(&storage.progress))
    }

    /// Fetch a deck the user may study, plus their progress on it.
    ///
    /// Public decks are open to everyone; private decks only to their owner.
    /// An empty deck is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Access` for a missing or forbidden deck and
    /// `SessionError::Storage` for backend failures.
    pub async fn fetch_for_study(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<StudyDeck, SessionError> {
        let deck = self
            .decks
            .get_deck(deck_id)
            .await?
            .ok_or(AccessError::DeckNotFound(deck_id))?;
        if !deck.is_accessible_by(user_id) {
            return Err(AccessError::Denied { user_id, deck_id }.into());
        }
        let progress = self
            .progress
            .get_progress(user_id, deck_id)
            .await?
            .unwrap_or_else(|| DeckProgress::fresh(user_id, deck_id));
        Ok(StudyDeck { deck, progress })
    }

    /// Create or replace a deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if the write fails.
    pub async fn save_deck(&self, deck: &Deck) -> Result<(), DeckServiceError> {
        self.decks.upsert_deck(deck).await?;
        Ok(())
    }
}
