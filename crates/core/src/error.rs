use thiserror::Error;

use crate::model::{
    AdaptiveQuestionError, ContentSourceSettingsError, DeckError, FlashcardError,
    SessionConfigError,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
    #[error(transparent)]
    SessionConfig(#[from] SessionConfigError),
    #[error(transparent)]
    AdaptiveQuestion(#[from] AdaptiveQuestionError),
    #[error(transparent)]
    ContentSource(#[from] ContentSourceSettingsError),
}
