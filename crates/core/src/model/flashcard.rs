use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::FlashcardId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlashcardError {
    #[error("flashcard prompt cannot be empty")]
    EmptyPrompt,

    #[error("flashcard answer cannot be empty")]
    EmptyAnswer,
}

/// A prompt/answer pair inside a deck. Immutable for the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    id: FlashcardId,
    prompt: String,
    answer: String,
}

impl Flashcard {
    /// Creates a flashcard with trimmed prompt and answer text.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError::EmptyPrompt` or `FlashcardError::EmptyAnswer`
    /// when either side is blank.
    pub fn new(
        id: FlashcardId,
        prompt: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<Self, FlashcardError> {
        let prompt = prompt.into().trim().to_owned();
        if prompt.is_empty() {
            return Err(FlashcardError::EmptyPrompt);
        }
        let answer = answer.into().trim().to_owned();
        if answer.is_empty() {
            return Err(FlashcardError::EmptyAnswer);
        }
        Ok(Self { id, prompt, answer })
    }

    #[must_use]
    pub fn id(&self) -> FlashcardId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }
}
