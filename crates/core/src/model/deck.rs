use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::flashcard::Flashcard;
use crate::model::ids::{DeckId, FlashcardId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck name cannot be empty")]
    EmptyName,

    #[error("flashcard {0} appears more than once in the deck")]
    DuplicateFlashcard(FlashcardId),

    #[error("unknown deck visibility: {0}")]
    UnknownVisibility(String),
}

//
// ─── VISIBILITY ────────────────────────────────────────────────────────────────
//

/// Who may study a deck besides its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(DeckError::UnknownVisibility(other.to_owned())),
        }
    }
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// An ordered collection of flashcards owned by one user.
///
/// Read-only input for study sessions; the session takes its own snapshot of
/// the flashcards when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    owner_id: UserId,
    name: String,
    visibility: Visibility,
    flashcards: Vec<Flashcard>,
}

impl Deck {
    /// Creates a deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` for a blank name and
    /// `DeckError::DuplicateFlashcard` if two flashcards share an id.
    pub fn new(
        id: DeckId,
        owner_id: UserId,
        name: impl Into<String>,
        visibility: Visibility,
        flashcards: Vec<Flashcard>,
    ) -> Result<Self, DeckError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DeckError::EmptyName);
        }

        let mut seen = HashSet::with_capacity(flashcards.len());
        for card in &flashcards {
            if !seen.insert(card.id()) {
                return Err(DeckError::DuplicateFlashcard(card.id()));
            }
        }

        Ok(Self {
            id,
            owner_id,
            name: name.trim().to_owned(),
            visibility,
            flashcards,
        })
    }

    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[must_use]
    pub fn flashcards(&self) -> &[Flashcard] {
        &self.flashcards
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.flashcards.len()
    }

    /// Owners can always study their decks; others only public ones.
    #[must_use]
    pub fn is_accessible_by(&self, user: UserId) -> bool {
        self.owner_id == user || self.visibility == Visibility::Public
    }

    #[must_use]
    pub fn into_flashcards(self) -> Vec<Flashcard> {
        self.flashcards
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
