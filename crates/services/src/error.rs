//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteOpenError;
use study_core::model::{AdaptiveQuestionError, DeckError, DeckId, SessionConfigError, UserId};

/// The caller may not study the requested content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessError {
    #[error("deck {0} not found")]
    DeckNotFound(DeckId),
    #[error("user {user_id} may not study deck {deck_id}")]
    Denied { user_id: UserId, deck_id: DeckId },
    #[error("quiz mode requires an access token")]
    MissingAccessToken,
    #[error("adaptive content source rejected the access token")]
    TokenRejected,
}

/// The deck or the adaptive content cannot support a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("deck has {found} flashcards, at least {required} are needed")]
    TooFewFlashcards { found: usize, required: usize },
    #[error("deck has {found} distinct answers, at least {required} are needed")]
    TooFewDistinctAnswers { found: usize, required: usize },
    #[error(transparent)]
    InvalidAdaptiveContent(#[from] AdaptiveQuestionError),
    #[error("adaptive content unavailable: {0}")]
    SourceUnavailable(String),
}

/// Fatal failures that move a session from loading to its error state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] SessionConfigError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<AdaptiveContentError> for SessionError {
    fn from(err: AdaptiveContentError) -> Self {
        match err {
            AdaptiveContentError::Unauthorized => Self::Access(AccessError::TokenRejected),
            other => Self::Content(ContentError::SourceUnavailable(other.to_string())),
        }
    }
}

/// One persistence operation that failed after a session finished.
///
/// Never fatal; collected into `PersistenceStatus::Failed`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct PersistenceFailure {
    pub operation: &'static str,
    pub message: String,
}

/// Errors emitted by `HttpAdaptiveContentSource`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdaptiveContentError {
    #[error("adaptive content source rejected the access token")]
    Unauthorized,
    #[error("adaptive content request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `StudyDeckService` writes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeckServiceError {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteOpenError),
}
