mod adaptive;
mod config;
mod content_source;
mod deck;
mod flashcard;
mod ids;
mod progress;
mod session;
mod tally;

pub use adaptive::{AdaptiveQuestion, AdaptiveQuestionError, validate_questions};
pub use config::{
    DEFAULT_QUESTION_SECONDS, DEFAULT_QUIZ_QUESTIONS, RoundCount, SessionConfig,
    SessionConfigDraft, SessionConfigError, StudyMode,
};
pub use content_source::{
    ContentSourceSettings, ContentSourceSettingsDraft, ContentSourceSettingsError,
};
pub use deck::{Deck, DeckError, Visibility};
pub use flashcard::{Flashcard, FlashcardError};
pub use ids::{DeckId, FlashcardId, ParseIdError, SessionId, UserId};
pub use progress::DeckProgress;
pub use session::{SessionSnapshot, SessionSnapshotParts};
pub use tally::{AnsweredRecord, RoundSummary, SessionTally};
