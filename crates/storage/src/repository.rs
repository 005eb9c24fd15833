use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use study_core::mastery::MasteryPercent;
use study_core::model::{Deck, DeckId, DeckProgress, FlashcardId, SessionId, StudyMode, UserId};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Session-level outcome applied to a learner's deck progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResultRecord {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub elapsed_secs: u64,
    pub mastery_delta: i64,
    pub new_mastery: MasteryPercent,
    pub completed_at: DateTime<Utc>,
}

/// Latest correctness of one flashcard in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardResultRecord {
    pub flashcard_id: FlashcardId,
    pub correct: bool,
}

/// Accumulated per-card performance for a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardPerformance {
    pub flashcard_id: FlashcardId,
    pub attempts: u32,
    pub correct_count: u32,
    pub last_correct: bool,
    pub last_seen: DateTime<Utc>,
}

impl CardPerformance {
    fn first(record: CardResultRecord, at: DateTime<Utc>) -> Self {
        Self {
            flashcard_id: record.flashcard_id,
            attempts: 1,
            correct_count: u32::from(record.correct),
            last_correct: record.correct,
            last_seen: at,
        }
    }

    fn apply(&mut self, record: CardResultRecord, at: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        self.correct_count = self.correct_count.saturating_add(u32::from(record.correct));
        self.last_correct = record.correct;
        self.last_seen = at;
    }
}

/// Completion flag for a user, deck and study mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRecord {
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub mode: StudyMode,
    pub completed_at: DateTime<Utc>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for decks and their flashcards.
#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Persist or replace a deck together with its flashcards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck by ID. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError>;
}

/// Per-user deck progress (mastery, last studied, counters).
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get_progress(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Option<DeckProgress>, StorageError>;

    /// Apply a session result to the learner's progress.
    ///
    /// Applying the same `session_id` twice leaves progress unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_session_result(
        &self,
        record: &SessionResultRecord,
    ) -> Result<DeckProgress, StorageError>;
}

#[async_trait]
pub trait CardPerformanceRepository: Send + Sync {
    /// Record the per-card outcome of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn record_card_results(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        results: &[CardResultRecord],
        recorded_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn card_performance(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<CardPerformance>, StorageError>;
}

#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn mark_completed(&self, record: &CompletionRecord) -> Result<(), StorageError>;

    /// Number of times the user completed the deck in the given mode.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn completion_count(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        mode: StudyMode,
    ) -> Result<u32, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    decks: HashMap<DeckId, Deck>,
    progress: HashMap<(UserId, DeckId), DeckProgress>,
    applied_sessions: HashSet<SessionId>,
    performance: HashMap<(UserId, DeckId, FlashcardId), CardPerformance>,
    completions: HashMap<(UserId, DeckId, StudyMode), u32>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Seed prior progress directly, bypassing session results.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_progress(&self, progress: DeckProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .progress
            .insert((progress.user_id, progress.deck_id), progress);
        Ok(())
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.decks.insert(deck.id(), deck.clone());
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.decks.get(&id).cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Option<DeckProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(user_id, deck_id)).cloned())
    }

    async fn upsert_session_result(
        &self,
        record: &SessionResultRecord,
    ) -> Result<DeckProgress, StorageError> {
        let mut guard = self.lock()?;
        let key = (record.user_id, record.deck_id);
        if !guard.applied_sessions.insert(record.session_id) {
            return guard.progress.get(&key).cloned().ok_or(StorageError::NotFound);
        }

        let progress = guard
            .progress
            .entry(key)
            .or_insert_with(|| DeckProgress::fresh(record.user_id, record.deck_id));
        progress.mastery = record.new_mastery;
        progress.last_studied = Some(record.completed_at);
        progress.completed_sessions = progress.completed_sessions.saturating_add(1);
        progress.total_study_secs = progress.total_study_secs.saturating_add(record.elapsed_secs);
        Ok(progress.clone())
    }
}

#[async_trait]
impl CardPerformanceRepository for InMemoryRepository {
    async fn record_card_results(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        results: &[CardResultRecord],
        recorded_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        for record in results {
            guard
                .performance
                .entry((user_id, deck_id, record.flashcard_id))
                .and_modify(|perf| perf.apply(*record, recorded_at))
                .or_insert_with(|| CardPerformance::first(*record, recorded_at));
        }
        Ok(())
    }

    async fn card_performance(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<CardPerformance>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<CardPerformance> = guard
            .performance
            .iter()
            .filter(|((user, deck, _), _)| *user == user_id && *deck == deck_id)
            .map(|(_, perf)| *perf)
            .collect();
        out.sort_by_key(|perf| perf.flashcard_id);
        Ok(out)
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn mark_completed(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        *guard
            .completions
            .entry((record.user_id, record.deck_id, record.mode))
            .or_insert(0) += 1;
        Ok(())
    }

    async fn completion_count(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        mode: StudyMode,
    ) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .completions
            .get(&(user_id, deck_id, mode))
            .copied()
            .unwrap_or(0))
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub decks: Arc<dyn DeckRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub performance: Arc<dyn CardPerformanceRepository>,
    pub completions: Arc<dyn CompletionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wire every contract to the same backend.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: DeckRepository
            + ProgressRepository
            + CardPerformanceRepository
            + CompletionRepository
            + Clone
            + 'static,
    {
        Self {
            decks: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            performance: Arc::new(repo.clone()),
            completions: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{Flashcard, Visibility};
    use study_core::time::fixed_now;

    fn build_deck(id: u64) -> Deck {
        let cards = (1..=4)
            .map(|i| Flashcard::new(FlashcardId::new(i), format!("Q{i}"), format!("A{i}")).unwrap())
            .collect();
        Deck::new(DeckId::new(id), UserId::new(1), format!("Deck {id}"), Visibility::Private, cards)
            .unwrap()
    }

    fn result(session_id: SessionId, delta: i64, mastery: i64) -> SessionResultRecord {
        SessionResultRecord {
            session_id,
            user_id: UserId::new(1),
            deck_id: DeckId::new(1),
            elapsed_secs: 60,
            mastery_delta: delta,
            new_mastery: MasteryPercent::clamped(mastery),
            completed_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn deck_round_trips() {
        let repo = InMemoryRepository::new();
        let deck = build_deck(1);
        repo.upsert_deck(&deck).await.unwrap();
        assert_eq!(repo.get_deck(deck.id()).await.unwrap(), Some(deck));
        assert_eq!(repo.get_deck(DeckId::new(9)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn session_result_is_applied_once() {
        let repo = InMemoryRepository::new();
        let session = SessionId::generate();

        let first = repo.upsert_session_result(&result(session, 4, 4)).await.unwrap();
        assert_eq!(first.completed_sessions, 1);
        assert_eq!(first.mastery.value(), 4);

        let again = repo.upsert_session_result(&result(session, 4, 4)).await.unwrap();
        assert_eq!(again.completed_sessions, 1);
        assert_eq!(again.total_study_secs, 60);

        let next = repo
            .upsert_session_result(&result(SessionId::generate(), 2, 6))
            .await
            .unwrap();
        assert_eq!(next.completed_sessions, 2);
        assert_eq!(next.total_study_secs, 120);
        assert_eq!(next.mastery.value(), 6);
    }

    #[tokio::test]
    async fn card_performance_accumulates() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let deck = DeckId::new(1);
        let card = FlashcardId::new(2);
        repo.record_card_results(
            user,
            deck,
            &[CardResultRecord { flashcard_id: card, correct: true }],
            fixed_now(),
        )
        .await
        .unwrap();
        repo.record_card_results(
            user,
            deck,
            &[CardResultRecord { flashcard_id: card, correct: false }],
            fixed_now(),
        )
        .await
        .unwrap();

        let perf = repo.card_performance(user, deck).await.unwrap();
        assert_eq!(perf.len(), 1);
        assert_eq!(perf[0].attempts, 2);
        assert_eq!(perf[0].correct_count, 1);
        assert!(!perf[0].last_correct);
    }

    #[tokio::test]
    async fn completions_count_per_mode() {
        let repo = InMemoryRepository::new();
        let record = CompletionRecord {
            user_id: UserId::new(1),
            deck_id: DeckId::new(1),
            mode: StudyMode::Challenge,
            completed_at: fixed_now(),
        };
        repo.mark_completed(&record).await.unwrap();
        repo.mark_completed(&record).await.unwrap();
        assert_eq!(
            repo.completion_count(UserId::new(1), DeckId::new(1), StudyMode::Challenge)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            repo.completion_count(UserId::new(1), DeckId::new(1), StudyMode::Quiz)
                .await
                .unwrap(),
            0
        );
    }
}
