use std::sync::Arc;

use storage::repository::{
    CardPerformanceRepository, CardResultRecord, CompletionRecord, CompletionRepository,
    ProgressRepository, SessionResultRecord, Storage, StorageError,
};
use study_core::model::SessionSnapshot;

use crate::error::PersistenceFailure;

/// Outcome of saving a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Saved,
    Failed(Vec<PersistenceFailure>),
    /// Nothing was answered, so nothing was written.
    Skipped,
}

impl PersistenceStatus {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// What the learner sees once a session is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub snapshot: SessionSnapshot,
    pub persistence: PersistenceStatus,
}

/// Writes a finished session to storage.
///
/// Each write is attempted independently; failures are logged and reported in
/// the returned status, never raised.
#[derive(Clone)]
pub struct PersistenceGateway {
    progress: Arc<dyn ProgressRepository>,
    performance: Arc<dyn CardPerformanceRepository>,
    completions: Arc<dyn CompletionRepository>,
}

impl PersistenceGateway {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        performance: Arc<dyn CardPerformanceRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            progress,
            performance,
            completions,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.performance),
            Arc::clone(&storage.completions),
        )
    }

    /// Saves per-card results, the completion flag (full sessions only) and
    /// the session result with its mastery update.
    pub async fn commit(&self, snapshot: &SessionSnapshot) -> PersistenceStatus {
        let mut failures = Vec::new();

        let cards: Vec<CardResultRecord> = snapshot
            .answered()
            .iter()
            .map(|(flashcard_id, correct)| CardResultRecord {
                flashcard_id,
                correct,
            })
            .collect();
        if !cards.is_empty() {
            let written = self
                .performance
                .record_card_results(
                    snapshot.user_id(),
                    snapshot.deck_id(),
                    &cards,
                    snapshot.completed_at(),
                )
                .await;
            note(&mut failures, "record_card_results", written);
        }

        if !snapshot.ended_early() {
            let written = self
                .completions
                .mark_completed(&CompletionRecord {
                    user_id: snapshot.user_id(),
                    deck_id: snapshot.deck_id(),
                    mode: snapshot.mode(),
                    completed_at: snapshot.completed_at(),
                })
                .await;
            note(&mut failures, "mark_completed", written);
        }

        let mastery = snapshot.mastery();
        let written = self
            .progress
            .upsert_session_result(&SessionResultRecord {
                session_id: snapshot.session_id(),
                user_id: snapshot.user_id(),
                deck_id: snapshot.deck_id(),
                elapsed_secs: snapshot.elapsed_secs(),
                mastery_delta: mastery.delta(),
                new_mastery: mastery.new_mastery(),
                completed_at: snapshot.completed_at(),
            })
            .await
            .map(|progress| {
                tracing::debug!(
                    deck_id = %progress.deck_id,
                    mastery = progress.mastery.value(),
                    completed_sessions = progress.completed_sessions,
                    "deck progress updated"
                );
            });
        note(&mut failures, "upsert_session_result", written);

        if failures.is_empty() {
            PersistenceStatus::Saved
        } else {
            PersistenceStatus::Failed(failures)
        }
    }
}

fn note(
    failures: &mut Vec<PersistenceFailure>,
    operation: &'static str,
    result: Result<(), StorageError>,
) {
    if let Err(err) = result {
        tracing::warn!(operation, error = %err, "session persistence failed");
        failures.push(PersistenceFailure {
            operation,
            message: err.to_string(),
        });
    }
}
