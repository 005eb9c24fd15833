use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use services::sessions::TimerExpired;
use services::{
    AccessError, Clock, ContentError, PersistenceStatus, SessionController, SessionError,
    SessionLauncher, SessionState, StaticAdaptiveContent,
};
use storage::repository::{
    CardPerformance, CardPerformanceRepository, CardResultRecord, CompletionRecord,
    CompletionRepository, DeckRepository, InMemoryRepository, ProgressRepository,
    SessionResultRecord, Storage, StorageError,
};
use study_core::mastery::MasteryPercent;
use study_core::model::{
    AdaptiveQuestion, Deck, DeckId, DeckProgress, Flashcard, FlashcardId, SessionConfigDraft,
    SessionConfigError, StudyMode, UserId, Visibility,
};
use study_core::time::fixed_now;

const OWNER: UserId = UserId::new(1);
const DECK: DeckId = DeckId::new(1);

/// In-memory storage that counts deck fetches and session-result writes.
#[derive(Clone, Default)]
struct CountingRepo {
    inner: InMemoryRepository,
    deck_fetches: Arc<AtomicUsize>,
    session_writes: Arc<AtomicUsize>,
    fail_writes: bool,
}

impl CountingRepo {
    fn deck_fetches(&self) -> usize {
        self.deck_fetches.load(Ordering::SeqCst)
    }

    fn session_writes(&self) -> usize {
        self.session_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeckRepository for CountingRepo {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        self.inner.upsert_deck(deck).await
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        self.deck_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.get_deck(id).await
    }
}

#[async_trait]
impl ProgressRepository for CountingRepo {
    async fn get_progress(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Option<DeckProgress>, StorageError> {
        self.inner.get_progress(user_id, deck_id).await
    }

    async fn upsert_session_result(
        &self,
        record: &SessionResultRecord,
    ) -> Result<DeckProgress, StorageError> {
        self.session_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StorageError::Connection("database is locked".into()));
        }
        self.inner.upsert_session_result(record).await
    }
}

#[async_trait]
impl CardPerformanceRepository for CountingRepo {
    async fn record_card_results(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        results: &[CardResultRecord],
        recorded_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.inner
            .record_card_results(user_id, deck_id, results, recorded_at)
            .await
    }

    async fn card_performance(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<CardPerformance>, StorageError> {
        self.inner.card_performance(user_id, deck_id).await
    }
}

#[async_trait]
impl CompletionRepository for CountingRepo {
    async fn mark_completed(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        self.inner.mark_completed(record).await
    }

    async fn completion_count(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        mode: StudyMode,
    ) -> Result<u32, StorageError> {
        self.inner.completion_count(user_id, deck_id, mode).await
    }
}

fn build_deck(cards: u64, visibility: Visibility) -> Deck {
    let cards = (1..=cards)
        .map(|i| Flashcard::new(FlashcardId::new(i), format!("Q{i}"), format!("A{i}")).unwrap())
        .collect();
    Deck::new(DECK, OWNER, "Capitals", visibility, cards).unwrap()
}

async fn seeded(
    repo: CountingRepo,
    cards: u64,
    visibility: Visibility,
) -> (CountingRepo, SessionLauncher) {
    repo.inner
        .upsert_deck(&build_deck(cards, visibility))
        .await
        .unwrap();
    let launcher = SessionLauncher::from_storage(
        Clock::fixed(fixed_now()),
        &Storage::from_repository(repo.clone()),
    )
    .with_seed(7);
    (repo, launcher)
}

async fn play(controller: &mut SessionController, correct: bool) {
    loop {
        match controller.state().name() {
            "active" => {
                let options = &controller.current_question().unwrap().options;
                let right = options.correct_index().unwrap();
                let index = if correct { right } else { (right + 1) % options.len() };
                assert!(controller.select_answer(index).await.is_applied());
            }
            "answer_revealed" => {
                assert!(controller.advance().await.is_applied());
            }
            "round_complete" => {
                assert!(controller.acknowledge_round().await.is_applied());
            }
            _ => break,
        }
    }
}

#[tokio::test]
async fn three_round_session_completes_and_persists_once() {
    let (repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let mut controller = launcher
        .launch(OWNER, SessionConfigDraft::challenge(DECK, 3), None)
        .await;
    assert_eq!(controller.progress().total_questions, 24);

    play(&mut controller, true).await;

    let result = controller.result().expect("session complete").clone();
    assert_eq!(result.persistence, PersistenceStatus::Saved);
    assert_eq!(result.snapshot.correct(), 24);
    assert_eq!(result.snapshot.incorrect(), 0);
    assert_eq!(result.snapshot.mastery().delta(), 24);
    assert_eq!(result.snapshot.rounds().len(), 3);
    assert_eq!(controller.round_summaries().len(), 3);
    assert!(!result.snapshot.ended_early());

    // Nothing after completion reaches persistence again.
    assert!(!controller.end_session().await.is_applied());
    assert!(!controller.abandon().await.is_applied());
    assert!(!controller.advance().await.is_applied());
    assert_eq!(repo.session_writes(), 1);

    let progress = repo.inner.get_progress(OWNER, DECK).await.unwrap().unwrap();
    assert_eq!(progress.mastery, MasteryPercent::clamped(24));
    assert_eq!(progress.completed_sessions, 1);
    assert_eq!(
        repo.inner
            .completion_count(OWNER, DECK, StudyMode::Challenge)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn unsupported_round_count_fails_before_fetching_the_deck() {
    let (repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let controller = launcher
        .launch(OWNER, SessionConfigDraft::challenge(DECK, 2), None)
        .await;

    assert_eq!(
        controller.failure(),
        Some(&SessionError::Configuration(
            SessionConfigError::UnsupportedRoundCount(2)
        ))
    );
    assert_eq!(repo.deck_fetches(), 0);
}

#[tokio::test]
async fn three_card_deck_is_a_content_error() {
    let (_repo, launcher) = seeded(CountingRepo::default(), 3, Visibility::Private).await;
    let controller = launcher
        .launch(OWNER, SessionConfigDraft::challenge(DECK, 1), None)
        .await;

    assert!(matches!(
        controller.state(),
        SessionState::Error(SessionError::Content(ContentError::TooFewFlashcards {
            found: 3,
            ..
        }))
    ));
}

#[tokio::test]
async fn private_deck_of_another_user_is_denied() {
    let (_repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let stranger = UserId::new(2);
    let controller = launcher
        .launch(stranger, SessionConfigDraft::challenge(DECK, 1), None)
        .await;

    assert_eq!(
        controller.failure(),
        Some(&SessionError::Access(AccessError::Denied {
            user_id: stranger,
            deck_id: DECK
        }))
    );
}

#[tokio::test]
async fn persistence_failure_still_completes() {
    let repo = CountingRepo {
        fail_writes: true,
        ..CountingRepo::default()
    };
    let (repo, launcher) = seeded(repo, 10, Visibility::Public).await;
    let mut controller = launcher
        .launch(OWNER, SessionConfigDraft::challenge(DECK, 1), None)
        .await;

    play(&mut controller, false).await;

    let result = controller.result().expect("session complete");
    let PersistenceStatus::Failed(failures) = &result.persistence else {
        panic!("expected failed persistence, got {:?}", result.persistence);
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation, "upsert_session_result");
    assert_eq!(result.snapshot.mastery().delta(), -10);
    assert_eq!(repo.session_writes(), 1);
}

#[tokio::test]
async fn abandon_without_answers_skips_persistence() {
    let (repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let mut controller = launcher
        .launch(OWNER, SessionConfigDraft::challenge(DECK, 1).timed(true), None)
        .await;

    assert!(controller.abandon().await.is_applied());

    let result = controller.result().expect("session complete");
    assert_eq!(result.persistence, PersistenceStatus::Skipped);
    assert_eq!(result.snapshot.questions_answered(), 0);
    assert_eq!(repo.session_writes(), 0);
    assert_eq!(controller.progress().remaining_secs, None);
}

#[tokio::test]
async fn early_end_saves_partial_session_without_completion_flag() {
    let (repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let mut controller = launcher
        .launch(OWNER, SessionConfigDraft::challenge(DECK, 3), None)
        .await;

    for _ in 0..3 {
        let right = controller
            .current_question()
            .unwrap()
            .options
            .correct_index()
            .unwrap();
        let _ = controller.select_answer(right).await;
        let _ = controller.advance().await;
    }
    assert!(controller.end_session().await.is_applied());

    let result = controller.result().expect("session complete");
    assert!(result.snapshot.ended_early());
    assert_eq!(result.snapshot.correct(), 3);
    assert_eq!(result.persistence, PersistenceStatus::Saved);
    assert_eq!(
        repo.inner
            .completion_count(OWNER, DECK, StudyMode::Challenge)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_marks_question_incorrect() {
    let (_repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let mut controller = launcher
        .launch(OWNER, SessionConfigDraft::challenge(DECK, 1).timed(true), None)
        .await;
    let remaining = controller.progress().remaining_secs.unwrap();
    assert!(remaining <= 15);

    let expired = controller.next_timer_event().await.unwrap();
    assert_eq!(expired, TimerExpired { question_seq: 1 });
    assert!(controller.timer_expired(expired).await.is_applied());

    let SessionState::AnswerRevealed { outcome, .. } = controller.state() else {
        panic!("expected revealed answer");
    };
    assert!(outcome.timed_out());
    assert_eq!(controller.progress().incorrect, 1);
    assert_eq!(controller.progress().remaining_secs, None);

    assert!(controller.advance().await.is_applied());
    let next = controller.next_timer_event().await.unwrap();
    assert_eq!(next.question_seq, 2);
}

#[tokio::test(start_paused = true)]
async fn answer_before_deadline_wins_the_race() {
    let (_repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let mut controller = launcher
        .launch(OWNER, SessionConfigDraft::challenge(DECK, 1).timed(true), None)
        .await;

    tokio::time::sleep(Duration::from_secs(14)).await;
    let right = controller
        .current_question()
        .unwrap()
        .options
        .correct_index()
        .unwrap();
    assert!(controller.select_answer(right).await.is_applied());

    let waited = tokio::time::timeout(Duration::from_secs(60), controller.next_timer_event()).await;
    assert!(waited.is_err(), "cancelled timer must not fire");

    let late = controller
        .timer_expired(TimerExpired { question_seq: 1 })
        .await;
    assert!(!late.is_applied());
    assert_eq!(controller.progress().correct, 1);
    assert_eq!(controller.progress().incorrect, 0);
}

fn quiz_question(n: u64) -> AdaptiveQuestion {
    AdaptiveQuestion {
        question: format!("Question {n}?"),
        correct_answer: format!("A{n}"),
        options: vec![
            format!("A{n}"),
            "nope".into(),
            "never".into(),
            "maybe".into(),
            format!("A{n}"),
        ],
        original_flashcard_id: FlashcardId::new(n),
    }
}

#[tokio::test]
async fn quiz_requires_an_access_token() {
    let (_repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let launcher = launcher.with_adaptive_source(Arc::new(StaticAdaptiveContent::new(vec![
        quiz_question(1),
    ])));

    let controller = launcher
        .launch(OWNER, SessionConfigDraft::quiz(DECK), Some("   "))
        .await;
    assert_eq!(
        controller.failure(),
        Some(&SessionError::Access(AccessError::MissingAccessToken))
    );
}

#[tokio::test]
async fn quiz_runs_a_single_pass_over_adaptive_questions() {
    let (repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let questions = (1..=12).map(quiz_question).collect();
    let launcher =
        launcher.with_adaptive_source(Arc::new(StaticAdaptiveContent::new(questions)));

    let mut controller = launcher
        .launch(OWNER, SessionConfigDraft::quiz(DECK), Some("token"))
        .await;
    assert_eq!(controller.progress().total_questions, 10);
    assert_eq!(controller.current_question().unwrap().prompt, "Question 1?");
    assert_eq!(
        controller.current_options().unwrap().len(),
        4,
        "duplicate option text is collapsed"
    );

    play(&mut controller, true).await;

    let result = controller.result().expect("session complete");
    assert_eq!(result.snapshot.mode(), StudyMode::Quiz);
    assert_eq!(result.snapshot.correct(), 10);
    assert_eq!(result.snapshot.rounds().len(), 1);
    assert_eq!(
        repo.inner
            .completion_count(OWNER, DECK, StudyMode::Quiz)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn quiz_without_content_source_is_a_content_error() {
    let (_repo, launcher) = seeded(CountingRepo::default(), 10, Visibility::Private).await;
    let controller = launcher
        .launch(OWNER, SessionConfigDraft::quiz(DECK), Some("token"))
        .await;
    assert!(matches!(
        controller.failure(),
        Some(SessionError::Content(ContentError::SourceUnavailable(_)))
    ));
}
