use chrono::Duration;
use study_core::mastery::MasteryPercent;
use study_core::model::{Deck, DeckId, Flashcard, FlashcardId, SessionId, StudyMode, UserId, Visibility};
use study_core::time::fixed_now;
use storage::repository::{
    CardPerformanceRepository, CardResultRecord, CompletionRecord, CompletionRepository,
    DeckRepository, ProgressRepository, SessionResultRecord,
};
use storage::sqlite::{LATEST_SCHEMA_VERSION, SqliteRepository};

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let (repo, _) = SqliteRepository::open(&url).await.expect("open");
    repo
}

fn build_deck(cards: u64) -> Deck {
    let flashcards = (1..=cards)
        .map(|i| Flashcard::new(FlashcardId::new(i), format!("Q{i}"), format!("A{i}")).unwrap())
        .collect();
    Deck::new(DeckId::new(1), UserId::new(10), "Capitals", Visibility::Private, flashcards).unwrap()
}

#[tokio::test]
async fn sqlite_deck_roundtrip_keeps_card_order() {
    let repo = connect("memdb_deck_roundtrip").await;
    let deck = build_deck(5);
    repo.upsert_deck(&deck).await.unwrap();

    let fetched = repo.get_deck(deck.id()).await.unwrap().expect("deck present");
    assert_eq!(fetched, deck);
    assert_eq!(repo.get_deck(DeckId::new(99)).await.unwrap(), None);

    // Re-upserting with fewer cards replaces the set.
    let smaller = build_deck(2);
    repo.upsert_deck(&smaller).await.unwrap();
    let fetched = repo.get_deck(deck.id()).await.unwrap().unwrap();
    assert_eq!(fetched.card_count(), 2);
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    let report = repo.migrate().await.expect("second migrate");
    assert!(report.applied.is_empty());
    assert_eq!(report.schema_version, LATEST_SCHEMA_VERSION);
}

#[tokio::test]
async fn sqlite_session_result_applies_once() {
    let repo = connect("memdb_session_result").await;
    repo.upsert_deck(&build_deck(4)).await.unwrap();

    let record = SessionResultRecord {
        session_id: SessionId::generate(),
        user_id: UserId::new(10),
        deck_id: DeckId::new(1),
        elapsed_secs: 95,
        mastery_delta: 4,
        new_mastery: MasteryPercent::clamped(54),
        completed_at: fixed_now(),
    };

    assert_eq!(repo.get_progress(UserId::new(10), DeckId::new(1)).await.unwrap(), None);

    let progress = repo.upsert_session_result(&record).await.unwrap();
    assert_eq!(progress.mastery.value(), 54);
    assert_eq!(progress.completed_sessions, 1);
    assert_eq!(progress.total_study_secs, 95);
    assert_eq!(progress.last_studied, Some(fixed_now()));

    let replay = repo.upsert_session_result(&record).await.unwrap();
    assert_eq!(replay, progress);

    let later = SessionResultRecord {
        session_id: SessionId::generate(),
        new_mastery: MasteryPercent::clamped(50),
        mastery_delta: -4,
        elapsed_secs: 5,
        completed_at: fixed_now() + Duration::minutes(10),
        ..record
    };
    let progress = repo.upsert_session_result(&later).await.unwrap();
    assert_eq!(progress.completed_sessions, 2);
    assert_eq!(progress.total_study_secs, 100);
    assert_eq!(progress.mastery.value(), 50);
}

#[tokio::test]
async fn sqlite_card_performance_and_completions() {
    let repo = connect("memdb_perf_completion").await;
    repo.upsert_deck(&build_deck(4)).await.unwrap();
    let user = UserId::new(10);
    let deck = DeckId::new(1);

    let results = [
        CardResultRecord { flashcard_id: FlashcardId::new(1), correct: true },
        CardResultRecord { flashcard_id: FlashcardId::new(2), correct: false },
    ];
    repo.record_card_results(user, deck, &results, fixed_now()).await.unwrap();
    repo.record_card_results(user, deck, &results[..1], fixed_now()).await.unwrap();

    let perf = repo.card_performance(user, deck).await.unwrap();
    assert_eq!(perf.len(), 2);
    assert_eq!(perf[0].attempts, 2);
    assert_eq!(perf[0].correct_count, 2);
    assert_eq!(perf[1].attempts, 1);
    assert!(!perf[1].last_correct);

    let completion = CompletionRecord {
        user_id: user,
        deck_id: deck,
        mode: StudyMode::Challenge,
        completed_at: fixed_now(),
    };
    repo.mark_completed(&completion).await.unwrap();
    repo.mark_completed(&completion).await.unwrap();
    assert_eq!(repo.completion_count(user, deck, StudyMode::Challenge).await.unwrap(), 2);
    assert_eq!(repo.completion_count(user, deck, StudyMode::Quiz).await.unwrap(), 0);
}
