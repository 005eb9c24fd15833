use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteOpenError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS decks (
            id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            visibility TEXT NOT NULL CHECK (visibility IN ('public', 'private'))
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS flashcards (
            id INTEGER NOT NULL,
            deck_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            prompt TEXT NOT NULL,
            answer TEXT NOT NULL,
            PRIMARY KEY (id, deck_id),
            FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS deck_progress (
            user_id INTEGER NOT NULL,
            deck_id INTEGER NOT NULL,
            mastery INTEGER NOT NULL CHECK (mastery BETWEEN 0 AND 100),
            last_studied TEXT,
            completed_sessions INTEGER NOT NULL CHECK (completed_sessions >= 0),
            total_study_secs INTEGER NOT NULL CHECK (total_study_secs >= 0),
            PRIMARY KEY (user_id, deck_id),
            FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS session_results (
            session_id BLOB PRIMARY KEY,
            user_id INTEGER NOT NULL,
            deck_id INTEGER NOT NULL,
            elapsed_secs INTEGER NOT NULL CHECK (elapsed_secs >= 0),
            mastery_delta INTEGER NOT NULL,
            new_mastery INTEGER NOT NULL CHECK (new_mastery BETWEEN 0 AND 100),
            completed_at TEXT NOT NULL,
            FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS card_performance (
            user_id INTEGER NOT NULL,
            deck_id INTEGER NOT NULL,
            flashcard_id INTEGER NOT NULL,
            attempts INTEGER NOT NULL CHECK (attempts >= 0),
            correct_count INTEGER NOT NULL CHECK (correct_count >= 0),
            last_correct INTEGER NOT NULL CHECK (last_correct IN (0, 1)),
            last_seen TEXT NOT NULL,
            PRIMARY KEY (user_id, deck_id, flashcard_id),
            FOREIGN KEY (flashcard_id, deck_id) REFERENCES flashcards(id, deck_id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS deck_completions (
            user_id INTEGER NOT NULL,
            deck_id INTEGER NOT NULL,
            mode TEXT NOT NULL CHECK (mode IN ('challenge', 'quiz')),
            times_completed INTEGER NOT NULL CHECK (times_completed >= 0),
            last_completed_at TEXT NOT NULL,
            PRIMARY KEY (user_id, deck_id, mode),
            FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_flashcards_deck_position
            ON flashcards (deck_id, position);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_session_results_user_deck
            ON session_results (user_id, deck_id, completed_at);
    ",
];

/// Highest schema version this build knows how to create.
pub const LATEST_SCHEMA_VERSION: i64 = 1;

const MIGRATIONS: [(i64, &[&str]); 1] = [(LATEST_SCHEMA_VERSION, SCHEMA_V1)];

/// Outcome of a migration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions applied by this pass, oldest first.
    pub applied: Vec<i64>,
    /// Highest version recorded once the pass finished.
    pub schema_version: i64,
}

impl MigrationReport {
    /// True when the database already had every known version.
    #[must_use]
    pub fn is_up_to_date_on_open(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applies missing schema versions, each in its own transaction, and records
/// them in `schema_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<MigrationReport, SqliteOpenError> {
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
        ",
    )
    .execute(pool)
    .await
    .map_err(SqliteOpenError::SchemaVersion)?;

    let current = recorded_version(pool).await?;
    let mut applied = Vec::new();
    for (version, statements) in MIGRATIONS {
        if version <= current {
            continue;
        }
        apply(pool, version, statements)
            .await
            .map_err(|source| SqliteOpenError::Migration { version, source })?;
        applied.push(version);
    }

    Ok(MigrationReport {
        applied,
        schema_version: recorded_version(pool).await?,
    })
}

async fn recorded_version(pool: &SqlitePool) -> Result<i64, SqliteOpenError> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await
        .map_err(SqliteOpenError::SchemaVersion)?;
    Ok(version.unwrap_or(0))
}

async fn apply(pool: &SqlitePool, version: i64, statements: &[&str]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}
