use chrono::{DateTime, Utc};
use study_core::model::{DeckId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_performance_row};
use crate::repository::{CardPerformance, CardPerformanceRepository, CardResultRecord, StorageError};

#[async_trait::async_trait]
impl CardPerformanceRepository for SqliteRepository {
    async fn record_card_results(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        results: &[CardResultRecord],
        recorded_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if results.is_empty() {
            return Ok(());
        }
        let user_id = id_i64("user_id", user_id.value())?;
        let deck_id = id_i64("deck_id", deck_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;
        for record in results {
            let correct = i64::from(record.correct);
            sqlx::query(
                r"
                INSERT INTO card_performance (
                    user_id, deck_id, flashcard_id, attempts,
                    correct_count, last_correct, last_seen
                )
                VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5)
                ON CONFLICT(user_id, deck_id, flashcard_id) DO UPDATE SET
                    attempts = card_performance.attempts + 1,
                    correct_count = card_performance.correct_count + excluded.correct_count,
                    last_correct = excluded.last_correct,
                    last_seen = excluded.last_seen
                ",
            )
            .bind(user_id)
            .bind(deck_id)
            .bind(id_i64("flashcard_id", record.flashcard_id.value())?)
            .bind(correct)
            .bind(recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn card_performance(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<CardPerformance>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT flashcard_id, attempts, correct_count, last_correct, last_seen
            FROM card_performance
            WHERE user_id = ?1 AND deck_id = ?2
            ORDER BY flashcard_id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("deck_id", deck_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_performance_row).collect()
    }
}
