use study_core::model::{DeckId, StudyMode, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, ser, u32_from_i64};
use crate::repository::{CompletionRecord, CompletionRepository, StorageError};

#[async_trait::async_trait]
impl CompletionRepository for SqliteRepository {
    async fn mark_completed(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO deck_completions (user_id, deck_id, mode, times_completed, last_completed_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT(user_id, deck_id, mode) DO UPDATE SET
                times_completed = deck_completions.times_completed + 1,
                last_completed_at = excluded.last_completed_at
            ",
        )
        .bind(id_i64("user_id", record.user_id.value())?)
        .bind(id_i64("deck_id", record.deck_id.value())?)
        .bind(record.mode.as_str())
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn completion_count(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        mode: StudyMode,
    ) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT times_completed
            FROM deck_completions
            WHERE user_id = ?1 AND deck_id = ?2 AND mode = ?3
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("deck_id", deck_id.value())?)
        .bind(mode.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(0);
        };
        u32_from_i64(
            "times_completed",
            row.try_get::<i64, _>("times_completed").map_err(ser)?,
        )
    }
}
