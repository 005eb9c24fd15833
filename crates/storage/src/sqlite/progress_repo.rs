use study_core::model::{DeckId, DeckProgress, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_progress_row};
use crate::repository::{ProgressRepository, SessionResultRecord, StorageError};

const SELECT_PROGRESS: &str = r"
    SELECT user_id, deck_id, mastery, last_studied, completed_sessions, total_study_secs
    FROM deck_progress
    WHERE user_id = ?1 AND deck_id = ?2
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Option<DeckProgress>, StorageError> {
        let row = sqlx::query(SELECT_PROGRESS)
            .bind(id_i64("user_id", user_id.value())?)
            .bind(id_i64("deck_id", deck_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn upsert_session_result(
        &self,
        record: &SessionResultRecord,
    ) -> Result<DeckProgress, StorageError> {
        let user_id = id_i64("user_id", record.user_id.value())?;
        let deck_id = id_i64("deck_id", record.deck_id.value())?;
        let elapsed = i64::try_from(record.elapsed_secs)
            .map_err(|_| StorageError::Serialization("elapsed_secs overflow".into()))?;
        let new_mastery = i64::from(record.new_mastery.value());

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO session_results (
                session_id, user_id, deck_id, elapsed_secs,
                mastery_delta, new_mastery, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(session_id) DO NOTHING
            ",
        )
        .bind(record.session_id.as_uuid())
        .bind(user_id)
        .bind(deck_id)
        .bind(elapsed)
        .bind(record.mastery_delta)
        .bind(new_mastery)
        .bind(record.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?
        .rows_affected();

        // A replayed session id must not bump counters a second time.
        if inserted > 0 {
            sqlx::query(
                r"
                INSERT INTO deck_progress (
                    user_id, deck_id, mastery, last_studied,
                    completed_sessions, total_study_secs
                )
                VALUES (?1, ?2, ?3, ?4, 1, ?5)
                ON CONFLICT(user_id, deck_id) DO UPDATE SET
                    mastery = excluded.mastery,
                    last_studied = excluded.last_studied,
                    completed_sessions = deck_progress.completed_sessions + 1,
                    total_study_secs = deck_progress.total_study_secs + excluded.total_study_secs
                ",
            )
            .bind(user_id)
            .bind(deck_id)
            .bind(new_mastery)
            .bind(record.completed_at)
            .bind(elapsed)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        let row = sqlx::query(SELECT_PROGRESS)
            .bind(user_id)
            .bind(deck_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        let progress = map_progress_row(&row)?;

        tx.commit().await.map_err(conn)?;
        Ok(progress)
    }
}
