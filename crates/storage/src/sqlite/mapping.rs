use study_core::mastery::MasteryPercent;
use study_core::model::{DeckId, DeckProgress, FlashcardId, UserId};
use sqlx::Row;

use crate::repository::{CardPerformance, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn flashcard_id_from_i64(v: i64) -> Result<FlashcardId, StorageError> {
    Ok(FlashcardId::new(i64_to_u64("flashcard_id", v)?))
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<DeckProgress, StorageError> {
    let mastery: i64 = row.try_get("mastery").map_err(ser)?;
    let total_study_secs: i64 = row.try_get("total_study_secs").map_err(ser)?;
    Ok(DeckProgress {
        user_id: user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        deck_id: deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        mastery: MasteryPercent::clamped(mastery),
        last_studied: row.try_get("last_studied").map_err(ser)?,
        completed_sessions: u32_from_i64(
            "completed_sessions",
            row.try_get::<i64, _>("completed_sessions").map_err(ser)?,
        )?,
        total_study_secs: i64_to_u64("total_study_secs", total_study_secs)?,
    })
}

pub(crate) fn map_performance_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CardPerformance, StorageError> {
    Ok(CardPerformance {
        flashcard_id: flashcard_id_from_i64(row.try_get::<i64, _>("flashcard_id").map_err(ser)?)?,
        attempts: u32_from_i64("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?,
        correct_count: u32_from_i64(
            "correct_count",
            row.try_get::<i64, _>("correct_count").map_err(ser)?,
        )?,
        last_correct: row.try_get::<i64, _>("last_correct").map_err(ser)? != 0,
        last_seen: row.try_get("last_seen").map_err(ser)?,
    })
}
