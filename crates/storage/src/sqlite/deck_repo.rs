use study_core::model::{Deck, DeckId, Flashcard, Visibility};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, deck_id_from_i64, flashcard_id_from_i64, id_i64, ser, user_id_from_i64};
use crate::repository::{DeckRepository, StorageError};

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let deck_id = id_i64("deck_id", deck.id().value())?;
        let owner_id = id_i64("owner_id", deck.owner_id().value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO decks (id, owner_id, name, visibility)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                name = excluded.name,
                visibility = excluded.visibility
            ",
        )
        .bind(deck_id)
        .bind(owner_id)
        .bind(deck.name())
        .bind(deck.visibility().as_str())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // Flashcards are replaced wholesale so positions stay contiguous.
        sqlx::query("DELETE FROM flashcards WHERE deck_id = ?1")
            .bind(deck_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, card) in deck.flashcards().iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            sqlx::query(
                r"
                INSERT INTO flashcards (id, deck_id, position, prompt, answer)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(id_i64("flashcard_id", card.id().value())?)
            .bind(deck_id)
            .bind(position)
            .bind(card.prompt())
            .bind(card.answer())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let deck_id = id_i64("deck_id", id.value())?;

        let Some(row) = sqlx::query(
            r"
            SELECT id, owner_id, name, visibility
            FROM decks
            WHERE id = ?1
            ",
        )
        .bind(deck_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let card_rows = sqlx::query(
            r"
            SELECT id, prompt, answer
            FROM flashcards
            WHERE deck_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(deck_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut flashcards = Vec::with_capacity(card_rows.len());
        for card_row in &card_rows {
            let card = Flashcard::new(
                flashcard_id_from_i64(card_row.try_get::<i64, _>("id").map_err(ser)?)?,
                card_row.try_get::<String, _>("prompt").map_err(ser)?,
                card_row.try_get::<String, _>("answer").map_err(ser)?,
            )
            .map_err(ser)?;
            flashcards.push(card);
        }

        let visibility: String = row.try_get("visibility").map_err(ser)?;
        let deck = Deck::new(
            deck_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            user_id_from_i64(row.try_get::<i64, _>("owner_id").map_err(ser)?)?,
            row.try_get::<String, _>("name").map_err(ser)?,
            visibility.parse::<Visibility>().map_err(ser)?,
            flashcards,
        )
        .map_err(ser)?;

        Ok(Some(deck))
    }
}
