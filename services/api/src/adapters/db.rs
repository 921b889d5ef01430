//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashcards_core::domain::{Flashcard, FlashcardSetDetail, SavedFlashcard, SavedFlashcardSet};
use flashcards_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct FlashcardSetRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    card_count: i32,
    created_at: DateTime<Utc>,
}
impl FlashcardSetRecord {
    fn to_domain(self) -> SavedFlashcardSet {
        SavedFlashcardSet {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            card_count: self.card_count.max(0) as usize,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct FlashcardRecord {
    id: Uuid,
    set_id: Uuid,
    position: i32,
    question: String,
    answer: String,
}
impl FlashcardRecord {
    fn to_domain(self) -> SavedFlashcard {
        SavedFlashcard {
            id: self.id,
            set_id: self.set_id,
            position: self.position.max(0) as usize,
            question: self.question,
            answer: self.answer,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn save_flashcard_set(
        &self,
        user_id: Uuid,
        title: &str,
        cards: &[Flashcard],
    ) -> PortResult<SavedFlashcardSet> {
        let card_count = i32::try_from(cards.len())
            .map_err(|_| PortError::Unexpected("too many flashcards in one set".to_string()))?;

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let set = sqlx::query_as::<_, FlashcardSetRecord>(
            "INSERT INTO flashcard_sets (id, user_id, title, card_count) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, title, card_count, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(card_count)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        for (position, card) in (0_i32..).zip(cards) {
            sqlx::query(
                "INSERT INTO flashcards (id, set_id, position, question, answer) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(set.id)
            .bind(position)
            .bind(&card.question)
            .bind(&card.answer)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(set.to_domain())
    }

    async fn list_flashcard_sets(&self, user_id: Uuid) -> PortResult<Vec<SavedFlashcardSet>> {
        let records = sqlx::query_as::<_, FlashcardSetRecord>(
            "SELECT id, user_id, title, card_count, created_at FROM flashcard_sets \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_flashcard_set(&self, set_id: Uuid) -> PortResult<FlashcardSetDetail> {
        let set = sqlx::query_as::<_, FlashcardSetRecord>(
            "SELECT id, user_id, title, card_count, created_at FROM flashcard_sets WHERE id = $1",
        )
        .bind(set_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Flashcard set {} not found", set_id))
            }
            _ => unexpected(e),
        })?;

        let cards = sqlx::query_as::<_, FlashcardRecord>(
            "SELECT id, set_id, position, question, answer FROM flashcards \
             WHERE set_id = $1 ORDER BY position ASC",
        )
        .bind(set_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(FlashcardSetDetail {
            set: set.to_domain(),
            cards: cards.into_iter().map(|r| r.to_domain()).collect(),
        })
    }
}
