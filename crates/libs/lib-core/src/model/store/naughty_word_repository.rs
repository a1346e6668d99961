//! # Naughty Word Repository
//!
//! Word-list storage consumed by the profanity filter living outside the
//! core. The core only persists and lists entries; matching logic is the
//! collaborator's concern.

use super::models::NaughtyWordRow;
use super::DbPool;
use chrono::Utc;
use sqlx::query_as;

/// Repository for `naughty_words` table operations.
pub struct NaughtyWordRepository;

impl NaughtyWordRepository {
    pub async fn get(pool: &DbPool, word: &str) -> Result<Option<NaughtyWordRow>, sqlx::Error> {
        query_as::<_, NaughtyWordRow>("SELECT * FROM naughty_words WHERE word = ?")
            .bind(word)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &DbPool) -> Result<Vec<NaughtyWordRow>, sqlx::Error> {
        query_as::<_, NaughtyWordRow>("SELECT * FROM naughty_words")
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &DbPool, word: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO naughty_words (word, created_at) VALUES (?, ?)")
            .bind(word)
            .bind(Utc::now())
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn bulk_upsert(pool: &DbPool, words: &[String]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for word in words {
            sqlx::query(
                r#"
                INSERT INTO naughty_words (word, created_at)
                VALUES (?, ?)
                ON CONFLICT(word) DO NOTHING
                "#,
            )
            .bind(word)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    pub async fn delete(pool: &DbPool, word: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM naughty_words WHERE word = ?")
            .bind(word)
            .execute(pool)
            .await?;

        Ok(())
    }
}
