//! # API Stat Repository
//!
//! Database access layer for daily API-call counters, keyed by
//! (service, endpoint, date).
//!
//! Upserts set the count to the passed value: the accountant flushes its
//! cumulative in-memory total, so the operation is idempotent and
//! last-writer-wins within a day.

use super::filter::{apply_options, ListOptions};
use super::models::ApiStatRow;
use super::DbPool;
use chrono::NaiveDate;
use sqlx::{query_as, QueryBuilder, Sqlite};

/// Repository for `api_stats` table operations.
pub struct ApiStatRepository;

impl ApiStatRepository {
    /// Fetch a single counter row.
    pub async fn get(
        pool: &DbPool,
        service_name: &str,
        endpoint_name: &str,
        date: NaiveDate,
    ) -> Result<Option<ApiStatRow>, sqlx::Error> {
        query_as::<_, ApiStatRow>(
            "SELECT * FROM api_stats WHERE service_name = ? AND endpoint_name = ? AND date = ?",
        )
        .bind(service_name)
        .bind(endpoint_name)
        .bind(date)
        .fetch_optional(pool)
        .await
    }

    /// List every counter row for a calendar date.
    pub async fn list_for_date(
        pool: &DbPool,
        date: NaiveDate,
    ) -> Result<Vec<ApiStatRow>, sqlx::Error> {
        query_as::<_, ApiStatRow>("SELECT * FROM api_stats WHERE date = ?")
            .bind(date)
            .fetch_all(pool)
            .await
    }

    /// List counter rows matching the given filter options.
    pub async fn list_with(
        pool: &DbPool,
        opts: &ListOptions,
    ) -> Result<Vec<ApiStatRow>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM api_stats");
        apply_options(&mut builder, opts);

        builder.build_query_as::<ApiStatRow>().fetch_all(pool).await
    }

    /// Set the count for (service, endpoint, date) to the passed value.
    pub async fn upsert(
        pool: &DbPool,
        service_name: &str,
        endpoint_name: &str,
        date: NaiveDate,
        count: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO api_stats (service_name, endpoint_name, date, count)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(service_name, endpoint_name, date) DO UPDATE SET
                count = excluded.count
            "#,
        )
        .bind(service_name)
        .bind(endpoint_name)
        .bind(date)
        .bind(count)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Upsert a batch of counter rows inside one transaction.
    pub async fn bulk_upsert(pool: &DbPool, rows: &[ApiStatRow]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO api_stats (service_name, endpoint_name, date, count)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(service_name, endpoint_name, date) DO UPDATE SET
                    count = excluded.count
                "#,
            )
            .bind(&row.service_name)
            .bind(&row.endpoint_name)
            .bind(row.date)
            .bind(row.count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Delete a counter row.
    pub async fn delete(
        pool: &DbPool,
        service_name: &str,
        endpoint_name: &str,
        date: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM api_stats WHERE service_name = ? AND endpoint_name = ? AND date = ?",
        )
        .bind(service_name)
        .bind(endpoint_name)
        .bind(date)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::{create_pool, init_schema, Filter};

    async fn setup_test_db() -> DbPool {
        let pool = create_pool("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        init_schema(&pool).await.expect("Failed to create schema");
        pool
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn upsert_is_last_writer_wins() {
        let pool = setup_test_db().await;
        let today = date("2026-08-01");

        ApiStatRepository::upsert(&pool, "market-data", "/defi/history_price", today, 3)
            .await
            .unwrap();
        ApiStatRepository::upsert(&pool, "market-data", "/defi/history_price", today, 7)
            .await
            .unwrap();

        let row = ApiStatRepository::get(&pool, "market-data", "/defi/history_price", today)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.count, 7);
    }

    #[tokio::test]
    async fn rows_are_unique_per_date() {
        let pool = setup_test_db().await;

        ApiStatRepository::upsert(&pool, "aggregator", "/price", date("2026-07-31"), 5)
            .await
            .unwrap();
        ApiStatRepository::upsert(&pool, "aggregator", "/price", date("2026-08-01"), 2)
            .await
            .unwrap();

        let yesterday = ApiStatRepository::list_for_date(&pool, date("2026-07-31"))
            .await
            .unwrap();
        assert_eq!(yesterday.len(), 1);
        assert_eq!(yesterday[0].count, 5);
    }

    #[tokio::test]
    async fn list_with_filters_by_service() {
        let pool = setup_test_db().await;
        let today = date("2026-08-01");

        ApiStatRepository::upsert(&pool, "market-data", "/a", today, 1)
            .await
            .unwrap();
        ApiStatRepository::upsert(&pool, "aggregator", "/b", today, 1)
            .await
            .unwrap();

        let opts = ListOptions::new().filter(Filter::equal("service_name", "aggregator"));
        let rows = ApiStatRepository::list_with(&pool, &opts).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].endpoint_name, "/b");
    }
}
