//! # Coin Repository
//!
//! Database access layer for persisted coins, keyed by mint.
//!
//! The enrichment pipeline is the only writer on the hot path; reads happen
//! once at startup to rehydrate the in-memory catalog.

use super::filter::{apply_options, ListOptions};
use super::models::CoinRow;
use super::DbPool;
use crate::model::Coin;
use sqlx::{query_as, QueryBuilder, Sqlite};

/// Repository for `coins` table operations.
pub struct CoinRepository;

impl CoinRepository {
    /// Fetch a single coin by mint.
    pub async fn get(pool: &DbPool, mint: &str) -> Result<Option<Coin>, sqlx::Error> {
        let row = query_as::<_, CoinRow>("SELECT * FROM coins WHERE mint = ?")
            .bind(mint)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Coin::from))
    }

    /// List every persisted coin.
    pub async fn list(pool: &DbPool) -> Result<Vec<Coin>, sqlx::Error> {
        let rows = query_as::<_, CoinRow>("SELECT * FROM coins")
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Coin::from).collect())
    }

    /// List coins matching the given filter options.
    pub async fn list_with(pool: &DbPool, opts: &ListOptions) -> Result<Vec<Coin>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM coins");
        apply_options(&mut builder, opts);

        let rows = builder.build_query_as::<CoinRow>().fetch_all(pool).await?;

        Ok(rows.into_iter().map(Coin::from).collect())
    }

    /// Insert a new coin. Fails if the mint already exists.
    pub async fn create(pool: &DbPool, coin: &Coin) -> Result<(), sqlx::Error> {
        let row = CoinRow::from_coin(coin);

        sqlx::query(
            r#"
            INSERT INTO coins (mint, symbol, name, decimals, logo_uri, tags,
                price_usd, market_cap_usd, volume_24h_usd, volume_24h_change_pct,
                price_24h_change_pct, liquidity_usd, fdv_usd, rank, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.mint)
        .bind(&row.symbol)
        .bind(&row.name)
        .bind(row.decimals)
        .bind(&row.logo_uri)
        .bind(&row.tags)
        .bind(row.price_usd)
        .bind(row.market_cap_usd)
        .bind(row.volume_24h_usd)
        .bind(row.volume_24h_change_pct)
        .bind(row.price_24h_change_pct)
        .bind(row.liquidity_usd)
        .bind(row.fdv_usd)
        .bind(row.rank)
        .bind(row.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Update an existing coin's full snapshot by mint.
    pub async fn update(pool: &DbPool, coin: &Coin) -> Result<(), sqlx::Error> {
        let row = CoinRow::from_coin(coin);

        let result = sqlx::query(
            r#"
            UPDATE coins
            SET symbol = ?, name = ?, decimals = ?, logo_uri = ?, tags = ?,
                price_usd = ?, market_cap_usd = ?, volume_24h_usd = ?,
                volume_24h_change_pct = ?, price_24h_change_pct = ?,
                liquidity_usd = ?, fdv_usd = ?, rank = ?, updated_at = ?
            WHERE mint = ?
            "#,
        )
        .bind(&row.symbol)
        .bind(&row.name)
        .bind(row.decimals)
        .bind(&row.logo_uri)
        .bind(&row.tags)
        .bind(row.price_usd)
        .bind(row.market_cap_usd)
        .bind(row.volume_24h_usd)
        .bind(row.volume_24h_change_pct)
        .bind(row.price_24h_change_pct)
        .bind(row.liquidity_usd)
        .bind(row.fdv_usd)
        .bind(row.rank)
        .bind(row.updated_at)
        .bind(&row.mint)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    /// Insert or fully replace a coin by mint.
    pub async fn upsert(pool: &DbPool, coin: &Coin) -> Result<(), sqlx::Error> {
        let row = CoinRow::from_coin(coin);

        sqlx::query(
            r#"
            INSERT INTO coins (mint, symbol, name, decimals, logo_uri, tags,
                price_usd, market_cap_usd, volume_24h_usd, volume_24h_change_pct,
                price_24h_change_pct, liquidity_usd, fdv_usd, rank, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(mint) DO UPDATE SET
                symbol = excluded.symbol,
                name = excluded.name,
                decimals = excluded.decimals,
                logo_uri = excluded.logo_uri,
                tags = excluded.tags,
                price_usd = excluded.price_usd,
                market_cap_usd = excluded.market_cap_usd,
                volume_24h_usd = excluded.volume_24h_usd,
                volume_24h_change_pct = excluded.volume_24h_change_pct,
                price_24h_change_pct = excluded.price_24h_change_pct,
                liquidity_usd = excluded.liquidity_usd,
                fdv_usd = excluded.fdv_usd,
                rank = excluded.rank,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&row.mint)
        .bind(&row.symbol)
        .bind(&row.name)
        .bind(row.decimals)
        .bind(&row.logo_uri)
        .bind(&row.tags)
        .bind(row.price_usd)
        .bind(row.market_cap_usd)
        .bind(row.volume_24h_usd)
        .bind(row.volume_24h_change_pct)
        .bind(row.price_24h_change_pct)
        .bind(row.liquidity_usd)
        .bind(row.fdv_usd)
        .bind(row.rank)
        .bind(row.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Upsert a batch of coins inside one transaction.
    pub async fn bulk_upsert(pool: &DbPool, coins: &[Coin]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for coin in coins {
            let row = CoinRow::from_coin(coin);

            sqlx::query(
                r#"
                INSERT INTO coins (mint, symbol, name, decimals, logo_uri, tags,
                    price_usd, market_cap_usd, volume_24h_usd, volume_24h_change_pct,
                    price_24h_change_pct, liquidity_usd, fdv_usd, rank, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(mint) DO UPDATE SET
                    symbol = excluded.symbol,
                    name = excluded.name,
                    decimals = excluded.decimals,
                    logo_uri = excluded.logo_uri,
                    tags = excluded.tags,
                    price_usd = excluded.price_usd,
                    market_cap_usd = excluded.market_cap_usd,
                    volume_24h_usd = excluded.volume_24h_usd,
                    volume_24h_change_pct = excluded.volume_24h_change_pct,
                    price_24h_change_pct = excluded.price_24h_change_pct,
                    liquidity_usd = excluded.liquidity_usd,
                    fdv_usd = excluded.fdv_usd,
                    rank = excluded.rank,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&row.mint)
            .bind(&row.symbol)
            .bind(&row.name)
            .bind(row.decimals)
            .bind(&row.logo_uri)
            .bind(&row.tags)
            .bind(row.price_usd)
            .bind(row.market_cap_usd)
            .bind(row.volume_24h_usd)
            .bind(row.volume_24h_change_pct)
            .bind(row.price_24h_change_pct)
            .bind(row.liquidity_usd)
            .bind(row.fdv_usd)
            .bind(row.rank)
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Delete a coin by mint. The core never calls this; external retention
    /// policies do.
    pub async fn delete(pool: &DbPool, mint: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM coins WHERE mint = ?")
            .bind(mint)
            .execute(pool)
            .await?;

        Ok(())
    }
}
