//! # Database Store
//!
//! Database connection pool, schema bootstrap, and repository
//! implementations for the entities the core persists.

// region: --- Modules
pub mod coin_repository;
pub mod filter;
pub mod models;
pub mod naughty_word_repository;
pub mod stat_repository;
// endregion: --- Modules

// region: --- Re-exports
pub use coin_repository::CoinRepository;
pub use filter::{Filter, FilterValue, ListOptions};
pub use naughty_word_repository::NaughtyWordRepository;
pub use stat_repository::ApiStatRepository;
// endregion: --- Re-exports

// region: --- Types and Functions
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Type alias for SQLite connection pool.
pub type DbPool = SqlitePool;

/// Create a new SQLite connection pool for the given database URL.
pub async fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    debug!(database_url, "sqlite pool connected");

    Ok(pool)
}

/// Create the tables the core persists to, when missing.
pub async fn init_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coins (
            mint TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            name TEXT NOT NULL,
            decimals INTEGER NOT NULL,
            logo_uri TEXT,
            tags TEXT NOT NULL,
            price_usd REAL NOT NULL,
            market_cap_usd REAL NOT NULL,
            volume_24h_usd REAL NOT NULL,
            volume_24h_change_pct REAL NOT NULL,
            price_24h_change_pct REAL NOT NULL,
            liquidity_usd REAL NOT NULL,
            fdv_usd REAL NOT NULL,
            rank INTEGER NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_stats (
            service_name TEXT NOT NULL,
            endpoint_name TEXT NOT NULL,
            date TEXT NOT NULL,
            count INTEGER NOT NULL,
            PRIMARY KEY (service_name, endpoint_name, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS naughty_words (
            word TEXT PRIMARY KEY,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    debug!("store schema ensured");
    Ok(())
}

/// Run a closure inside a transaction, committing on success and rolling
/// back on error.
///
/// The core's own paths are transaction-free; this primitive exists for
/// collaborators that need multi-statement atomicity.
pub async fn with_transaction<T, F>(pool: &DbPool, f: F) -> Result<T, sqlx::Error>
where
    F: for<'t> FnOnce(
        &'t mut Transaction<'static, Sqlite>,
    ) -> Pin<Box<dyn Future<Output = Result<T, sqlx::Error>> + Send + 't>>,
{
    let mut tx = pool.begin().await?;
    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(err)
        }
    }
}
// endregion: --- Types and Functions
