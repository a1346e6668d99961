//! # Coin Catalog
//!
//! In-memory index of known tokens keyed by mint, plus the derived views
//! (trending, new listings, top gainers) the mobile client browses.
//!
//! One mutex guards both maps; all provider and store I/O happens outside
//! the lock. Upserts replace the whole coin snapshot, never individual
//! fields, so readers always observe a consistent single-snapshot coin.

use lib_core::error::{AppError, Result};
use lib_core::model::Coin;
use lib_core::model::store::CoinRepository;
use lib_core::DbPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

/// Named derived views over the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewName {
    Trending,
    New,
    TopGainers,
}

impl ViewName {
    pub const ALL: [ViewName; 3] = [ViewName::Trending, ViewName::New, ViewName::TopGainers];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "trending" => Some(ViewName::Trending),
            "new" => Some(ViewName::New),
            "top-gainers" => Some(ViewName::TopGainers),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewName::Trending => "trending",
            ViewName::New => "new",
            ViewName::TopGainers => "top-gainers",
        }
    }
}

impl std::fmt::Display for ViewName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
struct CatalogInner {
    by_mint: HashMap<String, Coin>,
    views: HashMap<ViewName, Vec<String>>,
}

/// Thread-safe coin catalog.
#[derive(Default)]
pub struct CoinCatalog {
    inner: Mutex<CatalogInner>,
}

impl CoinCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace a coin. Rejects empty mints: the catalog
    /// never holds a coin without identity.
    pub fn upsert(&self, coin: Coin) -> Result<()> {
        if coin.mint.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "coin mint must not be empty".to_string(),
            ));
        }

        let mut inner = self.inner.lock().expect("catalog lock poisoned");
        inner.by_mint.insert(coin.mint.clone(), coin);
        Ok(())
    }

    /// Upsert a batch of coins under a single lock acquisition.
    ///
    /// Empty-mint entries are skipped with a warning rather than aborting
    /// the batch; hydration chunks never fail as a whole on one bad row.
    /// Returns the number of coins written.
    pub fn upsert_batch(&self, coins: Vec<Coin>) -> usize {
        let mut inner = self.inner.lock().expect("catalog lock poisoned");
        let mut written = 0;

        for coin in coins {
            if coin.mint.trim().is_empty() {
                warn!("skipping catalog upsert with empty mint");
                continue;
            }
            inner.by_mint.insert(coin.mint.clone(), coin);
            written += 1;
        }

        written
    }

    pub fn get_by_mint(&self, mint: &str) -> Option<Coin> {
        let inner = self.inner.lock().expect("catalog lock poisoned");
        inner.by_mint.get(mint).cloned()
    }

    /// Resolve a set of mints. Missing entries are omitted, not errored.
    pub fn get_by_mints(&self, mints: &[String]) -> HashMap<String, Coin> {
        let inner = self.inner.lock().expect("catalog lock poisoned");
        mints
            .iter()
            .filter_map(|mint| {
                inner
                    .by_mint
                    .get(mint)
                    .map(|coin| (mint.clone(), coin.clone()))
            })
            .collect()
    }

    /// Resolve a view's mint list against the catalog at read time.
    ///
    /// Mints absent from the catalog are dropped silently; a view never
    /// surfaces an entry `get_by_mint` would miss.
    pub fn get_view(&self, view: ViewName) -> Vec<Coin> {
        let inner = self.inner.lock().expect("catalog lock poisoned");
        inner
            .views
            .get(&view)
            .map(|mints| {
                mints
                    .iter()
                    .filter_map(|mint| inner.by_mint.get(mint).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Atomically replace a view's ordering.
    pub fn replace_view(&self, view: ViewName, mints: Vec<String>) {
        let mut inner = self.inner.lock().expect("catalog lock poisoned");
        inner.views.insert(view, mints);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("catalog lock poisoned").by_mint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rehydrate the catalog from the durable store.
    ///
    /// Called once at startup before the enrichment loops begin; the loops
    /// tolerate an empty catalog, so a fresh database is fine.
    pub async fn load_from_store(&self, pool: &DbPool) -> Result<usize> {
        let coins = CoinRepository::list(pool).await?;
        let count = coins.len();

        let mut inner = self.inner.lock().expect("catalog lock poisoned");
        for coin in coins {
            inner.by_mint.insert(coin.mint.clone(), coin);
        }
        drop(inner);

        info!(count, "catalog rehydrated from store");
        Ok(count)
    }
}
