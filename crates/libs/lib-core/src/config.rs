//! # Application Configuration
//!
//! Configuration loaded from environment variables and validated on startup
//! to fail fast if misconfigured.
//!
//! ## Global Config Access
//!
//! Use [`core_config()`] to access the global configuration instance:
//!
//! ```rust,no_run
//! use lib_core::config::core_config;
//!
//! let config = core_config();
//! let endpoint = &config.market_data_endpoint;
//! ```
//!
//! The config must be initialized once at application startup using
//! [`init_config()`].

use lib_utils::envs::{get_env, get_env_or, get_env_parse};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database connection URL
    pub database_url: String,

    /// Base URL for the chain JSON-RPC node
    pub chain_rpc_endpoint: String,

    /// Bearer token for the chain JSON-RPC node
    pub chain_rpc_api_key: String,

    /// Base URL for the market-data provider
    pub market_data_endpoint: String,

    /// Auth header value for the market-data provider
    pub market_data_api_key: String,

    /// Base URL for the swap aggregator
    pub aggregator_endpoint: String,

    /// Optional auth key for the swap aggregator
    pub aggregator_api_key: Option<String>,

    /// Period of the new-listing discovery loop
    pub new_listings_interval: Duration,

    /// Period of the trending refresh loop
    pub trending_interval: Duration,

    /// Period of the top-gainers refresh loop
    pub top_gainers_interval: Duration,

    /// Run a one-shot extra catalog seed pass at startup
    pub initial_catalog_seed: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = get_env_or("DATABASE_URL", "sqlite:data/portfolio.db");

        let chain_rpc_endpoint = get_env_or(
            "CHAIN_RPC_ENDPOINT",
            "https://api.mainnet-beta.solana.com",
        );

        let chain_rpc_api_key =
            get_env("CHAIN_RPC_API_KEY").map_err(|e| e.to_string())?;
        let market_data_endpoint =
            get_env("MARKET_DATA_ENDPOINT").map_err(|e| e.to_string())?;
        let market_data_api_key =
            get_env("MARKET_DATA_API_KEY").map_err(|e| e.to_string())?;
        let aggregator_endpoint =
            get_env("AGGREGATOR_ENDPOINT").map_err(|e| e.to_string())?;
        let aggregator_api_key = get_env("AGGREGATOR_API_KEY").ok();

        let new_listings_interval: u64 =
            get_env_parse("NEW_LISTINGS_INTERVAL_SECS").map_err(|e| e.to_string())?;
        let trending_interval: u64 =
            get_env_parse("TRENDING_INTERVAL_SECS").map_err(|e| e.to_string())?;
        let top_gainers_interval: u64 =
            get_env_parse("TOP_GAINERS_INTERVAL_SECS").map_err(|e| e.to_string())?;

        let initial_catalog_seed = get_env_or("INITIAL_CATALOG_SEED", "false")
            .parse()
            .map_err(|_| "INITIAL_CATALOG_SEED must be true or false".to_string())?;

        Ok(Self {
            database_url,
            chain_rpc_endpoint,
            chain_rpc_api_key,
            market_data_endpoint,
            market_data_api_key,
            aggregator_endpoint,
            aggregator_api_key,
            new_listings_interval: Duration::from_secs(new_listings_interval),
            trending_interval: Duration::from_secs(trending_interval),
            top_gainers_interval: Duration::from_secs(top_gainers_interval),
            initial_catalog_seed,
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        for (name, interval) in [
            ("NEW_LISTINGS_INTERVAL_SECS", self.new_listings_interval),
            ("TRENDING_INTERVAL_SECS", self.trending_interval),
            ("TOP_GAINERS_INTERVAL_SECS", self.top_gainers_interval),
        ] {
            if interval < Duration::from_secs(1) {
                return Err(format!("{name} must be at least 1 second"));
            }
        }

        if self.market_data_endpoint.trim().is_empty() {
            return Err("MARKET_DATA_ENDPOINT must not be empty".to_string());
        }
        if self.aggregator_endpoint.trim().is_empty() {
            return Err("AGGREGATOR_ENDPOINT must not be empty".to_string());
        }

        Ok(())
    }
}

/// Global configuration instance (initialized once at startup).
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initialize the global configuration.
///
/// Call once at application startup, before anything that reads config.
///
/// # Errors
///
/// Returns an error if environment variables are missing or invalid,
/// validation fails, or the config was already initialized.
pub fn init_config() -> Result<(), String> {
    let config = Config::from_env()?;
    config.validate()?;

    info!(
        new_listings_interval_secs = config.new_listings_interval.as_secs(),
        trending_interval_secs = config.trending_interval.as_secs(),
        top_gainers_interval_secs = config.top_gainers_interval.as_secs(),
        initial_catalog_seed = config.initial_catalog_seed,
        "configuration loaded"
    );

    CONFIG
        .set(config)
        .map_err(|_| "Config has already been initialized".to_string())
}

/// Get a reference to the global configuration.
///
/// # Panics
///
/// Panics if [`init_config()`] has not been called yet.
pub fn core_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Config must be initialized with init_config() before use")
}
