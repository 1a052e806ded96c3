//! Fleetbill API configuration

use anyhow::{Context, Result};
use fleetbill_common::{DEFAULT_CONTRACT_CACHE_CAPACITY, DEFAULT_TAX_RATE};
use fleetbill_engine::{EngineConfig, PoolConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// API service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Service host
    pub host: String,
    /// Service port
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Pooled connections
    pub pool_size: usize,
    /// How long a request waits for a pooled connection
    pub pool_acquire_timeout_ms: u64,
    /// How long SQLite waits on a locked database
    pub busy_timeout_ms: u64,
    /// Tenants kept in the active-contract cache
    pub contract_cache_capacity: usize,
    /// Tax applied to pre-tax trip cost
    pub tax_rate: Decimal,
    /// Emit logs as JSON
    pub json_logs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: PathBuf::from("fleetbill.db"),
            pool_size: 5,
            pool_acquire_timeout_ms: 5_000,
            busy_timeout_ms: 5_000,
            contract_cache_capacity: DEFAULT_CONTRACT_CACHE_CAPACITY,
            tax_rate: DEFAULT_TAX_RATE,
            json_logs: false,
        }
    }
}

impl ApiConfig {
    /// Load configuration from the environment (and `.env` if present)
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        // Plain PORT (set by most hosting platforms) takes priority
        if let Some(port) = lookup("PORT") {
            cfg.port = parse("PORT", &port)?;
        }

        if let Some(host) = lookup("FLEETBILL_HOST") {
            cfg.host = host;
        }
        if let Some(port) = lookup("FLEETBILL_PORT") {
            if lookup("PORT").is_none() {
                cfg.port = parse("FLEETBILL_PORT", &port)?;
            }
        }
        if let Some(path) = lookup("FLEETBILL_DATABASE_PATH") {
            cfg.database_path = PathBuf::from(path);
        }
        if let Some(val) = lookup("FLEETBILL_POOL_SIZE") {
            cfg.pool_size = parse("FLEETBILL_POOL_SIZE", &val)?;
        }
        if let Some(val) = lookup("FLEETBILL_POOL_ACQUIRE_TIMEOUT_MS") {
            cfg.pool_acquire_timeout_ms = parse("FLEETBILL_POOL_ACQUIRE_TIMEOUT_MS", &val)?;
        }
        if let Some(val) = lookup("FLEETBILL_BUSY_TIMEOUT_MS") {
            cfg.busy_timeout_ms = parse("FLEETBILL_BUSY_TIMEOUT_MS", &val)?;
        }
        if let Some(val) = lookup("FLEETBILL_CONTRACT_CACHE_CAPACITY") {
            cfg.contract_cache_capacity = parse("FLEETBILL_CONTRACT_CACHE_CAPACITY", &val)?;
        }
        if let Some(val) = lookup("FLEETBILL_TAX_RATE") {
            cfg.tax_rate = parse("FLEETBILL_TAX_RATE", &val)?;
        }
        if let Some(val) = lookup("FLEETBILL_JSON_LOGS") {
            cfg.json_logs = matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            anyhow::bail!("FLEETBILL_POOL_SIZE must be at least 1");
        }
        if self.tax_rate < Decimal::ZERO {
            anyhow::bail!("FLEETBILL_TAX_RATE cannot be negative");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            tax_rate: self.tax_rate,
            contract_cache_capacity: self.contract_cache_capacity,
        }
    }

    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            max_size: self.pool_size,
            acquire_timeout: Duration::from_millis(self.pool_acquire_timeout_ms),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {}", key, raw))
}
