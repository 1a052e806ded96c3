//! # Fleetbill Engine
//!
//! Ride billing: contract resolution, pluggable per-model cost strategies,
//! an active-contract cache, and batch reporting.
//!
//! ## Flow
//!
//! ```text
//! resolve(trip, tenant) -> normalize(rules) -> select(model) -> calculate
//! ```
//!
//! Every amount is rounded half-to-even to two decimal places as it is
//! computed. Tax is `round(base_cost * tax_rate)` and
//! `total = base_cost + tax + incentive`.

pub mod cache;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod service;
pub mod store;
pub mod strategy;

pub use cache::{ActiveContractCache, CacheStats};
pub use service::{BillingService, Standalone};
pub use store::{
    in_transaction, BillingStore, Connector, PoolConfig, PooledConnection, SqliteConnector,
    SqlitePool, SqliteStore,
};
pub use strategy::{BillingStrategy, StrategySelector, TaxPolicy};

use fleetbill_common::{DEFAULT_CONTRACT_CACHE_CAPACITY, DEFAULT_TAX_RATE};
use rust_decimal::Decimal;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tax applied to pre-tax trip cost
    pub tax_rate: Decimal,
    /// Tenants kept in the active-contract cache
    pub contract_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            contract_cache_capacity: DEFAULT_CONTRACT_CACHE_CAPACITY,
        }
    }
}
