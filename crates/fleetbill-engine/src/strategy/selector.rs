//! Billing model to strategy mapping

use super::{
    BillingStrategy, FixedPackageStrategy, HybridStrategy, PerTripStrategy, TaxPolicy,
};
use fleetbill_common::BillingModelKind;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Registry of strategies keyed by billing model
#[derive(Clone)]
pub struct StrategySelector {
    strategies: HashMap<BillingModelKind, Arc<dyn BillingStrategy>>,
    fallback: Arc<dyn BillingStrategy>,
}

impl StrategySelector {
    /// Selector with all built-in strategies sharing one tax policy
    pub fn new(tax: TaxPolicy) -> Self {
        let hybrid: Arc<dyn BillingStrategy> = Arc::new(HybridStrategy::new(tax));
        let mut selector = Self::empty(hybrid.clone());
        selector.register(hybrid);
        selector.register(Arc::new(PerTripStrategy::new(tax)));
        selector.register(Arc::new(FixedPackageStrategy::new()));
        selector
    }

    /// Selector with no registered strategies, only a fallback
    pub fn empty(fallback: Arc<dyn BillingStrategy>) -> Self {
        Self {
            strategies: HashMap::new(),
            fallback,
        }
    }

    /// Register (or replace) the strategy for its billing model
    pub fn register(&mut self, strategy: Arc<dyn BillingStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    /// Strategy for a billing model, falling back to hybrid pricing
    pub fn select(&self, kind: BillingModelKind) -> Arc<dyn BillingStrategy> {
        match self.strategies.get(&kind) {
            Some(strategy) => strategy.clone(),
            None => {
                warn!(billing_model = %kind, "No strategy registered, using fallback");
                self.fallback.clone()
            }
        }
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::new(TaxPolicy::default())
    }
}

impl std::fmt::Debug for StrategySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.strategies.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("StrategySelector")
            .field("strategies", &kinds)
            .field("fallback", &self.fallback.kind())
            .finish()
    }
}
