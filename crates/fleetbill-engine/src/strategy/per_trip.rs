//! Per-trip model: base fare plus a per-km rate

use super::{finish, product, sum, BillingStrategy, TaxPolicy};
use fleetbill_common::{
    round_money, BillingModelKind, Breakdown, CalculationResult, Result, RuleConfig, TripData,
};

#[derive(Debug, Clone, Default)]
pub struct PerTripStrategy {
    tax: TaxPolicy,
}

impl PerTripStrategy {
    pub fn new(tax: TaxPolicy) -> Self {
        Self { tax }
    }
}

impl BillingStrategy for PerTripStrategy {
    fn kind(&self) -> BillingModelKind {
        BillingModelKind::PerTrip
    }

    fn calculate(&self, trip: &TripData, rules: &RuleConfig) -> Result<CalculationResult> {
        let base_fare = round_money(rules.base_fare);
        let distance_cost =
            product(trip.distance_km, rules.cost_per_km, "distance_cost").map(round_money)?;

        let mut breakdown = Breakdown::new();
        breakdown.insert("base_fare".into(), base_fare.into());
        breakdown.insert("distance_cost".into(), distance_cost.into());
        breakdown.insert("rate_per_km".into(), rules.cost_per_km.into());

        let base_cost = sum(base_fare, distance_cost, "base_cost").map(round_money)?;
        let tax_amount = self.tax.tax_on(base_cost)?;
        finish(self.kind(), trip, rules, base_cost, tax_amount, breakdown)
    }
}
