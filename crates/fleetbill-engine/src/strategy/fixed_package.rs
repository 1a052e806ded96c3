//! Fixed-package model: trips are covered by a monthly fee billed elsewhere

use super::{finish, BillingStrategy};
use fleetbill_common::{
    round_money, BillingModelKind, Breakdown, CalculationResult, LineItem, Result, RuleConfig,
    TripData,
};
use rust_decimal::Decimal;

/// Prices every trip at zero; only incentives are owed per trip
#[derive(Debug, Clone, Default)]
pub struct FixedPackageStrategy;

impl FixedPackageStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl BillingStrategy for FixedPackageStrategy {
    fn kind(&self) -> BillingModelKind {
        BillingModelKind::FixedPackage
    }

    fn calculate(&self, trip: &TripData, rules: &RuleConfig) -> Result<CalculationResult> {
        let mut breakdown = Breakdown::new();
        breakdown.insert("note".into(), LineItem::from("Covered by Monthly Fixed Fee"));
        breakdown.insert(
            "monthly_fee_reference".into(),
            round_money(rules.package_price).into(),
        );
        breakdown.insert("km_consumed".into(), trip.distance_km.into());

        let zero = round_money(Decimal::ZERO);
        finish(self.kind(), trip, rules, zero, zero, breakdown)
    }
}
