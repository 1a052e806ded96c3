//! Billing strategies
//!
//! One cost algorithm per [`BillingModelKind`]. Every strategy shares the
//! same finishing steps: tax on the pre-tax cost, the carpool incentive,
//! and a total rounded to two decimal places.

mod fixed_package;
mod hybrid;
mod per_trip;
mod selector;

pub use fixed_package::FixedPackageStrategy;
pub use hybrid::HybridStrategy;
pub use per_trip::PerTripStrategy;
pub use selector::StrategySelector;

use fleetbill_common::{
    round_money, BillingError, BillingModelKind, Breakdown, CalculationResult, Result,
    RuleConfig, TripData, CARPOOL_BONUS, DEFAULT_TAX_RATE,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Cost-calculation algorithm for one billing model
pub trait BillingStrategy: Send + Sync {
    /// Billing model this strategy prices
    fn kind(&self) -> BillingModelKind;

    /// Price a trip under the given rules. Pure and deterministic.
    ///
    /// Fails with a validation error when an amount exceeds the decimal
    /// range.
    fn calculate(&self, trip: &TripData, rules: &RuleConfig) -> Result<CalculationResult>;
}

/// Tax applied to pre-tax trip cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxPolicy {
    rate: Decimal,
}

impl TaxPolicy {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Tax owed on an already rounded base cost
    pub fn tax_on(&self, base_cost: Decimal) -> Result<Decimal> {
        product(base_cost, self.rate, "tax_amount").map(round_money)
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TAX_RATE)
    }
}

/// Whether the hour falls in the 20:00-06:00 night shift
pub fn is_night_shift(start_hour: u32) -> bool {
    start_hour >= fleetbill_common::NIGHT_SHIFT_START_HOUR
        || start_hour < fleetbill_common::NIGHT_SHIFT_END_HOUR
}

/// `a * b`, or a validation error naming `what` on overflow
pub(crate) fn product(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(what))
}

/// `a + b`, or a validation error naming `what` on overflow
pub(crate) fn sum(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

fn overflow(what: &str) -> BillingError {
    BillingError::Validation(format!("{} is out of range", what))
}

/// Incentives owed for a trip, if any apply
fn incentives_for(trip: &TripData, rules: &RuleConfig) -> Option<BTreeMap<String, Decimal>> {
    if !trip.is_carpool {
        return None;
    }
    let bonus = rules.incentive(CARPOOL_BONUS)?;
    let mut applied = BTreeMap::new();
    applied.insert(CARPOOL_BONUS.to_string(), round_money(bonus));
    Some(applied)
}

/// Assemble the final result from a strategy's pre-tax figures
///
/// `base_cost` and `tax_amount` must already be rounded.
fn finish(
    kind: BillingModelKind,
    trip: &TripData,
    rules: &RuleConfig,
    base_cost: Decimal,
    tax_amount: Decimal,
    breakdown: Breakdown,
) -> Result<CalculationResult> {
    let incentive_breakdown = incentives_for(trip, rules);
    let employee_incentive = incentive_breakdown
        .iter()
        .flat_map(|applied| applied.values())
        .try_fold(Decimal::ZERO, |acc, amount| {
            sum(acc, *amount, "employee_incentive")
        })
        .map(round_money)?;

    let total_cost = sum(base_cost, tax_amount, "total_cost")
        .and_then(|subtotal| sum(subtotal, employee_incentive, "total_cost"))
        .map(round_money)?;

    Ok(CalculationResult {
        trip_id: trip.trip_id.clone(),
        billing_model: kind,
        base_cost,
        tax_amount,
        total_cost,
        breakdown,
        employee_incentive,
        incentive_breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tax_policy_default_rate() {
        let tax = TaxPolicy::default();
        assert_eq!(tax.rate(), dec!(0.18));
        assert_eq!(tax.tax_on(dec!(70.00)).unwrap(), dec!(12.60));
        assert_eq!(tax.tax_on(Decimal::ZERO).unwrap(), dec!(0.00));
    }

    #[test]
    fn test_tax_policy_rounds() {
        let tax = TaxPolicy::new(dec!(0.05));
        // 0.125 rounds half to even
        assert_eq!(tax.tax_on(dec!(2.50)).unwrap(), dec!(0.12));
    }

    #[test]
    fn test_tax_overflow_is_an_error() {
        let tax = TaxPolicy::new(dec!(10));
        assert!(matches!(
            tax.tax_on(Decimal::MAX),
            Err(BillingError::Validation(_))
        ));
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let trip = TripData::new("t1", dec!(1)).with_carpool(true);
        let rules = RuleConfig::default().with_incentive(CARPOOL_BONUS, Decimal::MAX);
        let result = finish(
            BillingModelKind::Hybrid,
            &trip,
            &rules,
            dec!(10.00),
            dec!(1.80),
            Breakdown::new(),
        );
        assert!(matches!(result, Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_night_shift_window() {
        assert!(is_night_shift(20));
        assert!(is_night_shift(23));
        assert!(is_night_shift(0));
        assert!(is_night_shift(5));
        assert!(!is_night_shift(6));
        assert!(!is_night_shift(19));
    }

    #[test]
    fn test_incentive_requires_carpool_and_rule() {
        let rules = RuleConfig::default().with_incentive(CARPOOL_BONUS, dec!(50));
        let solo = TripData::new("t1", dec!(1));
        assert!(incentives_for(&solo, &rules).is_none());

        let shared = solo.with_carpool(true);
        assert!(incentives_for(&shared, &RuleConfig::default()).is_none());
        assert_eq!(
            incentives_for(&shared, &rules).and_then(|m| m.get(CARPOOL_BONUS).copied()),
            Some(dec!(50.00))
        );
    }
}
