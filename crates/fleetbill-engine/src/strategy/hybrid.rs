//! Hybrid model: night-shift surcharge plus a per-km rate

use super::{finish, is_night_shift, product, sum, BillingStrategy, TaxPolicy};
use fleetbill_common::{
    round_money, BillingModelKind, Breakdown, CalculationResult, LineItem, Result, RuleConfig,
    TripData,
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default)]
pub struct HybridStrategy {
    tax: TaxPolicy,
}

impl HybridStrategy {
    pub fn new(tax: TaxPolicy) -> Self {
        Self { tax }
    }
}

impl BillingStrategy for HybridStrategy {
    fn kind(&self) -> BillingModelKind {
        BillingModelKind::Hybrid
    }

    fn calculate(&self, trip: &TripData, rules: &RuleConfig) -> Result<CalculationResult> {
        let mut breakdown = Breakdown::new();

        let surcharge = if is_night_shift(trip.start_hour) {
            round_money(rules.night_shift_surcharge)
        } else {
            breakdown.insert("note".into(), LineItem::from("Not a night shift trip"));
            round_money(Decimal::ZERO)
        };
        let distance_cost = product(
            trip.distance_km,
            rules.per_km_rate_after_limit,
            "distance_cost",
        )
        .map(round_money)?;

        breakdown.insert("night_shift_surcharge".into(), surcharge.into());
        breakdown.insert("distance_cost".into(), distance_cost.into());
        breakdown.insert("rate_per_km".into(), rules.per_km_rate_after_limit.into());

        let base_cost = sum(surcharge, distance_cost, "base_cost").map(round_money)?;
        let tax_amount = self.tax.tax_on(base_cost)?;
        finish(self.kind(), trip, rules, base_cost, tax_amount, breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetbill_common::CARPOOL_BONUS;
    use rust_decimal_macros::dec;

    fn rules() -> RuleConfig {
        RuleConfig {
            night_shift_surcharge: dec!(20),
            per_km_rate_after_limit: dec!(5),
            ..RuleConfig::default()
        }
    }

    #[test]
    fn test_night_trip() {
        let trip = TripData::new("t1", dec!(10)).with_start_hour(22);
        let result = HybridStrategy::default().calculate(&trip, &rules()).unwrap();

        assert_eq!(result.billing_model, BillingModelKind::Hybrid);
        assert_eq!(result.base_cost, dec!(70.00));
        assert_eq!(result.tax_amount, dec!(12.60));
        assert_eq!(result.total_cost, dec!(82.60));
        assert_eq!(result.employee_incentive, Decimal::ZERO);
        assert!(result.incentive_breakdown.is_none());
        assert_eq!(
            result.breakdown.get("night_shift_surcharge"),
            Some(&LineItem::Amount(dec!(20.00)))
        );
        assert!(result.breakdown.get("note").is_none());
    }

    #[test]
    fn test_night_carpool_trip() {
        let trip = TripData::new("t1", dec!(10))
            .with_start_hour(22)
            .with_carpool(true);
        let rules = rules().with_incentive(CARPOOL_BONUS, dec!(50));
        let result = HybridStrategy::default().calculate(&trip, &rules).unwrap();

        assert_eq!(result.employee_incentive, dec!(50.00));
        assert_eq!(result.total_cost, dec!(132.60));
        assert_eq!(
            result
                .incentive_breakdown
                .as_ref()
                .and_then(|b| b.get(CARPOOL_BONUS).copied()),
            Some(dec!(50.00))
        );
    }

    #[test]
    fn test_day_trip_has_no_surcharge() {
        let trip = TripData::new("t1", dec!(10)).with_start_hour(14);
        let result = HybridStrategy::default().calculate(&trip, &rules()).unwrap();

        assert_eq!(result.base_cost, dec!(50.00));
        assert_eq!(result.tax_amount, dec!(9.00));
        assert_eq!(
            result.breakdown.get("note"),
            Some(&LineItem::Note("Not a night shift trip".into()))
        );
    }

    #[test]
    fn test_distance_overflow_is_an_error() {
        let huge = Decimal::from_i128_with_scale(10i128.pow(20), 0);
        let trip = TripData::new("huge", huge).with_start_hour(22);
        let rules = RuleConfig {
            per_km_rate_after_limit: Decimal::from(10_000_000_000i64),
            ..rules()
        };
        let result = HybridStrategy::default().calculate(&trip, &rules);
        assert!(matches!(
            result,
            Err(fleetbill_common::BillingError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_rules_price_zero() {
        let trip = TripData::new("t1", dec!(42)).with_start_hour(23);
        let result = HybridStrategy::default().calculate(&trip, &RuleConfig::default()).unwrap();
        assert_eq!(result.base_cost, Decimal::ZERO);
        assert_eq!(result.total_cost, Decimal::ZERO);
    }
}
