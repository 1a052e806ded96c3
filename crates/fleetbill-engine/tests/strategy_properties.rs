//! Property tests for the billing strategies
//!
//! 1. Zero distance with no surcharge and no incentive costs nothing
//! 2. Fixed-package trips never carry base cost or tax
//! 3. Total is the rounded sum of base, tax, and incentive
//! 4. Tax is exactly round(base * 0.18)
//! 5. Identical input yields identical output
//! 6. Out-of-range amounts are errors, never panics
//! 7. Any stored tag resolves to a strategy without failing

use fleetbill_common::{
    round_money, BillingError, BillingModelKind, RuleConfig, TripData, CARPOOL_BONUS,
};
use fleetbill_engine::{BillingStrategy, StrategySelector};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Strategies ──────────────────────────────────────────────────────────

/// Amount in cents up to 10 000.00
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Distance in metres up to 500 km
fn distance() -> impl Strategy<Value = Decimal> {
    (0i64..500_000).prop_map(|metres| Decimal::new(metres, 3))
}

fn kind() -> impl Strategy<Value = BillingModelKind> {
    prop_oneof![
        Just(BillingModelKind::PerTrip),
        Just(BillingModelKind::FixedPackage),
        Just(BillingModelKind::Hybrid),
    ]
}

fn trip() -> impl Strategy<Value = TripData> {
    (distance(), 0u32..24, any::<bool>()).prop_map(|(km, hour, carpool)| {
        TripData::new("prop", km)
            .with_start_hour(hour)
            .with_carpool(carpool)
    })
}

fn rules() -> impl Strategy<Value = RuleConfig> {
    (
        amount(),
        amount(),
        amount(),
        amount(),
        amount(),
        proptest::option::of(amount()),
    )
        .prop_map(|(surcharge, rate, fare, per_km, package, bonus)| {
            let rules = RuleConfig {
                night_shift_surcharge: surcharge,
                per_km_rate_after_limit: rate,
                base_fare: fare,
                cost_per_km: per_km,
                package_price: package,
                ..RuleConfig::default()
            };
            match bonus {
                Some(bonus) => rules.with_incentive(CARPOOL_BONUS, bonus),
                None => rules,
            }
        })
}

proptest! {
    #[test]
    fn zero_distance_costs_nothing(hour in 0u32..24) {
        let selector = StrategySelector::default();
        let trip = TripData::new("prop", Decimal::ZERO).with_start_hour(hour);
        for kind in [BillingModelKind::Hybrid, BillingModelKind::PerTrip] {
            let result = selector.select(kind).calculate(&trip, &RuleConfig {
                per_km_rate_after_limit: dec!(7.5),
                cost_per_km: dec!(12),
                ..RuleConfig::default()
            }).unwrap();
            prop_assert_eq!(result.base_cost, Decimal::ZERO);
            prop_assert_eq!(result.tax_amount, Decimal::ZERO);
        }
    }

    #[test]
    fn fixed_package_has_no_base_or_tax(trip in trip(), rules in rules()) {
        let result = StrategySelector::default()
            .select(BillingModelKind::FixedPackage)
            .calculate(&trip, &rules)
            .unwrap();
        prop_assert_eq!(result.base_cost, Decimal::ZERO);
        prop_assert_eq!(result.tax_amount, Decimal::ZERO);
        prop_assert_eq!(result.total_cost, result.employee_incentive);
    }

    #[test]
    fn total_is_rounded_sum(kind in kind(), trip in trip(), rules in rules()) {
        let result = StrategySelector::default().select(kind).calculate(&trip, &rules).unwrap();
        prop_assert_eq!(
            result.total_cost,
            round_money(result.base_cost + result.tax_amount + result.employee_incentive)
        );
        prop_assert_eq!(result.base_cost, round_money(result.base_cost));
        prop_assert!(result.base_cost >= Decimal::ZERO);
    }

    #[test]
    fn tax_is_eighteen_percent_of_base(trip in trip(), rules in rules()) {
        let selector = StrategySelector::default();
        for kind in [BillingModelKind::Hybrid, BillingModelKind::PerTrip] {
            let result = selector.select(kind).calculate(&trip, &rules).unwrap();
            prop_assert_eq!(result.tax_amount, round_money(result.base_cost * dec!(0.18)));
        }
    }

    #[test]
    fn calculation_is_deterministic(kind in kind(), trip in trip(), rules in rules()) {
        let strategy = StrategySelector::default().select(kind);
        prop_assert_eq!(
            strategy.calculate(&trip, &rules).unwrap(),
            strategy.calculate(&trip, &rules).unwrap()
        );
    }

    #[test]
    fn incentive_only_for_carpool(kind in kind(), trip in trip(), rules in rules()) {
        let result = StrategySelector::default().select(kind).calculate(&trip, &rules).unwrap();
        if !trip.is_carpool || rules.incentive(CARPOOL_BONUS).is_none() {
            prop_assert_eq!(result.employee_incentive, Decimal::ZERO);
            prop_assert!(result.incentive_breakdown.is_none());
        } else {
            prop_assert_eq!(
                result.employee_incentive,
                round_money(rules.incentive(CARPOOL_BONUS).unwrap_or_default())
            );
        }
    }

    #[test]
    fn out_of_range_amounts_fail_instead_of_panicking(kind in kind(), hour in 0u32..24) {
        let huge = Decimal::from_i128_with_scale(10i128.pow(20), 0);
        let trip = TripData::new("prop", huge).with_start_hour(hour);
        let rules = RuleConfig {
            per_km_rate_after_limit: Decimal::from(10_000_000_000i64),
            cost_per_km: Decimal::from(10_000_000_000i64),
            ..RuleConfig::default()
        };
        let result = StrategySelector::default().select(kind).calculate(&trip, &rules);
        match kind {
            BillingModelKind::FixedPackage => prop_assert!(result.is_ok()),
            _ => prop_assert!(matches!(result, Err(BillingError::Validation(_)))),
        }
    }

    #[test]
    fn any_tag_resolves(tag in "\\PC{0,16}") {
        let kind = BillingModelKind::from_tag(&tag);
        let strategy = StrategySelector::default().select(kind);
        prop_assert_eq!(strategy.kind(), kind);
    }
}
