//! Rule configuration normalizer
//!
//! Contracts store their rules as an arbitrary JSON object. Only the
//! recognized keys are copied into a [`RuleConfig`]; unknown keys are
//! dropped and missing or unreadable values take the field default.

use fleetbill_common::types::money::decimal_from_json_number;
use fleetbill_common::RuleConfig;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

/// Build a [`RuleConfig`] from a raw attribute bag. Never fails.
pub fn normalize(raw: &Value) -> RuleConfig {
    let Some(bag) = raw.as_object() else {
        if !raw.is_null() {
            debug!("Rule configuration is not an object, using defaults");
        }
        return RuleConfig::default();
    };

    let defaults = RuleConfig::default();
    RuleConfig {
        currency: bag
            .get("currency")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(defaults.currency),
        base_monthly_fee: amount(bag, "base_monthly_fee"),
        free_km_included: amount(bag, "free_km_included"),
        night_shift_surcharge: amount(bag, "night_shift_surcharge"),
        per_km_rate_after_limit: amount(bag, "per_km_rate_after_limit"),
        base_fare: amount(bag, "base_fare"),
        cost_per_km: amount(bag, "cost_per_km"),
        cost_per_minute: amount(bag, "cost_per_minute"),
        min_fare: amount(bag, "min_fare"),
        package_price: amount(bag, "package_price"),
        included_km: amount(bag, "included_km"),
        overage_per_km: amount(bag, "overage_per_km"),
        incentive_rules: bag.get("incentive_rules").and_then(incentives),
    }
}

/// Numeric field, zero when absent or unreadable
fn amount(bag: &Map<String, Value>, key: &str) -> Decimal {
    match bag.get(key) {
        None | Some(Value::Null) => Decimal::ZERO,
        Some(value) => as_decimal(value).unwrap_or_else(|| {
            debug!(key, "Ignoring non-numeric rule value");
            Decimal::ZERO
        }),
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => decimal_from_json_number(n),
        // rust_decimal serializes as a string
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn incentives(value: &Value) -> Option<BTreeMap<String, Decimal>> {
    let rules = value.as_object()?;
    Some(
        rules
            .iter()
            .filter_map(|(name, amount)| as_decimal(amount).map(|a| (name.clone(), a)))
            .collect(),
    )
}
