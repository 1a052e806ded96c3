//! Money and timestamp helpers
//!
//! Every monetary amount leaves the engine rounded half-to-even to two
//! decimal places and rescaled so it always prints with two digits.

use crate::error::{BillingError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimal places kept on monetary amounts
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to two decimal places
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp(MONEY_SCALE);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Parse a decimal from its textual storage form
pub fn parse_decimal(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| BillingError::Validation(format!("Invalid decimal value: {}", raw)))
}

/// Convert a JSON number into a decimal, keeping its textual digits
pub fn decimal_from_json_number(number: &serde_json::Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| number.as_f64().and_then(Decimal::from_f64))
}

/// Parse an ISO 8601 timestamp; values without an offset are taken as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(BillingError::Validation(format!(
        "Invalid timestamp (expected ISO 8601): {}",
        raw
    )))
}
