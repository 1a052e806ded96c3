//! Calculation results and batch report rows

use super::contract::BillingModelKind;
use super::trip::{TripRecord, UnreadableTrip};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Single audit line in a cost breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineItem {
    Amount(Decimal),
    Note(String),
}

impl From<Decimal> for LineItem {
    fn from(amount: Decimal) -> Self {
        LineItem::Amount(amount)
    }
}

impl From<&str> for LineItem {
    fn from(note: &str) -> Self {
        LineItem::Note(note.to_string())
    }
}

/// Named line items, ordered by name
pub type Breakdown = BTreeMap<String, LineItem>;

/// Priced trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub trip_id: String,
    pub billing_model: BillingModelKind,
    /// Pre-tax cost
    pub base_cost: Decimal,
    /// Tax on `base_cost`
    pub tax_amount: Decimal,
    /// `base_cost + tax_amount + employee_incentive`
    pub total_cost: Decimal,
    /// Audit trail of the calculation
    pub breakdown: Breakdown,
    /// Amount owed to the party delivering the ride
    pub employee_incentive: Decimal,
    /// Named incentive amounts making up `employee_incentive`
    pub incentive_breakdown: Option<BTreeMap<String, Decimal>>,
}

/// Outcome of pricing one trip inside a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    Success,
    Error,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Success => "SUCCESS",
            RowStatus::Error => "ERROR",
        }
    }
}

/// One trip of a tenant's billing batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRow {
    pub trip_id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub distance_km: Option<Decimal>,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_model: Option<BillingModelKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_incentive: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BillingRow {
    /// Row for a trip that priced successfully
    pub fn success(trip: &TripRecord, result: &CalculationResult) -> Self {
        Self {
            trip_id: trip.trip_id.clone(),
            start_time: trip.start_time,
            end_time: trip.end_time,
            distance_km: Some(trip.distance_km),
            status: RowStatus::Success,
            billing_model: Some(result.billing_model),
            base_cost: Some(result.base_cost),
            tax_amount: Some(result.tax_amount),
            total_cost: Some(result.total_cost),
            employee_incentive: Some(result.employee_incentive),
            error: None,
        }
    }

    /// Row for a trip that failed to price
    pub fn error(trip: &TripRecord, message: impl Into<String>) -> Self {
        Self {
            trip_id: trip.trip_id.clone(),
            start_time: trip.start_time,
            end_time: trip.end_time,
            distance_km: Some(trip.distance_km),
            status: RowStatus::Error,
            billing_model: None,
            base_cost: None,
            tax_amount: None,
            total_cost: None,
            employee_incentive: None,
            error: Some(message.into()),
        }
    }

    /// Row for a stored trip that could not be decoded
    pub fn unreadable(trip: &UnreadableTrip) -> Self {
        Self {
            trip_id: trip.trip_id.clone(),
            start_time: trip.start_time,
            end_time: trip.end_time,
            distance_km: trip.distance_km,
            status: RowStatus::Error,
            billing_model: None,
            base_cost: None,
            tax_amount: None,
            total_cost: None,
            employee_incentive: None,
            error: Some(trip.reason.clone()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RowStatus::Success
    }
}
