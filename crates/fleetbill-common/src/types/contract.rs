//! Contract types
//!
//! A contract links one tenant to one vendor and carries time-bounded
//! versions. Each version embeds a billing-model tag and a free-form
//! rule configuration that the engine normalizes into [`RuleConfig`].

use super::ids::{TenantId, VendorId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Incentive key paid out for shared rides
pub const CARPOOL_BONUS: &str = "carpool_bonus";

/// Currency assumed when a contract does not name one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Cost-calculation algorithm selected by a contract version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingModelKind {
    /// Base fare plus a per-km rate
    PerTrip,
    /// Trip covered by a pre-paid package
    FixedPackage,
    /// Night-shift surcharge plus a per-km rate
    Hybrid,
}

impl BillingModelKind {
    /// All variants, in declaration order
    pub const ALL: [BillingModelKind; 3] = [
        BillingModelKind::PerTrip,
        BillingModelKind::FixedPackage,
        BillingModelKind::Hybrid,
    ];

    /// Map a stored tag to a kind; unknown tags fall back to `Hybrid`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "PER_TRIP" => BillingModelKind::PerTrip,
            "FIXED_PACKAGE" => BillingModelKind::FixedPackage,
            _ => BillingModelKind::Hybrid,
        }
    }

    /// Canonical tag
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingModelKind::PerTrip => "PER_TRIP",
            BillingModelKind::FixedPackage => "FIXED_PACKAGE",
            BillingModelKind::Hybrid => "HYBRID",
        }
    }
}

impl fmt::Display for BillingModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized billing rules with every recognized field present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub currency: String,

    // Hybrid model
    pub base_monthly_fee: Decimal,
    pub free_km_included: Decimal,
    pub night_shift_surcharge: Decimal,
    pub per_km_rate_after_limit: Decimal,

    // Per-trip and fixed-package models
    pub base_fare: Decimal,
    pub cost_per_km: Decimal,
    pub cost_per_minute: Decimal,
    pub min_fare: Decimal,
    pub package_price: Decimal,
    pub included_km: Decimal,
    pub overage_per_km: Decimal,

    /// Named incentive amounts, e.g. `carpool_bonus`
    pub incentive_rules: Option<BTreeMap<String, Decimal>>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            base_monthly_fee: Decimal::ZERO,
            free_km_included: Decimal::ZERO,
            night_shift_surcharge: Decimal::ZERO,
            per_km_rate_after_limit: Decimal::ZERO,
            base_fare: Decimal::ZERO,
            cost_per_km: Decimal::ZERO,
            cost_per_minute: Decimal::ZERO,
            min_fare: Decimal::ZERO,
            package_price: Decimal::ZERO,
            included_km: Decimal::ZERO,
            overage_per_km: Decimal::ZERO,
            incentive_rules: None,
        }
    }
}

impl RuleConfig {
    /// Look up a named incentive amount
    pub fn incentive(&self, name: &str) -> Option<Decimal> {
        self.incentive_rules
            .as_ref()
            .and_then(|rules| rules.get(name).copied())
    }

    /// Attach an incentive amount
    pub fn with_incentive(mut self, name: impl Into<String>, amount: Decimal) -> Self {
        self.incentive_rules
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), amount);
        self
    }
}

/// Time-bounded snapshot of a contract's rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractVersion {
    pub version_id: String,
    pub contract_id: String,
    pub valid_from: DateTime<Utc>,
    /// `None` means open-ended
    pub valid_until: Option<DateTime<Utc>>,
    /// Raw billing-model tag as stored
    pub billing_model: String,
    /// Raw rule configuration as stored
    pub rules_config: serde_json::Value,
}

impl ContractVersion {
    /// Whether `at` falls inside `[valid_from, valid_until]`, both ends inclusive
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        at >= self.valid_from && self.valid_until.map_or(true, |until| at <= until)
    }

    /// Billing model selected by this version
    pub fn kind(&self) -> BillingModelKind {
        BillingModelKind::from_tag(&self.billing_model)
    }
}

/// Contract between a tenant and a vendor, with all of its versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract_id: String,
    pub tenant_id: TenantId,
    pub vendor_id: VendorId,
    pub status: String,
    pub versions: Vec<ContractVersion>,
}

/// Currently valid contract of a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub contract_id: String,
    pub vendor_id: VendorId,
    /// Upper-cased billing-model tag
    pub billing_model: String,
    pub rules_config: serde_json::Value,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl ContractSummary {
    /// Billing model selected by this contract
    pub fn kind(&self) -> BillingModelKind {
        BillingModelKind::from_tag(&self.billing_model)
    }
}
