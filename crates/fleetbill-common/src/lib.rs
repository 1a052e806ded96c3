//! # Fleetbill Common
//!
//! Shared types and errors for the Fleetbill ride-billing engine.
//!
//! ## Core Types
//!
//! - [`TenantId`]/[`VendorId`]: validated UUID identifiers
//! - [`TripRecord`]/[`TripData`]/[`NewTrip`]: stored, normalized, and incoming trips
//! - [`ContractVersion`]/[`ContractSummary`]: time-bounded contract rules
//! - [`RuleConfig`]: normalized billing rules
//! - [`CalculationResult`]/[`BillingRow`]: priced trips and batch rows

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{BillingError, ErrorClass, NotFoundError, Result};
pub use types::{
    calculation::{BillingRow, Breakdown, CalculationResult, LineItem, RowStatus},
    contract::{
        BillingModelKind, ContractRecord, ContractSummary, ContractVersion, RuleConfig,
        CARPOOL_BONUS, DEFAULT_CURRENCY,
    },
    ids::{validate_trip_id, TenantId, VendorId},
    money::{parse_decimal, parse_timestamp, round_money},
    trip::{ListedTrip, NewTrip, TripData, TripRecord, UnreadableTrip, DEFAULT_VEHICLE_TYPE},
};

/// Fleetbill version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tax rate applied to pre-tax trip cost (18%)
pub const DEFAULT_TAX_RATE: rust_decimal::Decimal =
    rust_decimal::Decimal::from_parts(18, 0, 0, false, 2);

/// Default capacity of the active-contract cache
pub const DEFAULT_CONTRACT_CACHE_CAPACITY: usize = 128;

/// First hour (inclusive) of the night shift
pub const NIGHT_SHIFT_START_HOUR: u32 = 20;

/// Hour (exclusive) at which the night shift ends
pub const NIGHT_SHIFT_END_HOUR: u32 = 6;
