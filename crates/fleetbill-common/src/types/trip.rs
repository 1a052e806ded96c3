//! Trip types
//!
//! [`TripRecord`] is what storage holds, [`TripData`] is the immutable
//! view a billing strategy prices, and [`NewTrip`] is a completed ride
//! about to be logged.

use super::ids::{TenantId, VendorId};
use crate::error::{BillingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Vehicle type assumed when storage has none
pub const DEFAULT_VEHICLE_TYPE: &str = "Standard";

/// Normalized trip attributes consumed by billing strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripData {
    /// Opaque trip identifier
    pub trip_id: String,
    /// Distance travelled in km (never negative)
    pub distance_km: Decimal,
    /// End minus start in minutes, zero when either is missing
    pub duration_minutes: Decimal,
    /// Hour of day (0-23) the trip started, zero when unknown
    pub start_hour: u32,
    /// Vehicle class
    pub vehicle_type: String,
    /// Whether the ride was shared
    pub is_carpool: bool,
}

impl TripData {
    /// Create trip data with defaults for everything but id and distance
    pub fn new(trip_id: impl Into<String>, distance_km: Decimal) -> Self {
        Self {
            trip_id: trip_id.into(),
            distance_km: distance_km.max(Decimal::ZERO),
            duration_minutes: Decimal::ZERO,
            start_hour: 0,
            vehicle_type: DEFAULT_VEHICLE_TYPE.to_string(),
            is_carpool: false,
        }
    }

    /// Set duration
    pub fn with_duration_minutes(mut self, minutes: Decimal) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// Set start hour, wrapped into 0-23
    pub fn with_start_hour(mut self, hour: u32) -> Self {
        self.start_hour = hour % 24;
        self
    }

    /// Set vehicle type
    pub fn with_vehicle_type(mut self, vehicle_type: impl Into<String>) -> Self {
        self.vehicle_type = vehicle_type.into();
        self
    }

    /// Set the carpool flag (also used for caller-supplied overrides)
    pub fn with_carpool(mut self, is_carpool: bool) -> Self {
        self.is_carpool = is_carpool;
        self
    }
}

/// Trip row as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecord {
    pub trip_id: String,
    pub tenant_id: TenantId,
    pub vendor_id: VendorId,
    pub distance_km: Decimal,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_carpool: bool,
    pub vehicle_type: String,
}

/// A completed ride to be logged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrip {
    pub trip_id: String,
    pub tenant_id: TenantId,
    pub vendor_id: VendorId,
    pub distance_km: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_carpool: bool,
    pub vehicle_type: String,
}

/// Stored trip row whose fields could not be decoded
///
/// Keeps whatever could still be read so the row can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableTrip {
    pub trip_id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub distance_km: Option<Decimal>,
    pub reason: String,
}

/// One row of a tenant's trip listing
pub type ListedTrip = std::result::Result<TripRecord, UnreadableTrip>;

impl NewTrip {
    /// Create a new trip with a fresh UUID v4 id
    pub fn new(
        tenant_id: TenantId,
        vendor_id: VendorId,
        distance_km: Decimal,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            trip_id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            vendor_id,
            distance_km,
            start_time,
            end_time: None,
            is_carpool: false,
            vehicle_type: DEFAULT_VEHICLE_TYPE.to_string(),
        }
    }

    /// Set an explicit trip id
    pub fn with_trip_id(mut self, trip_id: impl Into<String>) -> Self {
        self.trip_id = trip_id.into();
        self
    }

    /// Set end time
    pub fn with_end_time(mut self, end_time: Option<DateTime<Utc>>) -> Self {
        self.end_time = end_time;
        self
    }

    /// Set carpool flag
    pub fn with_carpool(mut self, is_carpool: bool) -> Self {
        self.is_carpool = is_carpool;
        self
    }

    /// Set vehicle type
    pub fn with_vehicle_type(mut self, vehicle_type: impl Into<String>) -> Self {
        self.vehicle_type = vehicle_type.into();
        self
    }

    /// Validate the trip
    pub fn validate(&self) -> Result<()> {
        super::ids::validate_trip_id(&self.trip_id)?;
        if self.distance_km < Decimal::ZERO {
            return Err(BillingError::Validation(
                "distance_km cannot be negative".into(),
            ));
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(BillingError::Validation(
                    "end_time cannot be before start_time".into(),
                ));
            }
        }
        if self.vehicle_type.trim().is_empty() {
            return Err(BillingError::Validation("vehicle_type cannot be empty".into()));
        }
        Ok(())
    }
}
