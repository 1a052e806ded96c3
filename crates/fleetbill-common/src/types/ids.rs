//! Tenant and vendor identifiers
//!
//! Both are UUIDs on the wire. Parsing rejects anything else with a
//! validation error so malformed ids never reach storage.

use crate::error::{BillingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum accepted length of an opaque trip identifier
pub const MAX_TRIP_ID_LEN: usize = 128;

/// Client organization identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse a tenant id, rejecting non-UUID input
    pub fn parse(raw: &str) -> Result<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| BillingError::Validation(format!("Invalid client ID: {}", raw)))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Ride vendor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(Uuid);

impl VendorId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse a vendor id, rejecting non-UUID input
    pub fn parse(raw: &str) -> Result<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| BillingError::Validation(format!("Invalid vendor ID: {}", raw)))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VendorId {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Check an opaque trip id before it is used as a lookup key
pub fn validate_trip_id(trip_id: &str) -> Result<()> {
    if trip_id.trim().is_empty() {
        return Err(BillingError::Validation("trip_id is required".into()));
    }
    if trip_id.len() > MAX_TRIP_ID_LEN {
        return Err(BillingError::Validation(format!(
            "trip_id exceeds {} characters",
            MAX_TRIP_ID_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[test]
    fn test_tenant_id_roundtrip() {
        let raw = "c0000000-0000-0000-0000-000000000001";
        let tenant = TenantId::parse(raw).unwrap();
        assert_eq!(tenant.to_string(), raw);
    }

    #[test]
    fn test_malformed_ids_are_validation_errors() {
        let err = TenantId::parse("not-a-uuid").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);

        let err = VendorId::parse("").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_trip_id_validation() {
        assert!(validate_trip_id("d0001").is_ok());
        assert!(validate_trip_id("   ").is_err());
        assert!(validate_trip_id(&"x".repeat(MAX_TRIP_ID_LEN + 1)).is_err());
    }
}
