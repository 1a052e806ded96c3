//! Trip and contract context resolution
//!
//! Finds a trip, the contract version covering its start time, and the
//! derived attributes a strategy needs.

use crate::store::{rollback_quietly, BillingStore};
use chrono::Timelike;
use fleetbill_common::{BillingModelKind, ContractVersion, Result, TenantId, TripData, TripRecord};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

/// Everything needed to price one trip
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrip {
    pub trip: TripData,
    pub billing_model: BillingModelKind,
    /// Rule configuration as stored, not yet normalized
    pub raw_rules: Value,
}

/// Resolve a trip of a tenant
///
/// Any failure rolls back the transaction open on `conn` before it is
/// returned.
#[instrument(skip(conn), fields(tenant = %tenant))]
pub fn resolve<S>(conn: &mut S, tenant: &TenantId, trip_id: &str) -> Result<ResolvedTrip>
where
    S: BillingStore + ?Sized,
{
    match conn.find_trip_and_contract_version(tenant, trip_id) {
        Ok((record, version)) => Ok(build(&record, &version)),
        Err(err) => {
            debug!(error = %err, "Trip resolution failed");
            rollback_quietly(conn);
            Err(err)
        }
    }
}

/// Resolve an already loaded trip record without touching the transaction
///
/// Used by batch pricing, where one trip's failure must not affect the rest.
pub fn resolve_record<S>(conn: &S, tenant: &TenantId, record: &TripRecord) -> Result<ResolvedTrip>
where
    S: BillingStore + ?Sized,
{
    let version = conn.find_covering_version(tenant, record)?;
    Ok(build(record, &version))
}

fn build(record: &TripRecord, version: &ContractVersion) -> ResolvedTrip {
    ResolvedTrip {
        trip: trip_data(record),
        billing_model: version.kind(),
        raw_rules: version.rules_config.clone(),
    }
}

/// Derive strategy input from a stored trip
pub fn trip_data(record: &TripRecord) -> TripData {
    let duration_minutes = match (record.start_time, record.end_time) {
        (Some(start), Some(end)) => {
            Decimal::from((end - start).num_milliseconds()) / Decimal::from(60_000)
        }
        _ => Decimal::ZERO,
    };
    let start_hour = record.start_time.map_or(0, |start| start.hour());

    TripData::new(record.trip_id.clone(), record.distance_km)
        .with_duration_minutes(duration_minutes)
        .with_start_hour(start_hour)
        .with_vehicle_type(record.vehicle_type.clone())
        .with_carpool(record.is_carpool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use chrono::{TimeZone, Utc};
    use fleetbill_common::{BillingError, NewTrip, NotFoundError, VendorId};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn tenant() -> TenantId {
        TenantId::parse("c0000000-0000-0000-0000-000000000001").unwrap()
    }

    fn vendor() -> VendorId {
        VendorId::parse("a0000000-0000-0000-0000-000000000001").unwrap()
    }

    fn store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_contract("k1", &tenant(), &vendor(), "ACTIVE")
            .unwrap();
        store
            .insert_contract_version(&ContractVersion {
                version_id: "v1".into(),
                contract_id: "k1".into(),
                valid_from: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                valid_until: Some(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap()),
                billing_model: "per_trip".into(),
                rules_config: json!({ "base_fare": 40, "cost_per_km": 12 }),
            })
            .unwrap();
        let start = Utc.with_ymd_and_hms(2025, 11, 23, 22, 15, 0).unwrap();
        store
            .insert_trip(
                &NewTrip::new(tenant(), vendor(), dec!(10), start)
                    .with_trip_id("t1")
                    .with_end_time(Some(start + chrono::Duration::seconds(1530))),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_resolve_derives_attributes() {
        let mut store = store();
        let resolved = resolve(&mut store, &tenant(), "t1").unwrap();

        assert_eq!(resolved.billing_model, BillingModelKind::PerTrip);
        assert_eq!(resolved.trip.start_hour, 22);
        assert_eq!(resolved.trip.duration_minutes, dec!(25.5));
        assert_eq!(resolved.trip.distance_km, dec!(10));
        assert_eq!(resolved.raw_rules["base_fare"], 40);
    }

    #[test]
    fn test_missing_trip_rolls_back() {
        let mut store = store();
        store.begin().unwrap();

        let err = resolve(&mut store, &tenant(), "nope").unwrap_err();
        assert!(matches!(
            err,
            BillingError::NotFound(NotFoundError::Trip { .. })
        ));
        assert!(!store.is_in_transaction());
    }

    #[test]
    fn test_trip_outside_every_version() {
        let mut store = store();
        let start = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        store
            .insert_trip(&NewTrip::new(tenant(), vendor(), dec!(3), start).with_trip_id("t2"))
            .unwrap();

        let err = resolve(&mut store, &tenant(), "t2").unwrap_err();
        assert!(matches!(
            err,
            BillingError::NotFound(NotFoundError::CoveringVersion { .. })
        ));
    }

    #[test]
    fn test_missing_timestamps_default() {
        let record = TripRecord {
            trip_id: "t3".into(),
            tenant_id: tenant(),
            vendor_id: vendor(),
            distance_km: dec!(7),
            start_time: None,
            end_time: None,
            is_carpool: true,
            vehicle_type: "SUV".into(),
        };
        let trip = trip_data(&record);
        assert_eq!(trip.start_hour, 0);
        assert_eq!(trip.duration_minutes, Decimal::ZERO);
        assert!(trip.is_carpool);
        assert_eq!(trip.vehicle_type, "SUV");
    }
}
