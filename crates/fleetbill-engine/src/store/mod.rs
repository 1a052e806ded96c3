//! Storage layer
//!
//! [`BillingStore`] is the transactional handle the engine is given. The
//! caller owns its lifetime; the engine only begins, commits, or rolls
//! back transactions on it.

mod pool;
mod sqlite;

pub use pool::{PoolConfig, PooledConnection, SqlitePool};
pub use sqlite::{SqliteConnector, SqliteStore};

use chrono::{DateTime, Utc};
use fleetbill_common::{
    BillingError, ContractRecord, ContractSummary, ContractVersion, ListedTrip, NewTrip,
    NotFoundError, Result, TenantId, TripRecord, VendorId,
};
use tracing::warn;

/// Storage operations needed by the billing engine
pub trait BillingStore {
    /// Trip belonging to the tenant, if any
    fn find_trip(&self, tenant: &TenantId, trip_id: &str) -> Result<Option<TripRecord>>;

    /// Contract linking tenant and vendor, with all of its versions
    fn find_contract(
        &self,
        tenant: &TenantId,
        vendor: &VendorId,
    ) -> Result<Option<ContractRecord>>;

    /// Contract version valid at `at`; most recent `valid_from` wins
    fn find_current_contract(
        &self,
        tenant: &TenantId,
        at: DateTime<Utc>,
    ) -> Result<Option<ContractSummary>>;

    /// Persist a new trip and return the stored row
    fn insert_trip(&mut self, trip: &NewTrip) -> Result<TripRecord>;

    /// All trips of a tenant, newest first
    ///
    /// Rows are decoded one by one; a row that cannot be decoded is
    /// listed as [`fleetbill_common::UnreadableTrip`] instead of failing the listing.
    fn list_trips(&self, tenant: &TenantId) -> Result<Vec<ListedTrip>>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Whether a transaction is open on this handle
    fn is_in_transaction(&self) -> bool;

    /// Trip plus the single contract version covering its start time
    fn find_trip_and_contract_version(
        &self,
        tenant: &TenantId,
        trip_id: &str,
    ) -> Result<(TripRecord, ContractVersion)> {
        let trip = self
            .find_trip(tenant, trip_id)?
            .ok_or_else(|| NotFoundError::Trip {
                trip_id: trip_id.to_string(),
            })?;

        let version = self.find_covering_version(tenant, &trip)?;
        Ok((trip, version))
    }

    /// Contract version covering a loaded trip's start time
    fn find_covering_version(
        &self,
        tenant: &TenantId,
        trip: &TripRecord,
    ) -> Result<ContractVersion> {
        let contract = self
            .find_contract(tenant, &trip.vendor_id)?
            .ok_or_else(|| NotFoundError::Contract {
                tenant_id: tenant.to_string(),
                vendor_id: trip.vendor_id.to_string(),
            })?;

        let version = trip
            .start_time
            .and_then(|start| covering_version(&contract.versions, start))
            .ok_or_else(|| NotFoundError::CoveringVersion {
                trip_id: trip.trip_id.clone(),
                contract_id: contract.contract_id.clone(),
            })?;
        Ok(version)
    }
}

/// Opens standalone connections
pub trait Connector {
    type Conn: BillingStore;

    fn connect(&self) -> Result<Self::Conn>;
}

/// Version covering `at`
///
/// Overlapping intervals are resolved to the latest `valid_from`, ties
/// broken by the greatest version id, and logged.
pub fn covering_version(
    versions: &[ContractVersion],
    at: DateTime<Utc>,
) -> Option<ContractVersion> {
    let mut matches: Vec<&ContractVersion> =
        versions.iter().filter(|v| v.covers(at)).collect();
    if matches.len() > 1 {
        let ids: Vec<&str> = matches.iter().map(|v| v.version_id.as_str()).collect();
        warn!(versions = ?ids, at = %at, "Overlapping contract versions");
    }
    matches.sort_by(|a, b| {
        a.valid_from
            .cmp(&b.valid_from)
            .then_with(|| a.version_id.cmp(&b.version_id))
    });
    matches.last().map(|v| (*v).clone())
}

/// Run `f` inside a transaction: commit on success, roll back on error
///
/// When a transaction is already open, `f` joins it and the outer caller
/// commits; an error still rolls the whole transaction back.
pub fn in_transaction<S, T, F>(conn: &mut S, f: F) -> Result<T>
where
    S: BillingStore + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    if conn.is_in_transaction() {
        let result = f(conn);
        if result.is_err() {
            rollback_quietly(conn);
        }
        return result;
    }

    conn.begin()?;
    match f(conn) {
        Ok(value) => match conn.commit() {
            Ok(()) => Ok(value),
            Err(err) => {
                rollback_quietly(conn);
                Err(err)
            }
        },
        Err(err) => {
            rollback_quietly(conn);
            Err(err)
        }
    }
}

/// Roll back an open transaction, logging instead of failing
pub fn rollback_quietly<S: BillingStore + ?Sized>(conn: &mut S) {
    if !conn.is_in_transaction() {
        return;
    }
    if let Err(err) = conn.rollback() {
        warn!(error = %err, "Rollback failed");
    }
}

/// Map a missing row to a storage error
pub(crate) fn expect_row<T>(row: Option<T>, what: &str) -> Result<T> {
    row.ok_or_else(|| BillingError::Storage(format!("{} was not returned", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn version(id: &str, from_month: u32, until_month: Option<u32>) -> ContractVersion {
        ContractVersion {
            version_id: id.into(),
            contract_id: "k1".into(),
            valid_from: Utc.with_ymd_and_hms(2025, from_month, 1, 0, 0, 0).unwrap(),
            valid_until: until_month
                .map(|m| Utc.with_ymd_and_hms(2025, m, 28, 23, 59, 59).unwrap()),
            billing_model: "HYBRID".into(),
            rules_config: serde_json::json!({}),
        }
    }

    #[test]
    fn test_covering_version_single_match() {
        let versions = vec![version("v1", 1, Some(3)), version("v2", 4, None)];
        let at = Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap();
        assert_eq!(covering_version(&versions, at).unwrap().version_id, "v1");

        let at = Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        assert_eq!(covering_version(&versions, at).unwrap().version_id, "v2");
    }

    #[test]
    fn test_covering_version_none_before_first() {
        let versions = vec![version("v1", 3, None)];
        let at = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        assert!(covering_version(&versions, at).is_none());
    }

    #[test]
    fn test_overlap_prefers_latest_valid_from() {
        let versions = vec![
            version("v2", 2, None),
            version("v1", 1, None),
            version("v3", 2, None),
        ];
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(covering_version(&versions, at).unwrap().version_id, "v3");
    }

    #[test]
    fn test_in_transaction_commits_and_rolls_back() {
        use fleetbill_common::{BillingError, NewTrip};
        use rust_decimal_macros::dec;

        let mut store = SqliteStore::open_in_memory().unwrap();
        let tenant = TenantId::new(uuid::Uuid::new_v4());
        let vendor = VendorId::new(uuid::Uuid::new_v4());
        let trip = |id: &str| NewTrip::new(tenant, vendor, dec!(1), Utc::now()).with_trip_id(id);

        in_transaction(&mut store, |conn| conn.insert_trip(&trip("kept"))).unwrap();
        let err = in_transaction(&mut store, |conn| {
            conn.insert_trip(&trip("dropped"))?;
            Err::<(), _>(BillingError::Internal("boom".into()))
        })
        .unwrap_err();

        assert!(matches!(err, BillingError::Internal(_)));
        assert!(!store.is_in_transaction());
        assert!(store.find_trip(&tenant, "kept").unwrap().is_some());
        assert!(store.find_trip(&tenant, "dropped").unwrap().is_none());
    }

    #[test]
    fn test_nested_transaction_joins_outer() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.begin().unwrap();
        in_transaction(&mut store, |conn| {
            assert!(conn.is_in_transaction());
            Ok(())
        })
        .unwrap();
        assert!(store.is_in_transaction());
        store.commit().unwrap();
    }
}
