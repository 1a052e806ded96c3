//! Billing service
//!
//! Orchestrates resolve -> normalize -> select -> calculate. Request-path
//! methods run on a connection the caller owns and never consult the
//! contract cache. [`Standalone`] opens a connection per call and is the
//! only path that serves contracts from the cache.

use crate::cache::{ActiveContractCache, CacheStats};
use crate::report;
use crate::resolver::{self, ResolvedTrip};
use crate::rules;
use crate::store::{in_transaction, rollback_quietly, BillingStore, Connector};
use crate::strategy::{StrategySelector, TaxPolicy};
use crate::EngineConfig;
use chrono::Utc;
use fleetbill_common::{
    BillingRow, CalculationResult, ContractSummary, NewTrip, NotFoundError, Result, TenantId,
    TripRecord,
};
use tracing::{info, instrument, warn};

/// Billing engine facade
#[derive(Debug)]
pub struct BillingService {
    selector: StrategySelector,
    cache: ActiveContractCache,
}

impl BillingService {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(
            StrategySelector::new(TaxPolicy::new(config.tax_rate)),
            ActiveContractCache::new(config.contract_cache_capacity),
        )
    }

    /// Service over an explicit selector and cache
    pub fn with_parts(selector: StrategySelector, cache: ActiveContractCache) -> Self {
        Self { selector, cache }
    }

    pub fn selector(&self) -> &StrategySelector {
        &self.selector
    }

    /// Price one trip of a tenant
    ///
    /// `carpool_override` replaces the stored carpool flag for this
    /// calculation only.
    #[instrument(skip(self, conn), fields(tenant = %tenant))]
    pub fn calculate_trip_cost<S>(
        &self,
        conn: &mut S,
        tenant: &TenantId,
        trip_id: &str,
        carpool_override: Option<bool>,
    ) -> Result<CalculationResult>
    where
        S: BillingStore + ?Sized,
    {
        let mut resolved = resolver::resolve(conn, tenant, trip_id)?;
        if let Some(is_carpool) = carpool_override {
            resolved.trip = resolved.trip.with_carpool(is_carpool);
        }
        self.price(&resolved)
    }

    /// Normalize rules, pick the strategy, and price a resolved trip
    pub fn price(&self, resolved: &ResolvedTrip) -> Result<CalculationResult> {
        let rules = rules::normalize(&resolved.raw_rules);
        self.selector
            .select(resolved.billing_model)
            .calculate(&resolved.trip, &rules)
    }

    /// Tenant's current contract, always read from storage
    #[instrument(skip(self, conn), fields(tenant = %tenant))]
    pub fn get_active_contract<S>(
        &self,
        conn: &mut S,
        tenant: &TenantId,
    ) -> Result<ContractSummary>
    where
        S: BillingStore + ?Sized,
    {
        let found = fetch_active_contract(conn, tenant);
        or_rollback(conn, found)
    }

    /// Validate and persist a completed trip
    #[instrument(
        skip(self, conn, trip),
        fields(tenant = %trip.tenant_id, trip_id = %trip.trip_id)
    )]
    pub fn insert_new_trip<S>(&self, conn: &mut S, trip: NewTrip) -> Result<TripRecord>
    where
        S: BillingStore + ?Sized,
    {
        trip.validate()?;
        let record = in_transaction(conn, |conn| conn.insert_trip(&trip))?;
        info!("Trip recorded");
        Ok(record)
    }

    /// Price every trip of a tenant, newest first
    ///
    /// A trip that fails to decode or price becomes an error row; only
    /// failing to list the trips fails the batch.
    #[instrument(skip(self, conn), fields(tenant = %tenant))]
    pub fn get_client_billing_data<S>(
        &self,
        conn: &mut S,
        tenant: &TenantId,
    ) -> Result<Vec<BillingRow>>
    where
        S: BillingStore + ?Sized,
    {
        let listed = conn.list_trips(tenant);
        let trips = or_rollback(conn, listed)?;

        let rows: Vec<BillingRow> = trips
            .iter()
            .map(|listed| match listed {
                Ok(trip) => self.price_row(&*conn, tenant, trip),
                Err(unreadable) => {
                    warn!(
                        trip_id = %unreadable.trip_id,
                        error = %unreadable.reason,
                        "Trip could not be read"
                    );
                    BillingRow::unreadable(unreadable)
                }
            })
            .collect();

        let failed = rows.iter().filter(|row| !row.is_success()).count();
        info!(trips = rows.len(), failed, "Billing batch priced");
        Ok(rows)
    }

    fn price_row<S>(&self, conn: &S, tenant: &TenantId, trip: &TripRecord) -> BillingRow
    where
        S: BillingStore + ?Sized,
    {
        let priced = resolver::resolve_record(conn, tenant, trip)
            .and_then(|resolved| self.price(&resolved));
        match priced {
            Ok(result) => BillingRow::success(trip, &result),
            Err(err) => {
                warn!(trip_id = %trip.trip_id, error = %err, "Trip could not be priced");
                BillingRow::error(trip, err.to_string())
            }
        }
    }

    /// CSV report of a tenant's billing batch
    #[instrument(skip(self, conn), fields(tenant = %tenant))]
    pub fn generate_client_report<S>(&self, conn: &mut S, tenant: &TenantId) -> Result<Vec<u8>>
    where
        S: BillingStore + ?Sized,
    {
        let rows = self.get_client_billing_data(conn, tenant)?;
        let csv = report::write_csv(&rows);
        info!(rows = rows.len(), bytes = csv.len(), "Billing report generated");
        Ok(csv)
    }

    /// Operations that open their own connection per call
    pub fn standalone<'a, C: Connector>(&'a self, connector: &'a C) -> Standalone<'a, C> {
        Standalone {
            service: self,
            connector,
        }
    }

    /// Forget one tenant's cached contract
    pub fn invalidate_contract(&self, tenant: &TenantId) -> bool {
        self.cache.invalidate(tenant)
    }

    /// Forget every cached contract
    pub fn clear_contract_cache(&self) {
        self.cache.clear();
    }

    pub fn contract_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for BillingService {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Billing operations on connections opened from a [`Connector`]
///
/// Each call opens a connection and closes it before returning.
pub struct Standalone<'a, C> {
    service: &'a BillingService,
    connector: &'a C,
}

impl<'a, C: Connector> Standalone<'a, C> {
    pub fn calculate_trip_cost(
        &self,
        tenant: &TenantId,
        trip_id: &str,
        carpool_override: Option<bool>,
    ) -> Result<CalculationResult> {
        let mut conn = self.connector.connect()?;
        self.service
            .calculate_trip_cost(&mut conn, tenant, trip_id, carpool_override)
    }

    /// Tenant's current contract, served from the cache when present
    pub fn get_active_contract(&self, tenant: &TenantId) -> Result<ContractSummary> {
        self.service.cache.get_or_fetch(tenant, |tenant| {
            let conn = self.connector.connect()?;
            fetch_active_contract(&conn, tenant)
        })
    }

    pub fn insert_new_trip(&self, trip: NewTrip) -> Result<TripRecord> {
        let mut conn = self.connector.connect()?;
        self.service.insert_new_trip(&mut conn, trip)
    }

    pub fn get_client_billing_data(&self, tenant: &TenantId) -> Result<Vec<BillingRow>> {
        let mut conn = self.connector.connect()?;
        self.service.get_client_billing_data(&mut conn, tenant)
    }

    pub fn generate_client_report(&self, tenant: &TenantId) -> Result<Vec<u8>> {
        let mut conn = self.connector.connect()?;
        self.service.generate_client_report(&mut conn, tenant)
    }
}

fn fetch_active_contract<S>(conn: &S, tenant: &TenantId) -> Result<ContractSummary>
where
    S: BillingStore + ?Sized,
{
    conn.find_current_contract(tenant, Utc::now())?
        .ok_or_else(|| {
            NotFoundError::ActiveContract {
                tenant_id: tenant.to_string(),
            }
            .into()
        })
}

/// Roll back the open transaction when `result` is an error
fn or_rollback<S, T>(conn: &mut S, result: Result<T>) -> Result<T>
where
    S: BillingStore + ?Sized,
{
    if result.is_err() {
        rollback_quietly(conn);
    }
    result
}
