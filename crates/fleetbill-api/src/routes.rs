//! HTTP handlers
//!
//! Every handler that touches storage goes through [`AppState::run`], so a
//! request holds exactly one pooled connection and one transaction.

use crate::error::{ApiError, WithPath};
use crate::state::AppState;
use crate::tenant::ClientId;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Json};
use chrono::Utc;
use fleetbill_common::{
    parse_timestamp, BillingError, BillingRow, CalculationResult, ContractSummary, ErrorClass,
    NewTrip, TripRecord, VendorId, DEFAULT_VEHICLE_TYPE, VERSION,
};
use fleetbill_engine::report;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============ MODELS ============

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalculateQuery {
    /// Price the trip as if it were (or were not) a carpool
    pub carpool: Option<bool>,
}

/// Body of `POST /trips`
#[derive(Debug, Deserialize)]
pub struct TripInput {
    pub distance_km: Decimal,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    pub vendor_id: String,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub is_carpool: bool,
}

#[derive(Debug, Serialize)]
pub struct TripCreated {
    pub status: &'static str,
    #[serde(flatten)]
    pub trip: TripRecord,
}

// ============ HANDLERS ============

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "fleetbill".to_string(),
        version: VERSION.to_string(),
    })
}

pub async fn calculate_trip(
    State(state): State<AppState>,
    uri: Uri,
    ClientId(tenant): ClientId,
    Path(trip_id): Path<String>,
    Query(query): Query<CalculateQuery>,
) -> Result<Json<CalculationResult>, ApiError> {
    let result = state
        .run(move |service, conn| {
            service.calculate_trip_cost(conn, &tenant, &trip_id, query.carpool)
        })
        .await;

    match &result {
        Ok(calc) => state
            .metrics
            .record_calculation(calc.billing_model.as_str(), "success"),
        Err(err) => state.metrics.record_calculation("unknown", outcome(err)),
    }
    result.map(Json).at(uri.path())
}

pub async fn billing_stats(
    State(state): State<AppState>,
    uri: Uri,
    ClientId(tenant): ClientId,
) -> Result<Json<Vec<BillingRow>>, ApiError> {
    let rows = state
        .run(move |service, conn| service.get_client_billing_data(conn, &tenant))
        .await
        .at(uri.path())?;

    state.metrics.record_batch(&rows);
    Ok(Json(rows))
}

pub async fn export_csv(
    State(state): State<AppState>,
    uri: Uri,
    ClientId(tenant): ClientId,
) -> Result<impl IntoResponse, ApiError> {
    let csv = state
        .run(move |service, conn| service.generate_client_report(conn, &tenant))
        .await
        .at(uri.path())?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        report::report_filename(&tenant, Utc::now())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

pub async fn active_contract(
    State(state): State<AppState>,
    uri: Uri,
    ClientId(tenant): ClientId,
) -> Result<Json<ContractSummary>, ApiError> {
    state
        .run(move |service, conn| service.get_active_contract(conn, &tenant))
        .await
        .map(Json)
        .at(uri.path())
}

pub async fn create_trip(
    State(state): State<AppState>,
    uri: Uri,
    ClientId(tenant): ClientId,
    Json(input): Json<TripInput>,
) -> Result<(StatusCode, Json<TripCreated>), ApiError> {
    let trip = new_trip(tenant, input).at(uri.path())?;

    let record = state
        .run(move |service, conn| service.insert_new_trip(conn, trip))
        .await
        .at(uri.path())?;

    Ok((
        StatusCode::CREATED,
        Json(TripCreated {
            status: "created",
            trip: record,
        }),
    ))
}

pub async fn metrics(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|err| ApiError::new(BillingError::Internal(err.to_string()), uri.path()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

// ============ HELPERS ============

fn new_trip(
    tenant: fleetbill_common::TenantId,
    input: TripInput,
) -> fleetbill_common::Result<NewTrip> {
    let vendor = VendorId::parse(&input.vendor_id)?;
    let start = parse_timestamp(&input.start_time)?;
    let end = input.end_time.as_deref().map(parse_timestamp).transpose()?;
    let vehicle_type = input
        .vehicle_type
        .unwrap_or_else(|| DEFAULT_VEHICLE_TYPE.to_string());

    Ok(NewTrip::new(tenant, vendor, input.distance_km, start)
        .with_end_time(end)
        .with_carpool(input.is_carpool)
        .with_vehicle_type(vehicle_type))
}

fn outcome(err: &BillingError) -> &'static str {
    match err.class() {
        ErrorClass::NotFound => "not_found",
        ErrorClass::Validation => "invalid",
        ErrorClass::Internal => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> TripInput {
        TripInput {
            distance_km: dec!(12.5),
            start_time: "2025-03-01T22:00:00Z".into(),
            end_time: None,
            vendor_id: "a0000000-0000-0000-0000-000000000001".into(),
            vehicle_type: None,
            is_carpool: false,
        }
    }

    fn tenant() -> fleetbill_common::TenantId {
        fleetbill_common::TenantId::parse("c0000000-0000-0000-0000-000000000001").unwrap()
    }

    #[test]
    fn test_new_trip_defaults() {
        let trip = new_trip(tenant(), input()).unwrap();
        assert_eq!(trip.vehicle_type, DEFAULT_VEHICLE_TYPE);
        assert!(uuid::Uuid::parse_str(&trip.trip_id).is_ok());
        assert!(trip.end_time.is_none());
    }

    #[test]
    fn test_new_trip_rejects_bad_fields() {
        let mut bad_vendor = input();
        bad_vendor.vendor_id = "vendor-1".into();
        assert!(matches!(
            new_trip(tenant(), bad_vendor),
            Err(BillingError::Validation(_))
        ));

        let mut bad_time = input();
        bad_time.end_time = Some("yesterday".into());
        assert!(matches!(
            new_trip(tenant(), bad_time),
            Err(BillingError::Validation(_))
        ));
    }
}
