//! # Fleetbill API
//!
//! REST surface over the billing engine. The tenant of every billing
//! request comes from the `X-Client-ID` header.
//!
//! | Route | Operation |
//! |-------|-----------|
//! | `GET /health` | liveness |
//! | `GET /billing/:trip_id` | price one trip |
//! | `GET /billing/stats` | price every trip of the tenant |
//! | `GET /billing/export-csv` | same batch as a CSV attachment |
//! | `GET /contracts` | tenant's active contract |
//! | `POST /trips` | record a trip |
//! | `GET /metrics` | Prometheus counters |

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod tenant;

pub use config::ApiConfig;
pub use error::ApiError;
pub use state::AppState;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        // Static segments before the trip id capture
        .route("/billing/stats", get(routes::billing_stats))
        .route("/billing/export-csv", get(routes::export_csv))
        .route("/billing/:trip_id", get(routes::calculate_trip))
        .route("/contracts", get(routes::active_contract))
        .route("/trips", post(routes::create_trip))
        .route("/metrics", get(routes::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
