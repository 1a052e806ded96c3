//! Fleetbill API server

use fleetbill_api::{build_router, ApiConfig, AppState};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("fleetbill_api=info,fleetbill_engine=info,tower_http=info")
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    let state = AppState::from_config(&config)?;
    info!(
        database = %config.database_path.display(),
        pool_size = config.pool_size,
        cache_capacity = config.contract_cache_capacity,
        "Billing engine ready"
    );

    let app = build_router(state);

    let addr = config.bind_addr();
    info!("Fleetbill API starting on {}", addr);
    info!("Endpoints: /health, /billing, /contracts, /trips, /metrics");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Fleetbill API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
