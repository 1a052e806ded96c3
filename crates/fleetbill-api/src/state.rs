//! Shared application state

use crate::config::ApiConfig;
use crate::metrics::Metrics;
use fleetbill_common::{BillingError, Result};
use fleetbill_engine::{
    in_transaction, BillingService, Connector, SqliteConnector, SqlitePool, SqliteStore,
};
use std::sync::Arc;

/// State handed to every handler
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: Arc<BillingService>,
    pub pool: SqlitePool,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Build the service, migrate the database, and open the pool
    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let connector = SqliteConnector::new(&config.database_path, config.busy_timeout());
        // Fail fast on an unreachable database and apply the schema once
        connector.connect()?;

        Ok(Self {
            service: Arc::new(BillingService::new(config.engine())),
            pool: SqlitePool::new(connector, config.pool()),
            metrics: Arc::new(Metrics::new()?),
        })
    }

    /// Run storage work on one pooled connection inside a transaction
    ///
    /// The work runs on the blocking thread pool. The connection goes back
    /// to the pool when the closure returns, whatever the outcome.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&BillingService, &mut SqliteStore) -> Result<T> + Send + 'static,
    {
        let mut conn = self.pool.acquire().await?;
        let service = Arc::clone(&self.service);

        tokio::task::spawn_blocking(move || {
            in_transaction(&mut *conn, |conn| f(service.as_ref(), conn))
        })
        .await
        .map_err(|err| BillingError::Internal(format!("Storage task failed: {}", err)))?
    }
}
