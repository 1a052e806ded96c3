//! Bounded SQLite connection pool
//!
//! A semaphore caps the number of connections handed out at once. The
//! [`PooledConnection`] guard returns its connection on drop, rolling back
//! any transaction the borrower left open. A connection whose rollback
//! fails is closed instead of being reused.

use super::{BillingStore, Connector, SqliteConnector, SqliteStore};
use fleetbill_common::{BillingError, Result};
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Pool sizing and timeouts
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum connections handed out at once
    pub max_size: usize,
    /// How long `acquire` waits for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

struct PoolInner {
    connector: SqliteConnector,
    semaphore: Arc<Semaphore>,
    idle: Mutex<Vec<SqliteStore>>,
    config: PoolConfig,
}

impl PoolInner {
    fn release(&self, mut conn: SqliteStore) {
        if conn.is_in_transaction() {
            if let Err(err) = conn.rollback() {
                warn!(error = %err, "Discarding pooled connection after failed rollback");
                return;
            }
            debug!("Rolled back transaction left open by borrower");
        }
        self.idle.lock().push(conn);
    }
}

/// Shared pool of [`SqliteStore`] connections
#[derive(Clone)]
pub struct SqlitePool {
    inner: Arc<PoolInner>,
}

impl SqlitePool {
    pub fn new(connector: SqliteConnector, config: PoolConfig) -> Self {
        let max_size = config.max_size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                connector,
                semaphore: Arc::new(Semaphore::new(max_size)),
                idle: Mutex::new(Vec::with_capacity(max_size)),
                config: PoolConfig { max_size, ..config },
            }),
        }
    }

    /// Borrow a connection, waiting at most the configured acquire timeout
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let timeout = self.inner.config.acquire_timeout;
        let permit = tokio::time::timeout(timeout, self.inner.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| {
                BillingError::Timeout(format!(
                    "No database connection available within {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|_| BillingError::Internal("Connection pool is closed".into()))?;

        let idle = self.inner.idle.lock().pop();
        let conn = match idle {
            Some(conn) => conn,
            None => self.inner.connector.connect()?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: self.inner.clone(),
            _permit: permit,
        })
    }

    /// Connections currently idle in the pool
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().len()
    }

    /// Connections that can still be borrowed right now
    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    pub fn max_size(&self) -> usize {
        self.inner.config.max_size
    }

    /// Connector used to open new connections
    pub fn connector(&self) -> &SqliteConnector {
        &self.inner.connector
    }
}

impl std::fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePool")
            .field("path", &self.inner.connector.path())
            .field("max_size", &self.inner.config.max_size)
            .field("available", &self.available())
            .finish()
    }
}

/// Borrowed connection, returned to the pool on drop
pub struct PooledConnection {
    conn: Option<SqliteStore>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("held", &self.conn.is_some())
            .finish()
    }
}

impl Deref for PooledConnection {
    type Target = SqliteStore;

    fn deref(&self) -> &SqliteStore {
        // Only taken in Drop
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut SqliteStore {
        self.conn.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fleetbill_common::{NewTrip, TenantId, VendorId};
    use rust_decimal_macros::dec;

    fn pool(dir: &tempfile::TempDir, max_size: usize) -> SqlitePool {
        let connector = SqliteConnector::new(dir.path().join("pool.db"), Duration::from_secs(1));
        SqlitePool::new(
            connector,
            PoolConfig {
                max_size,
                acquire_timeout: Duration::from_millis(50),
            },
        )
    }

    #[tokio::test]
    async fn test_connection_reused_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(&dir, 2);

        let conn = pool.acquire().await.unwrap();
        assert_eq!(pool.available(), 1);
        drop(conn);

        assert_eq!(pool.available(), 2);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_acquire_times_out_when_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(&dir, 1);

        let _held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, BillingError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_open_transaction_rolled_back_on_release() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(&dir, 1);
        let tenant = TenantId::new(uuid::Uuid::new_v4());
        let vendor = VendorId::new(uuid::Uuid::new_v4());

        {
            let mut conn = pool.acquire().await.unwrap();
            conn.begin().unwrap();
            conn.insert_trip(
                &NewTrip::new(tenant, vendor, dec!(4), Utc::now()).with_trip_id("dirty"),
            )
            .unwrap();
        }

        let conn = pool.acquire().await.unwrap();
        assert!(!conn.is_in_transaction());
        assert!(conn.find_trip(&tenant, "dirty").unwrap().is_none());
    }
}
