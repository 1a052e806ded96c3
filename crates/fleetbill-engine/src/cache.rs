//! Active-contract cache
//!
//! Bounded LRU keyed by tenant. Read-through: a miss runs the supplied
//! fetch and stores its result. Hits are served without any freshness
//! check, so entries live until evicted, invalidated, or the process
//! exits.

use fleetbill_common::{ContractSummary, Result, TenantId, DEFAULT_CONTRACT_CACHE_CAPACITY};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Process-wide cache of each tenant's current contract
pub struct ActiveContractCache {
    entries: Mutex<LruCache<TenantId, ContractSummary>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ActiveContractCache {
    /// Cache holding at most `capacity` tenants (minimum one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached contract for `tenant`, fetching and storing it on a miss
    ///
    /// The lock is not held while `fetch` runs, so two concurrent misses
    /// for one tenant may both fetch; the last insert wins. Failed fetches
    /// are not cached.
    #[instrument(skip(self, fetch), fields(tenant = %tenant))]
    pub fn get_or_fetch<F>(&self, tenant: &TenantId, fetch: F) -> Result<ContractSummary>
    where
        F: FnOnce(&TenantId) -> Result<ContractSummary>,
    {
        if let Some(hit) = self.entries.lock().get(tenant).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Contract cache hit");
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Contract cache miss");
        let fetched = fetch(tenant)?;
        self.entries.lock().put(*tenant, fetched.clone());
        Ok(fetched)
    }

    /// Cached contract without fetching or touching recency
    pub fn peek(&self, tenant: &TenantId) -> Option<ContractSummary> {
        self.entries.lock().peek(tenant).cloned()
    }

    /// Drop one tenant's entry
    pub fn invalidate(&self, tenant: &TenantId) -> bool {
        self.entries.lock().pop(tenant).is_some()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}

impl Default for ActiveContractCache {
    fn default() -> Self {
        Self::new(DEFAULT_CONTRACT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for ActiveContractCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveContractCache")
            .field("stats", &self.stats())
            .finish()
    }
}
