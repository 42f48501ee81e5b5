//! External cache seam and an in-process moka implementation
//!
//! The index service persists its serialized payload through
//! [`CacheStore`]. Hosts with a shared cache (Redis and friends) implement
//! the trait themselves; [`MokaCacheStore`] is the default in-process store
//! and honours the per-entry TTL passed to `set`.

use crate::error::CacheError;
use moka::future::Cache;
use moka::Expiry;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key/value store with per-entry TTL
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch value, `None` if missing or expired
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store value for `ttl`
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Remove value; missing keys are not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Whether a live value exists, without decoding it
    async fn has(&self, key: &str) -> Result<bool, CacheError>;
}

/// Stored value with the TTL it was written with
#[derive(Debug, Clone)]
struct CachedValue {
    value: Arc<Value>,
    ttl: Duration,
}

/// Expires each entry after the TTL given at write time
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// In-process cache store backed by `moka`
#[derive(Clone)]
pub struct MokaCacheStore {
    inner: Cache<String, CachedValue>,
}

impl MokaCacheStore {
    /// Create store with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }

    /// Drop every entry
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for MokaCacheStore {
    /// Create store with default capacity (1,024 entries)
    fn default() -> Self {
        Self::new(1_024)
    }
}

impl std::fmt::Debug for MokaCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheStore")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[async_trait::async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self
            .inner
            .get(key)
            .await
            .map(|cached| Value::clone(&cached.value)))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        self.inner
            .insert(
                key.to_string(),
                CachedValue {
                    value: Arc::new(value),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.inner.contains_key(key))
    }
}

/// Outcome of best-effort deletion of several keys
#[derive(Debug, Default)]
pub struct ClearReport {
    /// Keys deleted
    pub cleared: Vec<String>,
    /// Keys whose deletion failed, with the cause
    pub failed: Vec<(String, CacheError)>,
}

impl ClearReport {
    /// Whether every deletion succeeded
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
