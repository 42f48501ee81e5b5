//! Index service: owns the current index, persists it, answers lookups
//!
//! The current index lives in a single `Arc<ScenarioIndex>` slot. Builds
//! produce a fresh index and replace the slot wholesale; readers clone the
//! `Arc` and never observe a half-built index.
//!
//! # Lookup order
//!
//! ```text
//! memory slot ──miss──► CacheStore::get ──miss──► Ok(None)
//!                            │
//!                            └─hit─► decode (corrupt = error) ─► memory slot
//! ```

use crate::cache::{CacheStore, ClearReport};
use crate::config::IndexConfig;
use crate::error::{CacheError, IndexResult};
use crate::index::{IndexStats, ScenarioIndex};
use crate::types::{ContentItem, ScenarioIndexEntry, SourceType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Owner of the in-memory index and its cached copy
pub struct ScenarioIndexService {
    cache: Arc<dyn CacheStore>,
    config: IndexConfig,
    current: RwLock<Option<Arc<ScenarioIndex>>>,
}

impl ScenarioIndexService {
    /// Create service over a cache store
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>, config: IndexConfig) -> Self {
        Self {
            cache,
            config,
            current: RwLock::new(None),
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Build index from the full item list and make it current
    ///
    /// Items without a yaml identifier are skipped. The new index replaces
    /// the in-memory one, then is written to the cache. A failed cache
    /// write is logged and does not fail the build: the in-memory index is
    /// already valid.
    ///
    /// # Errors
    /// Returns `IndexError::Cache` only if the index cannot be encoded.
    pub async fn build_index(&self, items: &[ContentItem]) -> IndexResult<Arc<ScenarioIndex>> {
        let index = Arc::new(ScenarioIndex::from_items(items));
        let skipped = items.len() - items.iter().filter(|i| i.yaml_id().is_some()).count();
        if skipped > 0 {
            tracing::debug!("Skipped {} items without a yaml id", skipped);
        }

        *self.current.write() = Some(Arc::clone(&index));

        let value = index.to_cache_value().map_err(CacheError::from)?;
        if let Err(e) = self
            .cache
            .set(&self.config.cache_key, value, self.config.cache_ttl())
            .await
        {
            tracing::warn!("Failed to cache scenario index under {}: {}", self.config.cache_key, e);
        }

        tracing::info!(
            "Built scenario index: {} yaml ids, {} uuids from {} items",
            index.yaml_len(),
            index.uuid_len(),
            items.len()
        );
        Ok(index)
    }

    /// Current index: memory, then cache, else `None`
    ///
    /// # Errors
    /// - `IndexError::CorruptCache` if the cached payload is malformed
    /// - `IndexError::Cache` if the cache store fails
    pub async fn get_index(&self) -> IndexResult<Option<Arc<ScenarioIndex>>> {
        let loaded = self.current.read().clone();
        if loaded.is_some() {
            return Ok(loaded);
        }

        let Some(value) = self.cache.get(&self.config.cache_key).await? else {
            tracing::debug!("Scenario index not in cache");
            return Ok(None);
        };

        let index = match ScenarioIndex::from_cache_value(value) {
            Ok(index) => Arc::new(index),
            Err(e) => {
                tracing::error!("Cached scenario index is unusable: {}", e);
                return Err(e);
            }
        };
        tracing::debug!("Loaded scenario index from cache ({} entries)", index.yaml_len());

        let mut slot = self.current.write();
        // a build may have finished while the cache was read; keep the newer one
        let current = slot.get_or_insert_with(|| Arc::clone(&index));
        Ok(Some(Arc::clone(current)))
    }

    /// UUID for a yaml identifier
    ///
    /// # Errors
    /// Propagates `get_index` failures.
    pub async fn get_uuid_by_yaml_id(&self, yaml_id: &str) -> IndexResult<Option<String>> {
        Ok(self
            .get_index()
            .await?
            .and_then(|index| index.uuid_for(yaml_id).map(str::to_string)))
    }

    /// Yaml identifier for a UUID
    ///
    /// # Errors
    /// Propagates `get_index` failures.
    pub async fn get_yaml_id_by_uuid(&self, uuid: &str) -> IndexResult<Option<String>> {
        Ok(self
            .get_index()
            .await?
            .and_then(|index| index.yaml_id_for(uuid).map(str::to_string)))
    }

    /// Full entry for a yaml identifier
    ///
    /// # Errors
    /// Propagates `get_index` failures.
    pub async fn get_entry_by_yaml_id(&self, yaml_id: &str) -> IndexResult<Option<ScenarioIndexEntry>> {
        Ok(self
            .get_index()
            .await?
            .and_then(|index| index.entry_by_yaml_id(yaml_id).cloned()))
    }

    /// Full entry for a UUID
    ///
    /// # Errors
    /// Propagates `get_index` failures.
    pub async fn get_entry_by_uuid(&self, uuid: &str) -> IndexResult<Option<ScenarioIndexEntry>> {
        Ok(self
            .get_index()
            .await?
            .and_then(|index| index.entry_by_uuid(uuid).cloned()))
    }

    /// Resolve many yaml identifiers; unresolvable ones are omitted
    ///
    /// # Errors
    /// Propagates `get_index` failures.
    pub async fn get_uuids_by_yaml_ids<S>(&self, yaml_ids: &[S]) -> IndexResult<HashMap<String, String>>
    where
        S: AsRef<str> + Sync,
    {
        Ok(self
            .get_index()
            .await?
            .map(|index| index.uuids_for(yaml_ids))
            .unwrap_or_default())
    }

    /// Entries of one source, sorted by yaml identifier
    ///
    /// # Errors
    /// Propagates `get_index` failures.
    pub async fn entries_by_source(&self, source: SourceType) -> IndexResult<Vec<ScenarioIndexEntry>> {
        Ok(self
            .get_index()
            .await?
            .map(|index| index.entries_by_source(source))
            .unwrap_or_default())
    }

    /// Summary counts of the current index
    ///
    /// # Errors
    /// Propagates `get_index` failures.
    pub async fn stats(&self) -> IndexResult<Option<IndexStats>> {
        Ok(self.get_index().await?.map(|index| index.stats()))
    }

    /// Drop the in-memory index and the cached copy
    ///
    /// # Errors
    /// Returns `IndexError::Cache` if the cache delete fails; the memory
    /// slot is cleared regardless.
    pub async fn invalidate(&self) -> IndexResult<()> {
        self.current.write().take();
        self.cache.delete(&self.config.cache_key).await?;
        tracing::info!("Invalidated scenario index ({})", self.config.cache_key);
        Ok(())
    }

    /// Whether an index is available without building
    ///
    /// Checks memory first, then asks the cache for key presence only.
    ///
    /// # Errors
    /// Returns `IndexError::Cache` if the cache store fails.
    pub async fn exists(&self) -> IndexResult<bool> {
        let loaded = self.current.read().is_some();
        if loaded {
            return Ok(true);
        }
        Ok(self.cache.has(&self.config.cache_key).await?)
    }

    /// Best-effort deletion of related cache keys
    ///
    /// Failures are collected in the report instead of aborting.
    pub async fn clear_keys<S: AsRef<str> + Sync>(&self, keys: &[S]) -> ClearReport {
        let mut report = ClearReport::default();
        for key in keys {
            let key = key.as_ref();
            match self.cache.delete(key).await {
                Ok(()) => report.cleared.push(key.to_string()),
                Err(e) => {
                    tracing::warn!("Failed to clear cache key {}: {}", key, e);
                    report.failed.push((key.to_string(), e));
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for ScenarioIndexService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioIndexService")
            .field("config", &self.config)
            .field("loaded", &self.current.read().is_some())
            .finish_non_exhaustive()
    }
}
