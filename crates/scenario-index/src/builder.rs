//! Index builder: fetches content per source and feeds the service
//!
//! # Build policy
//!
//! - A full build already running makes new calls return
//!   [`BuildOutcome::InProgress`] immediately (no queueing).
//! - A full build that finished less than the throttle window ago makes new
//!   calls return [`BuildOutcome::Throttled`].
//! - Any source failure aborts the build; the previous index stays current.
//!
//! The build state is owned by the builder instance. The `is_building`
//! flag is set and checked under one lock and cleared by a drop guard, so
//! it is released on success, on error, and if the build future is dropped.

use crate::config::IndexConfig;
use crate::error::IndexResult;
use crate::index::ScenarioIndex;
use crate::repository::ContentRepository;
use crate::service::ScenarioIndexService;
use crate::types::{ContentItem, ScenarioIndexEntry, SourceType};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a full-build request
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// A new index was built and is now current
    Built(Arc<ScenarioIndex>),
    /// Another build is running; nothing was done
    InProgress,
    /// A build finished recently; nothing was done
    Throttled {
        /// Time left in the throttle window
        retry_after: Duration,
    },
}

impl BuildOutcome {
    /// Index produced by this call, if any
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<&Arc<ScenarioIndex>> {
        match self {
            Self::Built(index) => Some(index),
            Self::InProgress | Self::Throttled { .. } => None,
        }
    }

    /// Whether this call built an index
    #[inline]
    #[must_use]
    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built(_))
    }
}

/// Snapshot of the builder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStatus {
    /// A full build is running
    pub is_building: bool,
    /// Wall-clock time the last successful full build finished
    pub last_build_at: Option<DateTime<Utc>>,
    /// Time since the last successful full build
    pub last_build_age: Option<Duration>,
}

#[derive(Debug, Default)]
struct BuildState {
    is_building: bool,
    last_build: Option<(Instant, DateTime<Utc>)>,
}

/// Clears `is_building` when dropped
struct BuildGuard<'a> {
    state: &'a Mutex<BuildState>,
}

impl BuildGuard<'_> {
    fn succeed(self) {
        self.state.lock().last_build = Some((Instant::now(), Utc::now()));
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().is_building = false;
    }
}

/// Orchestrates full and single-source index builds
pub struct ScenarioIndexBuilder {
    service: Arc<ScenarioIndexService>,
    repository: Arc<dyn ContentRepository>,
    config: IndexConfig,
    state: Mutex<BuildState>,
}

impl ScenarioIndexBuilder {
    /// Create builder; the throttle window comes from `config`
    #[must_use]
    pub fn new(
        service: Arc<ScenarioIndexService>,
        repository: Arc<dyn ContentRepository>,
        config: IndexConfig,
    ) -> Self {
        Self {
            service,
            repository,
            config,
            state: Mutex::new(BuildState::default()),
        }
    }

    /// Service this builder feeds
    #[inline]
    #[must_use]
    pub fn service(&self) -> &Arc<ScenarioIndexService> {
        &self.service
    }

    /// Current build state
    #[must_use]
    pub fn status(&self) -> BuildStatus {
        let state = self.state.lock();
        BuildStatus {
            is_building: state.is_building,
            last_build_at: state.last_build.map(|(_, at)| at),
            last_build_age: state.last_build.map(|(at, _)| at.elapsed()),
        }
    }

    /// Fetch every source and rebuild the whole index
    ///
    /// # Errors
    /// Returns `IndexError::Repository` if any source fetch fails; the
    /// previous index is left untouched.
    pub async fn build_full_index(&self) -> IndexResult<BuildOutcome> {
        let guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(skipped) => return Ok(skipped),
        };
        tracing::info!("Starting full scenario index build");

        let items = match self.fetch_all().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("Full scenario index build aborted: {}", e);
                return Err(e);
            }
        };

        let index = self.service.build_index(&items).await?;
        guard.succeed();
        Ok(BuildOutcome::Built(index))
    }

    /// Refetch one source and rebuild, keeping other sources from the current index
    ///
    /// Entries of the other sources are carried over as placeholders built
    /// from the index itself (yaml id, uuid, source, title, last update).
    /// They are not re-validated: a title change in an untouched source
    /// shows up only after the next full build.
    ///
    /// # Errors
    /// - `IndexError::Repository` if the fetch fails (nothing is changed)
    /// - `IndexError::CorruptCache` if the current index cannot be loaded
    pub async fn build_source_index(&self, source: SourceType) -> IndexResult<Arc<ScenarioIndex>> {
        tracing::info!("Rebuilding scenario index for source {}", source);
        let fresh = self.repository.find_by_source(source).await?;

        let mut items: Vec<ContentItem> = match self.service.get_index().await? {
            Some(current) => placeholders_excluding(&current, source),
            None => Vec::new(),
        };
        tracing::debug!(
            "Carrying {} entries from other sources, {} fresh {} items",
            items.len(),
            fresh.len(),
            source
        );
        items.extend(fresh);

        self.service.build_index(&items).await
    }

    /// Build the full index if none exists in memory or cache
    ///
    /// Returns `None` when an index already exists, otherwise the outcome of
    /// the full build. A skipped build (`InProgress` or `Throttled`) leaves
    /// the index absent.
    ///
    /// # Errors
    /// Propagates `exists` and `build_full_index` failures.
    pub async fn ensure_index(&self) -> IndexResult<Option<BuildOutcome>> {
        if self.service.exists().await? {
            return Ok(None);
        }
        tracing::info!("No scenario index available; building");
        let outcome = self.build_full_index().await?;
        if !outcome.is_built() {
            tracing::warn!("Scenario index still absent; full build skipped: {:?}", outcome);
        }
        Ok(Some(outcome))
    }

    fn try_begin(&self) -> Result<BuildGuard<'_>, BuildOutcome> {
        let mut state = self.state.lock();
        if state.is_building {
            tracing::warn!("Scenario index build already in progress; skipping");
            return Err(BuildOutcome::InProgress);
        }

        let window = self.config.rebuild_throttle();
        if let Some((finished, _)) = state.last_build {
            let elapsed = finished.elapsed();
            if elapsed < window {
                tracing::debug!("Scenario index built {:?} ago; skipping", elapsed);
                return Err(BuildOutcome::Throttled {
                    retry_after: window - elapsed,
                });
            }
        }

        state.is_building = true;
        Ok(BuildGuard { state: &self.state })
    }

    async fn fetch_all(&self) -> IndexResult<Vec<ContentItem>> {
        let batches = try_join_all(
            SourceType::ALL
                .iter()
                .map(|source| self.repository.find_by_source(*source)),
        )
        .await?;

        for (source, batch) in SourceType::ALL.iter().zip(&batches) {
            tracing::debug!("Fetched {} {} items", batch.len(), source);
        }
        Ok(batches.into_iter().flatten().collect())
    }
}

impl std::fmt::Debug for ScenarioIndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioIndexBuilder")
            .field("service", &self.service)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// Placeholder items for every entry whose source differs from `source`
///
/// Built from the UUID view so UUIDs whose yaml id was taken over keep
/// their reverse mapping. Entries that own their yaml id come last so they
/// win it again on rebuild.
fn placeholders_excluding(index: &ScenarioIndex, source: SourceType) -> Vec<ContentItem> {
    let mut entries: Vec<(bool, &ScenarioIndexEntry)> = index
        .uuid_entries()
        .filter(|e| e.source_type != source)
        .map(|e| (index.uuid_for(&e.yaml_id) == Some(e.uuid.as_str()), e))
        .collect();
    entries.sort_by(|(a_owns, a), (b_owns, b)| {
        a_owns
            .cmp(b_owns)
            .then_with(|| a.yaml_id.cmp(&b.yaml_id))
            .then_with(|| a.uuid.cmp(&b.uuid))
    });
    entries
        .into_iter()
        .map(|(_, e)| e.to_placeholder_item())
        .collect()
}
