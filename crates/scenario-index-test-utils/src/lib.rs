//! Testing utilities for the scenario index workspace
//!
//! Shared fixtures and an in-memory content repository.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use scenario_index::{
    ContentItem, ContentRepository, IndexConfig, MokaCacheStore, RepositoryError,
    ScenarioIndexBuilder, ScenarioIndexService, SourceType,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn item(id: &str, source: SourceType, yaml_id: &str) -> ContentItem {
    ContentItem::new(id, source)
        .with_yaml_id(yaml_id)
        .with_updated_at("2024-01-01T00:00:00Z")
        .with_created_at("2023-01-01T00:00:00Z")
}

pub fn titled_item(id: &str, source: SourceType, yaml_id: &str, title: &str) -> ContentItem {
    item(id, source, yaml_id).with_title(title)
}

/// Item with a random UUID and no yaml identifier
pub fn anonymous_item(source: SourceType) -> ContentItem {
    ContentItem::new(uuid::Uuid::new_v4().to_string(), source)
}

/// `count` items for `source` with random UUIDs and yaml ids `{source}-{n}`
pub fn generated_items(source: SourceType, count: usize) -> Vec<ContentItem> {
    (0..count)
        .map(|n| {
            let uuid = uuid::Uuid::new_v4().to_string();
            item(&uuid, source, &format!("{source}-{n}"))
        })
        .collect()
}

/// Content repository over in-memory item lists
///
/// Counts fetches per source, can fail chosen sources and can delay every
/// fetch so overlapping builds are observable.
#[derive(Debug, Default)]
pub struct InMemoryContentRepository {
    items: Mutex<HashMap<SourceType, Vec<ContentItem>>>,
    failing: Mutex<HashSet<SourceType>>,
    delay: Mutex<Option<Duration>>,
    fetches: Mutex<HashMap<SourceType, usize>>,
    total_fetches: AtomicUsize,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = ContentItem>) -> Self {
        let repository = Self::new();
        for item in items {
            repository.push(item);
        }
        repository
    }

    pub fn push(&self, item: ContentItem) {
        self.items.lock().entry(item.source_type).or_default().push(item);
    }

    pub fn replace_source(&self, source: SourceType, items: Vec<ContentItem>) {
        self.items.lock().insert(source, items);
    }

    pub fn fail_source(&self, source: SourceType) {
        self.failing.lock().insert(source);
    }

    pub fn heal_source(&self, source: SourceType) {
        self.failing.lock().remove(&source);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn fetch_count(&self, source: SourceType) -> usize {
        self.fetches.lock().get(&source).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn find_by_source(&self, source: SourceType) -> Result<Vec<ContentItem>, RepositoryError> {
        *self.fetches.lock().entry(source).or_default() += 1;
        self.total_fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing.lock().contains(&source);
        if failing {
            return Err(RepositoryError::new(format!("{source} source unavailable")));
        }
        Ok(self.items.lock().get(&source).cloned().unwrap_or_default())
    }
}

/// Service, builder and repository wired over a fresh moka store
pub struct Harness {
    pub cache: Arc<MokaCacheStore>,
    pub service: Arc<ScenarioIndexService>,
    pub builder: Arc<ScenarioIndexBuilder>,
    pub repository: Arc<InMemoryContentRepository>,
}

pub fn setup_harness(repository: InMemoryContentRepository, config: IndexConfig) -> Harness {
    let cache = Arc::new(MokaCacheStore::new(64));
    let repository = Arc::new(repository);
    let service = Arc::new(ScenarioIndexService::new(cache.clone(), config.clone()));
    let builder = Arc::new(ScenarioIndexBuilder::new(
        Arc::clone(&service),
        repository.clone(),
        config,
    ));
    Harness {
        cache,
        service,
        builder,
        repository,
    }
}

/// One titled item per source: `pbl-1`, `assessment-1`, `discovery-1`
pub fn sample_items() -> Vec<ContentItem> {
    vec![
        titled_item("u-pbl-1", SourceType::Pbl, "pbl-1", "Intro to AI"),
        titled_item("u-assessment-1", SourceType::Assessment, "assessment-1", "AI Literacy Check"),
        titled_item("u-discovery-1", SourceType::Discovery, "discovery-1", "Data Analyst Path"),
    ]
}
