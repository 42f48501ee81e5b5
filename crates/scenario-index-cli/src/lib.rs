//! Scenario index CLI support
//!
//! Loads a JSON dump of content items, builds the index in-process and
//! answers one query per invocation.

#![allow(missing_docs)]

use anyhow::{Context, Result};
use scenario_index::{
    ContentItem, ContentRepository, IndexConfig, IndexStats, MokaCacheStore, RepositoryError,
    ScenarioIndexBuilder, ScenarioIndexEntry, ScenarioIndexService, SourceType,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Content repository over a JSON array of content items
#[derive(Debug, Default)]
pub struct FileContentRepository {
    by_source: HashMap<SourceType, Vec<ContentItem>>,
}

impl FileContentRepository {
    /// Parse a JSON array of content items, keeping file order per source
    pub fn from_json_str(json: &str) -> Result<Self> {
        let items: Vec<ContentItem> =
            serde_json::from_str(json).context("content file must be a JSON array of content items")?;
        let mut by_source: HashMap<SourceType, Vec<ContentItem>> = HashMap::new();
        for item in items {
            by_source.entry(item.source_type).or_default().push(item);
        }
        Ok(Self { by_source })
    }

    /// Read and parse a content file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read content file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Number of items across all sources
    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ContentRepository for FileContentRepository {
    async fn find_by_source(&self, source: SourceType) -> Result<Vec<ContentItem>, RepositoryError> {
        Ok(self.by_source.get(&source).cloned().unwrap_or_default())
    }
}

/// Query to run after the index is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Build,
    Lookup { yaml_id: String },
    Reverse { uuid: String },
    Batch { yaml_ids: Vec<String> },
    Export,
    Refresh { source: SourceType },
}

/// Global options
#[derive(Debug, Clone)]
pub struct Options {
    pub content: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
}

/// Load config from `path`, or defaults when absent
pub fn load_config(path: Option<&Path>) -> Result<IndexConfig> {
    let Some(path) = path else {
        return Ok(IndexConfig::default());
    };
    let doc = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    IndexConfig::from_toml_str(&doc).with_context(|| format!("invalid config file {}", path.display()))
}

/// Build the index from the content file and run `action`, returning the output text
pub async fn run(options: &Options, action: Action) -> Result<String> {
    let config = load_config(options.config.as_deref())?;
    let repository = Arc::new(FileContentRepository::load(&options.content)?);
    tracing::info!("Loaded {} content items from {}", repository.len(), options.content.display());

    let service = Arc::new(ScenarioIndexService::new(
        Arc::new(MokaCacheStore::default()),
        config.clone(),
    ));
    let builder = ScenarioIndexBuilder::new(Arc::clone(&service), repository, config);
    builder.build_full_index().await?;

    match action {
        Action::Build => {
            let stats = service.stats().await?.context("index missing after build")?;
            render_stats(&stats, options.json)
        }
        Action::Lookup { yaml_id } => {
            let entry = service.get_entry_by_yaml_id(&yaml_id).await?;
            render_entry(&yaml_id, entry.as_ref(), options.json)
        }
        Action::Reverse { uuid } => {
            let entry = service.get_entry_by_uuid(&uuid).await?;
            render_entry(&uuid, entry.as_ref(), options.json)
        }
        Action::Batch { yaml_ids } => {
            let found: BTreeMap<String, String> =
                service.get_uuids_by_yaml_ids(&yaml_ids).await?.into_iter().collect();
            if options.json {
                return Ok(serde_json::to_string_pretty(&found)?);
            }
            Ok(found
                .iter()
                .map(|(yaml_id, uuid)| format!("{yaml_id} -> {uuid}"))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Action::Export => {
            let index = service.get_index().await?.context("index missing after build")?;
            Ok(serde_json::to_string_pretty(&index.to_serialized())?)
        }
        Action::Refresh { source } => {
            builder.build_source_index(source).await?;
            let stats = service.stats().await?.context("index missing after refresh")?;
            render_stats(&stats, options.json)
        }
    }
}

fn render_stats(stats: &IndexStats, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(stats)?);
    }
    let per_source = stats
        .by_source
        .iter()
        .map(|(source, count)| format!("{source}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "indexed {} yaml ids / {} uuids ({per_source})",
        stats.yaml_ids, stats.uuids
    ))
}

fn render_entry(key: &str, entry: Option<&ScenarioIndexEntry>, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(&entry)?);
    }
    Ok(match entry {
        Some(e) => format!(
            "{} -> {} [{}] {}",
            e.yaml_id,
            e.uuid,
            e.source_type,
            e.title.as_deref().unwrap_or("(untitled)")
        ),
        None => format!("not found: {key}"),
    })
}
