//! Scenario Index
//!
//! Bidirectional lookup between human-authored yaml identifiers and the
//! UUID primary keys of learning content (PBL, Assessment, Discovery).
//!
//! # Overview
//!
//! - **ScenarioIndex**: immutable two-way map over index entries
//! - **ScenarioIndexService**: current index in memory plus a cached copy,
//!   point and batch lookups
//! - **ScenarioIndexBuilder**: full and single-source rebuilds from a
//!   [`ContentRepository`], with an in-progress guard and rebuild throttle
//! - **CacheStore**: external cache seam; [`MokaCacheStore`] is the
//!   in-process default
//!
//! # Architecture
//!
//! ```text
//! ContentRepository ──► ScenarioIndexBuilder ──► ScenarioIndexService ──► CacheStore
//!                                                      │
//!                                               Arc<ScenarioIndex>
//!                                                      │
//!                                             lookups (yaml id ⇄ uuid)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use scenario_index::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(repository: Arc<dyn ContentRepository>) -> IndexResult<()> {
//! let config = IndexConfig::default();
//! let service = Arc::new(ScenarioIndexService::new(
//!     Arc::new(MokaCacheStore::default()),
//!     config.clone(),
//! ));
//! let builder = ScenarioIndexBuilder::new(Arc::clone(&service), repository, config);
//!
//! builder.ensure_index().await?;
//! let uuid = service.get_uuid_by_yaml_id("intro-to-ai").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod repository;
pub mod service;
pub mod types;

// Re-exports for convenience
pub use builder::{BuildOutcome, BuildStatus, ScenarioIndexBuilder};
pub use cache::{CacheStats, CacheStore, ClearReport, MokaCacheStore};
pub use config::{IndexConfig, INDEX_FORMAT_VERSION};
pub use error::{CacheError, ConfigError, IndexError, IndexResult, RepositoryError};
pub use index::{IndexStats, ScenarioIndex, SerializedIndex};
pub use repository::ContentRepository;
pub use service::ScenarioIndexService;
pub use types::{ContentItem, ParseSourceTypeError, ScenarioIndexEntry, SourceMetadata, SourceType};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the scenario index
    pub use crate::{
        BuildOutcome, CacheStore, ContentItem, ContentRepository, IndexConfig, IndexError,
        IndexResult, MokaCacheStore, ScenarioIndex, ScenarioIndexBuilder, ScenarioIndexEntry,
        ScenarioIndexService, SourceType,
    };
}
