//! Content repository seam
//!
//! The host application implements [`ContentRepository`] over its own
//! storage; the builder only needs one query per source.

use crate::error::RepositoryError;
use crate::types::{ContentItem, SourceType};

/// Source of content items
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContentRepository: Send + Sync {
    /// All content items of one source
    async fn find_by_source(&self, source: SourceType) -> Result<Vec<ContentItem>, RepositoryError>;
}
