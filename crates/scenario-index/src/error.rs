//! Error types for the scenario index
//!
//! Provides error handling for:
//! - Content repository fetches (source failures)
//! - External cache store operations
//! - Corrupt cache payloads
//! - Configuration loading
//!
//! Absence (no index yet, unmapped key) is never an error; lookups return
//! `Ok(None)` for that.

use std::error::Error as StdError;

/// Errors raised by a [`ContentRepository`](crate::ContentRepository)
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RepositoryError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl RepositoryError {
    /// Create error with message only
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create error wrapping an underlying cause
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors during external cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Cache backend unavailable or rejected the operation
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Payload could not be encoded for storage
    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML document could not be parsed
    #[error("invalid config document: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the index cannot run with
    #[error("invalid config value for `{field}`: {reason}")]
    InvalidValue {
        /// Config field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Combined index error
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Content source fetch failed; the build was aborted
    #[error("content repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// External cache store failed
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Cached payload exists but does not describe a valid index
    #[error("corrupt index payload in cache: {reason}")]
    CorruptCache {
        /// What failed to decode or validate
        reason: String,
    },

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl IndexError {
    /// Create corrupt-cache error
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptCache {
            reason: reason.into(),
        }
    }

    /// Whether rebuilding from source is the expected recovery
    #[inline]
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, Self::CorruptCache { .. })
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_error_display() {
        let err = RepositoryError::new("pbl table unavailable");
        assert_eq!(err.to_string(), "pbl table unavailable");
        assert!(err.source().is_none());
    }

    #[test]
    fn repository_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = RepositoryError::with_source("fetch failed", io);
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("connection reset"));
    }

    #[test]
    fn corrupt_cache_display() {
        let err = IndexError::corrupt("yamlToUuid: expected a sequence");
        assert!(err.to_string().contains("corrupt index payload"));
        assert!(err.needs_rebuild());
    }

    #[test]
    fn error_conversions() {
        let err: IndexError = RepositoryError::new("boom").into();
        assert!(matches!(err, IndexError::Repository(_)));
        assert!(!err.needs_rebuild());

        let err: IndexError = CacheError::Backend("down".to_string()).into();
        assert!(matches!(err, IndexError::Cache(_)));
    }
}
