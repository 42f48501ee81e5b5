//! Index configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Version of the cache payload format; baked into the default cache key
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Default external cache TTL (30 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;

/// Default window during which a finished full build suppresses new ones (5 minutes)
pub const DEFAULT_REBUILD_THROTTLE_SECS: u64 = 5 * 60;

/// Default cache key for the whole index
#[must_use]
pub fn default_cache_key() -> String {
    format!("scenario-index:v{INDEX_FORMAT_VERSION}")
}

/// Scenario index configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Cache key holding the serialized index
    pub cache_key: String,
    /// External cache TTL in seconds
    pub cache_ttl_secs: u64,
    /// Full-build throttle window in seconds
    pub rebuild_throttle_secs: u64,
}

impl IndexConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cache key
    #[inline]
    #[must_use]
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    /// With cache TTL
    #[inline]
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    /// With rebuild throttle window
    #[inline]
    #[must_use]
    pub fn with_rebuild_throttle(mut self, window: Duration) -> Self {
        self.rebuild_throttle_secs = window.as_secs();
        self
    }

    /// External cache TTL
    #[inline]
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Full-build throttle window
    #[inline]
    #[must_use]
    pub fn rebuild_throttle(&self) -> Duration {
        Duration::from_secs(self.rebuild_throttle_secs)
    }

    /// Parse from a TOML document; absent fields keep their defaults
    ///
    /// # Errors
    /// Returns `ConfigError` if the document is malformed or fails validation.
    pub fn from_toml_str(doc: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(doc)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the index cannot run with
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an empty key or zero TTL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cache_key: default_cache_key(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            rebuild_throttle_secs: DEFAULT_REBUILD_THROTTLE_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.cache_key, "scenario-index:v1");
        assert_eq!(config.cache_ttl(), Duration::from_secs(1800));
        assert_eq!(config.rebuild_throttle(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_methods() {
        let config = IndexConfig::new()
            .with_cache_key("tenant-a:scenario-index:v1")
            .with_cache_ttl(Duration::from_secs(60))
            .with_rebuild_throttle(Duration::ZERO);

        assert_eq!(config.cache_key, "tenant-a:scenario-index:v1");
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.rebuild_throttle_secs, 0);
    }

    #[test]
    fn toml_partial_document() {
        let config = IndexConfig::from_toml_str("cache_ttl_secs = 120\n").unwrap();
        assert_eq!(config.cache_ttl_secs, 120);
        assert_eq!(config.cache_key, default_cache_key());
        assert_eq!(config.rebuild_throttle_secs, DEFAULT_REBUILD_THROTTLE_SECS);
    }

    #[test]
    fn toml_rejects_zero_ttl() {
        let err = IndexConfig::from_toml_str("cache_ttl_secs = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "cache_ttl_secs",
                ..
            }
        ));
    }

    #[test]
    fn toml_rejects_garbage() {
        assert!(matches!(
            IndexConfig::from_toml_str("cache_ttl_secs = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
