//! Core records: source types, content items and index entries

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Learning mode a content item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Problem-based learning case
    Pbl,
    /// Assessment set
    Assessment,
    /// Discovery path
    Discovery,
}

impl SourceType {
    /// Every source, in fetch and concatenation order
    pub const ALL: [SourceType; 3] = [Self::Pbl, Self::Assessment, Self::Discovery];

    /// Lowercase tag used in payloads and on the command line
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pbl => "pbl",
            Self::Assessment => "assessment",
            Self::Discovery => "discovery",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown source tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source type: '{0}' (expected pbl, assessment or discovery)")]
pub struct ParseSourceTypeError(String);

impl FromStr for SourceType {
    type Err = ParseSourceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pbl" => Ok(Self::Pbl),
            "assessment" => Ok(Self::Assessment),
            "discovery" => Ok(Self::Discovery),
            _ => Err(ParseSourceTypeError(s.to_string())),
        }
    }
}

/// Metadata carried over from the content's source definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    /// Human-authored identifier; items without one are not indexed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_id: Option<String>,
}

/// Content item as returned by the content repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Database primary key (UUID)
    pub id: String,
    /// Learning mode
    pub source_type: SourceType,
    /// Source-definition metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_metadata: Option<SourceMetadata>,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// ISO timestamp of the last update
    #[serde(default)]
    pub updated_at: String,
    /// ISO timestamp of creation
    #[serde(default)]
    pub created_at: String,
}

impl ContentItem {
    /// Create item without metadata, title or timestamps
    pub fn new(id: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            source_type,
            source_metadata: None,
            title: None,
            updated_at: String::new(),
            created_at: String::new(),
        }
    }

    /// With yaml identifier
    #[must_use]
    pub fn with_yaml_id(mut self, yaml_id: impl Into<String>) -> Self {
        self.source_metadata
            .get_or_insert_with(SourceMetadata::default)
            .yaml_id = Some(yaml_id.into());
        self
    }

    /// With title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With update timestamp
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = updated_at.into();
        self
    }

    /// With creation timestamp
    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    /// Yaml identifier, if the item carries a non-empty one
    #[inline]
    #[must_use]
    pub fn yaml_id(&self) -> Option<&str> {
        self.source_metadata
            .as_ref()
            .and_then(|m| m.yaml_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Index entry for this item, or `None` when it has no yaml identifier
    #[must_use]
    pub fn to_entry(&self) -> Option<ScenarioIndexEntry> {
        let yaml_id = self.yaml_id()?;
        let last_updated = if self.updated_at.is_empty() {
            self.created_at.clone()
        } else {
            self.updated_at.clone()
        };

        Some(ScenarioIndexEntry {
            yaml_id: yaml_id.to_string(),
            uuid: self.id.clone(),
            source_type: self.source_type,
            title: self.title.clone(),
            last_updated,
        })
    }
}

/// One indexed content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioIndexEntry {
    /// Human-authored identifier
    pub yaml_id: String,
    /// Database primary key
    pub uuid: String,
    /// Learning mode
    pub source_type: SourceType,
    /// Title snapshot at build time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// ISO timestamp of the item's last update
    pub last_updated: String,
}

impl ScenarioIndexEntry {
    /// Content item carrying just enough to reproduce this entry
    ///
    /// Used by single-source rebuilds for the sources that are not refetched.
    #[must_use]
    pub fn to_placeholder_item(&self) -> ContentItem {
        let mut item = ContentItem::new(self.uuid.clone(), self.source_type)
            .with_yaml_id(self.yaml_id.clone())
            .with_updated_at(self.last_updated.clone())
            .with_created_at(self.last_updated.clone());
        item.title = self.title.clone();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_type_parse_and_display() {
        for source in SourceType::ALL {
            assert_eq!(source.as_str().parse::<SourceType>().unwrap(), source);
            assert_eq!(source.to_string(), source.as_str());
        }
        assert_eq!(" PBL ".parse::<SourceType>().unwrap(), SourceType::Pbl);
        assert!("course".parse::<SourceType>().is_err());
    }

    #[test]
    fn content_item_deserializes_camel_case() {
        let item: ContentItem = serde_json::from_str(
            r#"{
                "id": "u1",
                "sourceType": "pbl",
                "sourceMetadata": { "yamlId": "pbl-1" },
                "title": "T1",
                "updatedAt": "2024-01-01",
                "createdAt": "2023-12-01"
            }"#,
        )
        .unwrap();

        assert_eq!(item.yaml_id(), Some("pbl-1"));
        assert_eq!(item.source_type, SourceType::Pbl);
        assert_eq!(item.title.as_deref(), Some("T1"));
    }

    #[test]
    fn entry_from_item() {
        let item = ContentItem::new("u1", SourceType::Pbl)
            .with_yaml_id("pbl-1")
            .with_title("T1")
            .with_updated_at("2024-01-01");

        assert_eq!(
            item.to_entry().unwrap(),
            ScenarioIndexEntry {
                yaml_id: "pbl-1".to_string(),
                uuid: "u1".to_string(),
                source_type: SourceType::Pbl,
                title: Some("T1".to_string()),
                last_updated: "2024-01-01".to_string(),
            }
        );
    }

    #[test]
    fn entry_falls_back_to_created_at() {
        let item = ContentItem::new("u2", SourceType::Discovery)
            .with_yaml_id("disc-1")
            .with_created_at("2023-05-05");

        assert_eq!(item.to_entry().unwrap().last_updated, "2023-05-05");
    }

    #[test]
    fn items_without_yaml_id_have_no_entry() {
        assert!(ContentItem::new("u3", SourceType::Assessment).to_entry().is_none());

        let mut empty = ContentItem::new("u4", SourceType::Assessment);
        empty.source_metadata = Some(SourceMetadata::default());
        assert!(empty.to_entry().is_none());

        assert!(ContentItem::new("u5", SourceType::Pbl)
            .with_yaml_id("")
            .to_entry()
            .is_none());
    }

    #[test]
    fn placeholder_reproduces_entry() {
        let entry = ScenarioIndexEntry {
            yaml_id: "assess-1".to_string(),
            uuid: "u9".to_string(),
            source_type: SourceType::Assessment,
            title: None,
            last_updated: "2024-02-02".to_string(),
        };

        assert_eq!(entry.to_placeholder_item().to_entry(), Some(entry));
    }
}
