//! Immutable bidirectional index and its cache payload
//!
//! [`ScenarioIndex`] holds two views over one entry set: `yaml_to_uuid`
//! keyed by yaml identifier and `uuid_to_yaml` keyed by UUID. Both maps
//! share the same `Arc<ScenarioIndexEntry>` values, so an entry reachable
//! from one view is field-for-field identical in the other.
//!
//! The index is never mutated after construction. Updates build a new
//! index and swap the reference held by the service.

use crate::error::{IndexError, IndexResult};
use crate::types::{ContentItem, ScenarioIndexEntry, SourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Bidirectional yaml-id/UUID index
#[derive(Debug, Clone)]
pub struct ScenarioIndex {
    yaml_to_uuid: HashMap<String, Arc<ScenarioIndexEntry>>,
    uuid_to_yaml: HashMap<String, Arc<ScenarioIndexEntry>>,
    last_updated: DateTime<Utc>,
}

impl ScenarioIndex {
    /// Build index from content items in one pass
    ///
    /// Items without a yaml identifier are skipped. Duplicate yaml
    /// identifiers resolve by input order: the later item wins.
    #[must_use]
    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        Self::from_entries(items.into_iter().filter_map(ContentItem::to_entry))
    }

    /// Build index from ready-made entries, preserving last-write-wins order
    ///
    /// Last write wins on both keys. When a UUID reappears under a new yaml
    /// identifier, the old yaml key is dropped if it still points at that
    /// UUID, so every yaml entry keeps an identical mirror in the UUID view.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ScenarioIndexEntry>,
    {
        let mut yaml_to_uuid: HashMap<String, Arc<ScenarioIndexEntry>> = HashMap::new();
        let mut uuid_to_yaml: HashMap<String, Arc<ScenarioIndexEntry>> = HashMap::new();

        for entry in entries {
            let entry = Arc::new(entry);
            if let Some(replaced) = uuid_to_yaml.insert(entry.uuid.clone(), Arc::clone(&entry)) {
                let owns_yaml_key = yaml_to_uuid
                    .get(&replaced.yaml_id)
                    .is_some_and(|current| Arc::ptr_eq(current, &replaced));
                if owns_yaml_key {
                    yaml_to_uuid.remove(&replaced.yaml_id);
                }
            }
            yaml_to_uuid.insert(entry.yaml_id.clone(), entry);
        }

        Self {
            yaml_to_uuid,
            uuid_to_yaml,
            last_updated: Utc::now(),
        }
    }

    /// Empty index
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::from_entries(std::iter::empty())
    }

    /// UUID mapped to a yaml identifier
    #[inline]
    #[must_use]
    pub fn uuid_for(&self, yaml_id: &str) -> Option<&str> {
        self.yaml_to_uuid.get(yaml_id).map(|e| e.uuid.as_str())
    }

    /// Yaml identifier mapped to a UUID
    #[inline]
    #[must_use]
    pub fn yaml_id_for(&self, uuid: &str) -> Option<&str> {
        self.uuid_to_yaml.get(uuid).map(|e| e.yaml_id.as_str())
    }

    /// Entry by yaml identifier
    #[inline]
    #[must_use]
    pub fn entry_by_yaml_id(&self, yaml_id: &str) -> Option<&ScenarioIndexEntry> {
        self.yaml_to_uuid.get(yaml_id).map(|e| &**e)
    }

    /// Entry by UUID
    #[inline]
    #[must_use]
    pub fn entry_by_uuid(&self, uuid: &str) -> Option<&ScenarioIndexEntry> {
        self.uuid_to_yaml.get(uuid).map(|e| &**e)
    }

    /// Resolve many yaml identifiers; unresolvable ones are omitted
    #[must_use]
    pub fn uuids_for<S: AsRef<str>>(&self, yaml_ids: &[S]) -> HashMap<String, String> {
        yaml_ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                self.uuid_for(id).map(|uuid| (id.to_string(), uuid.to_string()))
            })
            .collect()
    }

    /// Entries keyed by yaml identifier
    pub fn yaml_entries(&self) -> impl Iterator<Item = &ScenarioIndexEntry> {
        self.yaml_to_uuid.values().map(|e| &**e)
    }

    /// Entries keyed by UUID
    pub fn uuid_entries(&self) -> impl Iterator<Item = &ScenarioIndexEntry> {
        self.uuid_to_yaml.values().map(|e| &**e)
    }

    /// Entries of one source, sorted by yaml identifier
    #[must_use]
    pub fn entries_by_source(&self, source: SourceType) -> Vec<ScenarioIndexEntry> {
        let mut entries: Vec<ScenarioIndexEntry> = self
            .yaml_entries()
            .filter(|e| e.source_type == source)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.yaml_id.cmp(&b.yaml_id));
        entries
    }

    /// Number of yaml identifiers indexed
    #[inline]
    #[must_use]
    pub fn yaml_len(&self) -> usize {
        self.yaml_to_uuid.len()
    }

    /// Number of UUIDs indexed
    #[inline]
    #[must_use]
    pub fn uuid_len(&self) -> usize {
        self.uuid_to_yaml.len()
    }

    /// Check if index holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.yaml_to_uuid.is_empty() && self.uuid_to_yaml.is_empty()
    }

    /// Construction time
    #[inline]
    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Summary counts
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let mut by_source: BTreeMap<SourceType, usize> =
            SourceType::ALL.iter().map(|s| (*s, 0)).collect();
        for entry in self.uuid_entries() {
            *by_source.entry(entry.source_type).or_default() += 1;
        }

        IndexStats {
            yaml_ids: self.yaml_len(),
            uuids: self.uuid_len(),
            by_source,
            last_updated: self.last_updated,
        }
    }

    /// Flatten into the cache payload
    #[must_use]
    pub fn to_serialized(&self) -> SerializedIndex {
        SerializedIndex {
            yaml_to_uuid: sorted_pairs(&self.yaml_to_uuid),
            uuid_to_yaml: sorted_pairs(&self.uuid_to_yaml),
            last_updated: self.last_updated,
        }
    }

    /// Rebuild from a cache payload
    ///
    /// # Errors
    /// Returns `IndexError::CorruptCache` if a key disagrees with its entry
    /// or a yaml entry has no identical mirror in the UUID view.
    pub fn from_serialized(payload: SerializedIndex) -> IndexResult<Self> {
        let mut uuid_to_yaml = HashMap::with_capacity(payload.uuid_to_yaml.len());
        for (uuid, entry) in payload.uuid_to_yaml {
            if entry.uuid != uuid {
                return Err(IndexError::corrupt(format!(
                    "uuidToYaml key '{uuid}' holds entry for '{}'",
                    entry.uuid
                )));
            }
            uuid_to_yaml.insert(uuid, Arc::new(entry));
        }

        let mut yaml_to_uuid = HashMap::with_capacity(payload.yaml_to_uuid.len());
        for (yaml_id, entry) in payload.yaml_to_uuid {
            if entry.yaml_id != yaml_id {
                return Err(IndexError::corrupt(format!(
                    "yamlToUuid key '{yaml_id}' holds entry for '{}'",
                    entry.yaml_id
                )));
            }
            let mirror = match uuid_to_yaml.get(&entry.uuid) {
                Some(mirror) if **mirror == entry => Arc::clone(mirror),
                _ => {
                    return Err(IndexError::corrupt(format!(
                        "yamlToUuid entry '{yaml_id}' has no matching uuidToYaml entry"
                    )))
                }
            };
            yaml_to_uuid.insert(yaml_id, mirror);
        }

        Ok(Self {
            yaml_to_uuid,
            uuid_to_yaml,
            last_updated: payload.last_updated,
        })
    }

    /// Decode a raw cache value
    ///
    /// # Errors
    /// Returns `IndexError::CorruptCache` for any shape or invariant violation.
    pub fn from_cache_value(value: serde_json::Value) -> IndexResult<Self> {
        let payload: SerializedIndex = serde_json::from_value(value)
            .map_err(|e| IndexError::corrupt(e.to_string()))?;
        Self::from_serialized(payload)
    }

    /// Encode as a raw cache value
    ///
    /// # Errors
    /// Returns `serde_json::Error` if encoding fails.
    pub fn to_cache_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.to_serialized())
    }
}

impl Default for ScenarioIndex {
    fn default() -> Self {
        Self::empty()
    }
}

fn sorted_pairs(map: &HashMap<String, Arc<ScenarioIndexEntry>>) -> Vec<(String, ScenarioIndexEntry)> {
    let mut pairs: Vec<(String, ScenarioIndexEntry)> = map
        .iter()
        .map(|(k, v)| (k.clone(), ScenarioIndexEntry::clone(v)))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

/// Cache payload: both maps flattened to key/entry pair lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedIndex {
    /// `yamlToUuid` pairs, sorted by key
    pub yaml_to_uuid: Vec<(String, ScenarioIndexEntry)>,
    /// `uuidToYaml` pairs, sorted by key
    pub uuid_to_yaml: Vec<(String, ScenarioIndexEntry)>,
    /// Construction time
    pub last_updated: DateTime<Utc>,
}

/// Summary counts of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Entries in `yamlToUuid`
    pub yaml_ids: usize,
    /// Entries in `uuidToYaml`
    pub uuids: usize,
    /// UUID entries per source
    pub by_source: BTreeMap<SourceType, usize>,
    /// Construction time of the index
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn item(id: &str, source: SourceType, yaml_id: Option<&str>) -> ContentItem {
        let item = ContentItem::new(id, source).with_updated_at("2024-01-01");
        match yaml_id {
            Some(y) => item.with_yaml_id(y),
            None => item,
        }
    }

    #[test]
    fn single_item_scenario() {
        let items = vec![ContentItem::new("u1", SourceType::Pbl)
            .with_yaml_id("pbl-1")
            .with_title("T1")
            .with_updated_at("2024-01-01")];
        let index = ScenarioIndex::from_items(&items);

        assert_eq!(index.uuid_for("pbl-1"), Some("u1"));
        assert_eq!(index.yaml_id_for("u1"), Some("pbl-1"));
        assert_eq!(
            index.entry_by_uuid("u1"),
            Some(&ScenarioIndexEntry {
                yaml_id: "pbl-1".to_string(),
                uuid: "u1".to_string(),
                source_type: SourceType::Pbl,
                title: Some("T1".to_string()),
                last_updated: "2024-01-01".to_string(),
            })
        );
        assert_eq!(index.uuid_for("missing"), None);
    }

    #[test]
    fn empty_input_gives_empty_maps() {
        let index = ScenarioIndex::from_items(&Vec::<ContentItem>::new());
        assert!(index.is_empty());
        assert_eq!(index.yaml_len(), 0);
        assert_eq!(index.uuid_len(), 0);
    }

    #[test]
    fn later_duplicate_wins() {
        let items = vec![
            item("u1", SourceType::Pbl, Some("shared")),
            item("u2", SourceType::Discovery, Some("shared")),
        ];
        let index = ScenarioIndex::from_items(&items);

        assert_eq!(index.uuid_for("shared"), Some("u2"));
        assert_eq!(index.yaml_len(), 1);
        // both UUIDs keep their reverse mapping
        assert_eq!(index.yaml_id_for("u1"), Some("shared"));
        assert_eq!(index.yaml_id_for("u2"), Some("shared"));
    }

    #[test]
    fn reused_uuid_moves_to_new_yaml_id() {
        let items = vec![
            item("u1", SourceType::Pbl, Some("old-slug")),
            item("u1", SourceType::Pbl, Some("new-slug")),
        ];
        let index = ScenarioIndex::from_items(&items);

        assert_eq!(index.uuid_for("old-slug"), None);
        assert_eq!(index.uuid_for("new-slug"), Some("u1"));
        assert_eq!(index.yaml_id_for("u1"), Some("new-slug"));
        assert_eq!(index.yaml_len(), 1);

        let restored = ScenarioIndex::from_serialized(index.to_serialized()).unwrap();
        assert_eq!(restored.to_serialized(), index.to_serialized());
    }

    #[test]
    fn reused_uuid_keeps_yaml_key_taken_by_another_uuid() {
        let items = vec![
            item("u1", SourceType::Pbl, Some("shared")),
            item("u2", SourceType::Assessment, Some("shared")),
            item("u1", SourceType::Pbl, Some("renamed")),
        ];
        let index = ScenarioIndex::from_items(&items);

        assert_eq!(index.uuid_for("shared"), Some("u2"));
        assert_eq!(index.uuid_for("renamed"), Some("u1"));
        assert_eq!(index.yaml_id_for("u1"), Some("renamed"));
        assert!(ScenarioIndex::from_serialized(index.to_serialized()).is_ok());
    }

    #[test]
    fn batch_lookup_omits_unknown_ids() {
        let items = vec![
            item("u1", SourceType::Pbl, Some("a")),
            item("u2", SourceType::Assessment, Some("b")),
        ];
        let index = ScenarioIndex::from_items(&items);

        let found = index.uuids_for(&["a", "nope", "b"]);
        assert_eq!(found.len(), 2);
        assert_eq!(found["a"], "u1");
        assert_eq!(found["b"], "u2");
    }

    #[test]
    fn stats_count_per_source() {
        let items = vec![
            item("u1", SourceType::Pbl, Some("a")),
            item("u2", SourceType::Pbl, Some("b")),
            item("u3", SourceType::Discovery, Some("c")),
            item("u4", SourceType::Assessment, None),
        ];
        let stats = ScenarioIndex::from_items(&items).stats();

        assert_eq!(stats.yaml_ids, 3);
        assert_eq!(stats.uuids, 3);
        assert_eq!(stats.by_source[&SourceType::Pbl], 2);
        assert_eq!(stats.by_source[&SourceType::Assessment], 0);
        assert_eq!(stats.by_source[&SourceType::Discovery], 1);
    }

    #[test]
    fn entries_by_source_sorted() {
        let items = vec![
            item("u1", SourceType::Pbl, Some("z")),
            item("u2", SourceType::Pbl, Some("a")),
            item("u3", SourceType::Discovery, Some("m")),
        ];
        let index = ScenarioIndex::from_items(&items);

        let ids: Vec<String> = index
            .entries_by_source(SourceType::Pbl)
            .into_iter()
            .map(|e| e.yaml_id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "z".to_string()]);
    }

    #[test]
    fn cache_value_roundtrip() {
        let items = vec![
            item("u1", SourceType::Pbl, Some("a")),
            item("u2", SourceType::Assessment, Some("b")),
        ];
        let index = ScenarioIndex::from_items(&items);

        let value = index.to_cache_value().unwrap();
        assert!(value["yamlToUuid"].is_array());

        let restored = ScenarioIndex::from_cache_value(value).unwrap();
        assert_eq!(restored.uuid_for("a"), Some("u1"));
        assert_eq!(restored.yaml_id_for("u2"), Some("b"));
        assert_eq!(restored.last_updated(), index.last_updated());
    }

    #[test]
    fn malformed_cache_value_is_rejected() {
        let value = json!({ "yamlToUuid": "not-an-array", "uuidToYaml": null });
        let err = ScenarioIndex::from_cache_value(value).unwrap_err();
        assert!(matches!(err, IndexError::CorruptCache { .. }));
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let mut payload = ScenarioIndex::from_items(&[item("u1", SourceType::Pbl, Some("a"))])
            .to_serialized();
        payload.yaml_to_uuid[0].0 = "other".to_string();

        assert!(ScenarioIndex::from_serialized(payload).is_err());
    }

    #[test]
    fn missing_mirror_is_rejected() {
        let mut payload = ScenarioIndex::from_items(&[item("u1", SourceType::Pbl, Some("a"))])
            .to_serialized();
        payload.uuid_to_yaml.clear();

        let err = ScenarioIndex::from_serialized(payload).unwrap_err();
        assert!(err.to_string().contains("no matching uuidToYaml"));
    }

    // UUIDs come from a small pool so items collide on both keys
    fn arb_items() -> impl Strategy<Value = Vec<ContentItem>> {
        prop::collection::vec(
            (
                0..12usize,
                prop::option::of("[a-z]{1,2}-[0-9]"),
                prop::sample::select(SourceType::ALL.to_vec()),
            ),
            0..40,
        )
        .prop_map(|rows| {
            rows
                .into_iter()
                .map(|(uuid, yaml_id, source)| {
                    let item = ContentItem::new(format!("uuid-{uuid}"), source);
                    match yaml_id {
                        Some(y) => item.with_yaml_id(y),
                        None => item,
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn every_winning_yaml_id_round_trips(items in arb_items()) {
            let index = ScenarioIndex::from_items(&items);

            for entry in index.yaml_entries() {
                let uuid = index.uuid_for(&entry.yaml_id).unwrap();
                prop_assert_eq!(index.yaml_id_for(uuid), Some(entry.yaml_id.as_str()));
                prop_assert_eq!(index.entry_by_uuid(uuid), Some(entry));
            }
        }

        #[test]
        fn last_occurrence_wins(items in arb_items()) {
            let index = ScenarioIndex::from_items(&items);

            for (pos, item) in items.iter().enumerate() {
                let Some(yaml_id) = item.yaml_id() else { continue };
                let last = items.iter().rposition(|i| i.yaml_id() == Some(yaml_id)).unwrap();
                if pos != last {
                    continue;
                }
                // a later item reusing the UUID under another yaml id takes it over
                let moved = items[last + 1..]
                    .iter()
                    .any(|i| i.id == item.id && i.yaml_id().is_some());
                let expected = (!moved).then_some(item.id.as_str());
                prop_assert_eq!(index.uuid_for(yaml_id), expected);
            }
        }

        #[test]
        fn only_items_with_yaml_ids_are_indexed(items in arb_items()) {
            let index = ScenarioIndex::from_items(&items);
            let with_yaml: std::collections::HashSet<&str> = items
                .iter()
                .filter(|i| i.yaml_id().is_some())
                .map(|i| i.id.as_str())
                .collect();

            prop_assert_eq!(index.uuid_len(), with_yaml.len());
            for item in items.iter().filter(|i| !with_yaml.contains(i.id.as_str())) {
                prop_assert!(index.entry_by_uuid(&item.id).is_none());
            }
        }

        #[test]
        fn serialized_index_always_decodes(items in arb_items()) {
            let index = ScenarioIndex::from_items(&items);
            let payload = index.to_serialized();

            let restored = ScenarioIndex::from_serialized(payload.clone());
            prop_assert!(restored.is_ok());
            prop_assert_eq!(restored.unwrap().to_serialized(), payload);
        }
    }
}
