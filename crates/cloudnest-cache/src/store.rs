//! The persisted item cache.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cloudnest_core::config::cache::CacheConfig;
use cloudnest_core::result::AppResult;
use cloudnest_core::traits::DurableStorage;
use cloudnest_entity::{Item, TreeNode};

use crate::codec::{self, PersistedBlob};
use crate::keys;

/// A cached list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    /// A pre-built forest.
    Tree(Vec<TreeNode>),
    /// A flat listing.
    Items(Vec<Item>),
}

impl CacheValue {
    /// The flat listing, if this value holds one.
    ///
    /// An empty array decodes as an empty forest, so that case also yields
    /// an empty listing.
    pub fn as_items(&self) -> Option<&[Item]> {
        match self {
            Self::Items(items) => Some(items),
            Self::Tree(nodes) if nodes.is_empty() => Some(&[]),
            Self::Tree(_) => None,
        }
    }

    /// The forest, if this value holds one.
    pub fn as_tree(&self) -> Option<&[TreeNode]> {
        match self {
            Self::Tree(nodes) => Some(nodes),
            Self::Items(items) if items.is_empty() => Some(&[]),
            Self::Items(_) => None,
        }
    }

    /// Number of top-level records.
    pub fn len(&self) -> usize {
        match self {
            Self::Tree(nodes) => nodes.len(),
            Self::Items(items) => items.len(),
        }
    }

    /// Whether the value holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value plus the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached response.
    pub data: CacheValue,
    /// Write time in Unix milliseconds.
    pub timestamp: i64,
}

impl CacheEntry {
    fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis().saturating_sub(self.timestamp)
    }
}

/// Process-wide cache of list responses, mirrored to durable storage.
///
/// Reads and writes are synchronous. Every mutating call rewrites the whole
/// persisted blob, so treat `set` as O(total cache size). Persistence
/// failures are logged and swallowed: the in-memory map stays
/// authoritative for the rest of the session.
///
/// Two concurrent fetches of the same key may both miss and both `set`;
/// the last writer wins and the store stays consistent.
#[derive(Debug)]
pub struct ItemStore {
    /// Key → entry.
    entries: DashMap<String, CacheEntry>,
    /// Durable mirror.
    storage: Arc<dyn DurableStorage>,
    /// TTLs and the storage key.
    config: CacheConfig,
    /// Serializes blob rewrites so snapshots land in order.
    persist_lock: Mutex<()>,
}

impl ItemStore {
    /// Load the store from durable storage using the current time.
    pub fn load(storage: Arc<dyn DurableStorage>, config: CacheConfig) -> Self {
        Self::load_at(storage, config, Utc::now())
    }

    /// Load the store, evaluating TTLs against `now`.
    ///
    /// A blob that cannot be read or decoded, or that is older than the
    /// global TTL, is discarded as a whole. Surviving entries are then
    /// dropped individually when older than their category TTL.
    pub fn load_at(storage: Arc<dyn DurableStorage>, config: CacheConfig, now: DateTime<Utc>) -> Self {
        let store = Self {
            entries: DashMap::new(),
            storage,
            config,
            persist_lock: Mutex::new(()),
        };

        let raw = match store.storage.read(&store.config.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return store,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted cache, starting empty");
                return store;
            }
        };

        let blob = match codec::decode(&raw) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Discarding corrupt persisted cache");
                store.discard_persisted();
                return store;
            }
        };

        let blob_age = now.timestamp_millis().saturating_sub(blob.timestamp);
        if blob_age > millis(store.config.global_ttl()) {
            info!(age_ms = blob_age, "Discarding expired persisted cache");
            store.discard_persisted();
            return store;
        }

        let mut dropped = 0usize;
        for (key, entry) in blob.data {
            let ttl = keys::ttl_category(&key).ttl(&store.config);
            if entry.age_millis(now) > millis(ttl) {
                dropped += 1;
                continue;
            }
            store.entries.insert(key, entry);
        }

        debug!(
            loaded = store.entries.len(),
            dropped, "Loaded persisted cache"
        );
        store
    }

    /// Get a cached value.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        let value = self.entries.get(key).map(|e| e.data.clone());
        debug!(key, hit = value.is_some(), "Cache lookup");
        value
    }

    /// Get a cached flat listing.
    pub fn get_items(&self, key: &str) -> Option<Vec<Item>> {
        self.get(key).and_then(|v| v.as_items().map(<[Item]>::to_vec))
    }

    /// Whether a key is cached.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store a value and rewrite the persisted blob.
    pub fn set(&self, key: &str, data: CacheValue) {
        let entry = CacheEntry {
            data,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.entries.insert(key.to_string(), entry);
        self.persist();
    }

    /// Remove a key. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Remove several keys with a single blob rewrite.
    ///
    /// Returns the keys that were actually present.
    pub fn invalidate_many<I, S>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed: Vec<String> = keys
            .into_iter()
            .filter_map(|k| self.entries.remove(k.as_ref()).map(|(key, _)| key))
            .collect();
        if !removed.is_empty() {
            self.persist();
        }
        removed
    }

    /// Drop every entry, in memory and in durable storage.
    pub fn clear(&self) {
        self.entries.clear();
        self.discard_persisted();
    }

    /// All cached keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write time of an entry.
    pub fn written_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries
            .get(key)
            .and_then(|e| DateTime::from_timestamp_millis(e.timestamp))
    }

    fn persist(&self) {
        let _guard = match self.persist_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut data: Vec<(String, CacheEntry)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        data.sort_by(|a, b| a.0.cmp(&b.0));

        let blob = PersistedBlob {
            data,
            timestamp: Utc::now().timestamp_millis(),
        };

        if let Err(e) = self.write_blob(&blob) {
            warn!(error = %e, entries = blob.data.len(), "Failed to persist cache");
        }
    }

    fn write_blob(&self, blob: &PersistedBlob) -> AppResult<()> {
        let encoded = codec::encode(blob)?;
        self.storage.write(&self.config.storage_key, &encoded)
    }

    fn discard_persisted(&self) {
        if let Err(e) = self.storage.remove(&self.config.storage_key) {
            warn!(error = %e, "Failed to remove persisted cache");
        }
    }
}

fn millis(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::Duration;

    fn config() -> CacheConfig {
        CacheConfig::default()
    }

    fn listing() -> CacheValue {
        CacheValue::Items(vec![
            Item::folder("1", "A"),
            Item::file("2", "a.txt").with_parent("1"),
        ])
    }

    fn write_blob(storage: &MemoryStorage, entries: Vec<(&str, i64)>, blob_ts: i64) {
        let blob = PersistedBlob {
            data: entries
                .into_iter()
                .map(|(k, ts)| {
                    (
                        k.to_string(),
                        CacheEntry {
                            data: listing(),
                            timestamp: ts,
                        },
                    )
                })
                .collect(),
            timestamp: blob_ts,
        };
        storage
            .write(&config().storage_key, &codec::encode(&blob).unwrap())
            .unwrap();
    }

    #[test]
    fn test_set_get_delete() {
        let store = ItemStore::load(Arc::new(MemoryStorage::new()), config());
        store.set("files_root", listing());
        assert_eq!(store.get("files_root"), Some(listing()));

        assert!(store.delete("files_root"));
        assert_eq!(store.get("files_root"), None);
        assert!(!store.delete("files_root"));
    }

    #[test]
    fn test_set_is_idempotent_per_key() {
        let store = ItemStore::load(Arc::new(MemoryStorage::new()), config());
        store.set("files_root", listing());
        store.set("files_root", listing());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_items("files_root").map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_set_writes_through_and_reloads() {
        let storage = Arc::new(MemoryStorage::new());
        let store = ItemStore::load(storage.clone(), config());
        store.set("files_root", listing());
        store.set("folders_tree", CacheValue::Tree(Vec::new()));

        let reloaded = ItemStore::load(storage, config());
        assert_eq!(reloaded.keys(), vec!["files_root", "folders_tree"]);
        assert_eq!(reloaded.get("files_root"), Some(listing()));
    }

    #[test]
    fn test_blob_older_than_global_ttl_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        let now = Utc::now();
        let old = (now - Duration::hours(25)).timestamp_millis();
        write_blob(&storage, vec![("files_root", old), ("folders_tree", old)], old);

        let store = ItemStore::load_at(storage.clone(), config(), now);
        assert!(store.is_empty());
        assert!(storage.raw(&config().storage_key).is_none());
    }

    #[test]
    fn test_entries_expire_by_category() {
        let storage = Arc::new(MemoryStorage::new());
        let now = Utc::now();
        let two_days = (now - Duration::days(2)).timestamp_millis();
        let eight_days = (now - Duration::days(8)).timestamp_millis();
        let fresh = now.timestamp_millis();
        write_blob(
            &storage,
            vec![
                ("files_1", two_days),
                ("folders_tree", two_days),
                ("folders_2", eight_days),
                ("files_root", fresh),
            ],
            fresh,
        );

        let store = ItemStore::load_at(storage, config(), now);
        assert_eq!(store.keys(), vec!["files_root", "folders_tree"]);
    }

    #[test]
    fn test_corrupt_blob_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .write(&config().storage_key, "definitely not a cache")
            .unwrap();

        let store = ItemStore::load(storage.clone(), config());
        assert!(store.is_empty());
        assert!(storage.raw(&config().storage_key).is_none());
    }

    #[test]
    fn test_persist_failure_keeps_memory_authoritative() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_fail_writes(true);
        let store = ItemStore::load(storage.clone(), config());

        store.set("files_root", listing());
        assert_eq!(store.get("files_root"), Some(listing()));
        assert!(storage.raw(&config().storage_key).is_none());
    }

    #[test]
    fn test_invalidate_many_reports_present_keys() {
        let store = ItemStore::load(Arc::new(MemoryStorage::new()), config());
        store.set("files_1", listing());
        store.set("files_2", listing());

        let removed = store.invalidate_many(["files_1", "files_3"]);
        assert_eq!(removed, vec!["files_1".to_string()]);
        assert!(store.contains("files_2"));
    }

    #[test]
    fn test_clear_removes_persisted_blob() {
        let storage = Arc::new(MemoryStorage::new());
        let store = ItemStore::load(storage.clone(), config());
        store.set("files_root", listing());
        assert!(storage.raw(&config().storage_key).is_some());

        store.clear();
        assert!(store.is_empty());
        assert!(storage.raw(&config().storage_key).is_none());
    }
}
