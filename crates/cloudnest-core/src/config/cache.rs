//! Item cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the persisted item cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// File that backs durable storage for the file adapter.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Durable-storage key holding the serialized cache blob.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Durable-storage key holding the bearer token.
    #[serde(default = "default_auth_token_key")]
    pub auth_token_key: String,
    /// TTL for generic list entries, in hours.
    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: u64,
    /// TTL for folder-oriented entries, in days.
    #[serde(default = "default_folder_ttl_days")]
    pub folder_ttl_days: u64,
    /// Maximum age of the whole persisted blob, in hours.
    #[serde(default = "default_ttl_hours")]
    pub global_ttl_hours: u64,
}

impl CacheConfig {
    /// TTL applied to generic entries.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_hours * 3600)
    }

    /// TTL applied to folder-oriented entries.
    pub fn folder_ttl(&self) -> Duration {
        Duration::from_secs(self.folder_ttl_days * 86_400)
    }

    /// Maximum age of the persisted blob.
    pub fn global_ttl(&self) -> Duration {
        Duration::from_secs(self.global_ttl_hours * 3600)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            storage_key: default_storage_key(),
            auth_token_key: default_auth_token_key(),
            default_ttl_hours: default_ttl_hours(),
            folder_ttl_days: default_folder_ttl_days(),
            global_ttl_hours: default_ttl_hours(),
        }
    }
}

fn default_storage_path() -> String {
    "./data/cloudnest-storage.json".to_string()
}

fn default_storage_key() -> String {
    "cloudnest_item_cache".to_string()
}

fn default_auth_token_key() -> String {
    "auth_token".to_string()
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_folder_ttl_days() -> u64 {
    7
}
