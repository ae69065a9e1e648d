//! Cache key builders for all CloudNest cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the client uses. The prefix also selects the TTL
//! category of an entry.

use std::time::Duration;

use cloudnest_core::config::cache::CacheConfig;
use cloudnest_core::types::ItemId;

/// Prefix of flat list responses per parent.
const FILES_PREFIX: &str = "files_";
/// Prefix of folder-oriented entries (longer TTL).
const FOLDERS_PREFIX: &str = "folders_";
/// Prefix of server-side search responses.
const SEARCH_PREFIX: &str = "search_";

/// Cache key for the flat listing of a parent (`None` = root).
pub fn files(parent_id: Option<&ItemId>) -> String {
    format!("{FILES_PREFIX}{}", scope(parent_id))
}

/// Cache key for the folders-only listing of a parent.
pub fn folders(parent_id: Option<&ItemId>) -> String {
    format!("{FOLDERS_PREFIX}{}", scope(parent_id))
}

/// Cache key for the whole folder tree response.
pub fn folder_tree() -> String {
    format!("{FOLDERS_PREFIX}tree")
}

/// Cache key for a server-side search response.
pub fn search(query: &str) -> String {
    format!("{SEARCH_PREFIX}{}", query.trim().to_lowercase())
}

/// Every key a change under `parent_id` can make stale.
pub fn parent_scope(parent_id: Option<&ItemId>) -> Vec<String> {
    vec![files(parent_id), folders(parent_id)]
}

/// Whether the key belongs to the search namespace.
pub fn is_search(key: &str) -> bool {
    key.starts_with(SEARCH_PREFIX)
}

fn scope(parent_id: Option<&ItemId>) -> String {
    match parent_id {
        Some(id) if !id.as_str().is_empty() => id.to_string(),
        _ => "root".to_string(),
    }
}

/// TTL bucket an entry falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlCategory {
    /// Generic list responses.
    Standard,
    /// Folder-oriented responses, which change less often.
    Folder,
}

impl TtlCategory {
    /// TTL of this category under the given configuration.
    pub fn ttl(&self, config: &CacheConfig) -> Duration {
        match self {
            Self::Standard => config.default_ttl(),
            Self::Folder => config.folder_ttl(),
        }
    }
}

/// Pick the TTL category from a key's prefix.
pub fn ttl_category(key: &str) -> TtlCategory {
    if key.starts_with(FOLDERS_PREFIX) {
        TtlCategory::Folder
    } else {
        TtlCategory::Standard
    }
}
