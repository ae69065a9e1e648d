//! Search indexer and tree construction configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the recursive search indexer and the search box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Debounce applied to free-text input, in milliseconds.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    /// Maximum folder depth walked by the indexer.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl SearchConfig {
    /// Debounce delay, clamped into the 300..=500 ms window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.clamp(300, 500))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            max_depth: default_max_depth(),
        }
    }
}

/// Settings for forest building and breadcrumb resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Hard cap on parent hops walked while resolving a breadcrumb.
    #[serde(default = "default_max_hops")]
    pub max_path_hops: usize,
    /// Parent ids that the backend uses to mean "root".
    #[serde(default = "default_root_sentinels")]
    pub root_sentinels: Vec<String>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_path_hops: default_max_hops(),
            root_sentinels: default_root_sentinels(),
        }
    }
}

fn default_debounce() -> u64 {
    300
}

fn default_max_depth() -> usize {
    32
}

fn default_max_hops() -> usize {
    16
}

fn default_root_sentinels() -> Vec<String> {
    vec![
        String::new(),
        "0".to_string(),
        "root".to_string(),
        "null".to_string(),
    ]
}
