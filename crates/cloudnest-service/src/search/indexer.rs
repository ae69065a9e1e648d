//! Client-side recursive search index.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cloudnest_core::types::ItemId;
use cloudnest_entity::{Item, SearchResult};

use crate::folder::{ItemService, ListOptions};

/// Outcome of an [`SearchIndexer::index_all`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Another pass was already running; nothing was done.
    AlreadyRunning,
    /// The pass walked the hierarchy.
    Completed {
        /// Folders whose listing was indexed (root included).
        folders: usize,
        /// Items indexed.
        items: usize,
        /// Folders skipped because their fetch failed.
        failed: usize,
    },
}

/// Walks every folder and answers substring queries over item names.
///
/// The indexer holds no bus subscription: whoever owns it clears and
/// re-runs it after mutations (see `Surface::SearchIndex`).
#[derive(Debug)]
pub struct SearchIndexer {
    /// Listing source.
    items: ItemService,
    /// Parent (`None` = root) → its listing.
    index: DashMap<Option<ItemId>, Vec<Item>>,
    /// Set while a pass runs.
    in_flight: AtomicBool,
    /// Folder depth cap.
    max_depth: usize,
}

/// Clears the in-flight flag when a pass ends, even by panic or abort.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SearchIndexer {
    /// Creates a new indexer.
    pub fn new(items: ItemService, max_depth: usize) -> Self {
        Self {
            items,
            index: DashMap::new(),
            in_flight: AtomicBool::new(false),
            max_depth,
        }
    }

    /// Index every folder reachable from root.
    ///
    /// Returns immediately with [`IndexOutcome::AlreadyRunning`] while
    /// another pass is in flight. A folder whose fetch fails is logged and
    /// skipped along with its subtree.
    pub async fn index_all(&self, force_refresh: bool) -> IndexOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Index pass already running");
            return IndexOutcome::AlreadyRunning;
        }
        let _flag = InFlight(&self.in_flight);

        if force_refresh {
            self.index.clear();
        }
        let options = ListOptions {
            force_refresh,
            ..ListOptions::default()
        };

        let mut queue: VecDeque<(Option<ItemId>, usize)> = VecDeque::from([(None, 0)]);
        let mut visited: HashSet<Option<ItemId>> = HashSet::new();
        let (mut folders, mut indexed, mut failed) = (0usize, 0usize, 0usize);

        while let Some((parent, depth)) = queue.pop_front() {
            if !visited.insert(parent.clone()) {
                continue;
            }
            let listing = match self.items.list(parent.as_ref(), &options).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(parent = ?parent, error = %e, "Skipping folder during indexing");
                    failed += 1;
                    continue;
                }
            };

            if depth < self.max_depth {
                queue.extend(
                    listing
                        .iter()
                        .filter(|item| item.is_folder())
                        .map(|folder| (Some(folder.id.clone()), depth + 1)),
                );
            } else if listing.iter().any(Item::is_folder) {
                warn!(parent = ?parent, depth, "Index depth cap reached");
            }

            folders += 1;
            indexed += listing.len();
            self.index.insert(parent, listing);
        }

        info!(folders, items = indexed, failed, "Search index built");
        IndexOutcome::Completed {
            folders,
            items: indexed,
            failed,
        }
    }

    /// Run [`Self::index_all`] in the background.
    pub fn spawn_index_all(self: &Arc<Self>, force_refresh: bool) -> JoinHandle<IndexOutcome> {
        let indexer = Arc::clone(self);
        tokio::spawn(async move { indexer.index_all(force_refresh).await })
    }

    /// Case-insensitive substring search over indexed names.
    ///
    /// Exact (case-insensitive) name matches come first, then the rest by
    /// name.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let all: Vec<Item> = self
            .index
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        let folders: Vec<Item> = all.iter().filter(|i| i.is_folder()).cloned().collect();

        let tree = self.items.tree_builder();
        let mut prefixes: HashMap<Option<ItemId>, String> = HashMap::new();
        let mut seen: HashSet<&ItemId> = HashSet::new();
        let mut results = Vec::new();

        for item in &all {
            if !item.name.to_lowercase().contains(&needle) || !seen.insert(&item.id) {
                continue;
            }
            let parent = tree.parent_of(item).cloned();
            let prefix = prefixes.entry(parent.clone()).or_insert_with(|| match &parent {
                None => String::new(),
                Some(pid) => tree
                    .resolve_path(pid, &folders)
                    .last()
                    .map(|segment| format!("/{}", segment.path))
                    .unwrap_or_default(),
            });
            results.push(SearchResult {
                path: format!("{prefix}/{}", item.name),
                exact: item.name.to_lowercase() == needle,
                item: item.clone(),
            });
        }

        rank(&mut results);
        results
    }

    /// Drop every indexed listing.
    pub fn clear_index(&self) {
        self.index.clear();
        debug!("Search index cleared");
    }

    /// Whether a pass is running.
    pub fn is_indexing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of folder listings held.
    pub fn indexed_folders(&self) -> usize {
        self.index.len()
    }

    /// Number of items held.
    pub fn indexed_items(&self) -> usize {
        self.index.iter().map(|e| e.value().len()).sum()
    }
}

/// Exact matches first, then by name (case-insensitive), then by id.
fn rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.exact
            .cmp(&a.exact)
            .then_with(|| a.item.name.to_lowercase().cmp(&b.item.name.to_lowercase()))
            .then_with(|| a.item.name.cmp(&b.item.name))
            .then_with(|| a.item.id.as_str().cmp(b.item.id.as_str()))
    });
}
