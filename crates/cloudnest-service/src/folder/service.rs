//! Cache-first listing for every read-side surface.

use std::sync::Arc;

use tracing::debug;

use cloudnest_cache::{CacheValue, ItemStore, keys};
use cloudnest_client::{FileApi, ListQuery};
use cloudnest_core::result::AppResult;
use cloudnest_core::types::ItemId;
use cloudnest_entity::{Item, ItemKind, PathSegment, TreeNode};

use super::tree::TreeBuilder;

/// Options for [`ItemService::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Skip the cache and refetch.
    pub force_refresh: bool,
    /// Keep only files or only folders.
    pub kind: Option<ItemKind>,
}

impl ListOptions {
    /// Options that bypass the cache.
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }
}

/// Serves listings, trees and breadcrumbs through the [`ItemStore`].
///
/// A miss fetches every page, stores the result and returns it. Two
/// concurrent misses on one key both fetch; the later `set` wins.
#[derive(Debug, Clone)]
pub struct ItemService {
    /// Backend.
    api: Arc<dyn FileApi>,
    /// Shared cache.
    store: Arc<ItemStore>,
    /// Tree construction.
    tree: TreeBuilder,
}

impl ItemService {
    /// Creates a new item service.
    pub fn new(api: Arc<dyn FileApi>, store: Arc<ItemStore>, tree: TreeBuilder) -> Self {
        Self { api, store, tree }
    }

    /// The tree builder in use.
    pub fn tree_builder(&self) -> &TreeBuilder {
        &self.tree
    }

    /// Items directly under `parent_id` (`None` = root).
    pub async fn list(&self, parent_id: Option<&ItemId>, options: &ListOptions) -> AppResult<Vec<Item>> {
        let key = keys::files(parent_id);
        let items = match self.cached_items(&key, options.force_refresh) {
            Some(items) => items,
            None => {
                let items = self
                    .api
                    .list_all(&ListQuery::children_of(parent_id.cloned()))
                    .await?;
                self.store.set(&key, CacheValue::Items(items.clone()));
                items
            }
        };

        Ok(match options.kind {
            Some(kind) => items.into_iter().filter(|i| i.kind == kind).collect(),
            None => items,
        })
    }

    /// The flat folder listing behind trees and breadcrumbs.
    pub async fn folder_tree(&self, force_refresh: bool) -> AppResult<Vec<Item>> {
        let key = keys::folder_tree();
        if let Some(items) = self.cached_items(&key, force_refresh) {
            return Ok(items);
        }
        let folders = self.api.folder_tree().await?;
        self.store.set(&key, CacheValue::Items(folders.clone()));
        Ok(folders)
    }

    /// Sidebar nodes for the folders directly under `parent_id`.
    ///
    /// Nodes come back unloaded; see [`Self::expand`].
    pub async fn forest(&self, parent_id: Option<&ItemId>) -> AppResult<Vec<TreeNode>> {
        let key = keys::folders(parent_id);
        if let Some(nodes) = self.store.get(&key).and_then(|v| v.as_tree().map(<[TreeNode]>::to_vec)) {
            debug!(key = %key, "Forest served from cache");
            return Ok(nodes);
        }

        let folders = self
            .list(
                parent_id,
                &ListOptions {
                    kind: Some(ItemKind::Folder),
                    ..ListOptions::default()
                },
            )
            .await?;
        let nodes = self.tree.build_forest(&folders);
        self.store.set(&key, CacheValue::Tree(nodes.clone()));
        Ok(nodes)
    }

    /// Load a sidebar node's own listing and mark it loaded.
    pub async fn expand(&self, node: &mut TreeNode) -> AppResult<()> {
        let id = node.id().clone();
        let items = self.list(Some(&id), &ListOptions::default()).await?;
        let (folders, files): (Vec<Item>, Vec<Item>) = items.into_iter().partition(Item::is_folder);
        node.children = self.tree.build_forest(&folders);
        node.files = files;
        node.is_loaded = true;
        Ok(())
    }

    /// Breadcrumb trail for a folder, root first.
    ///
    /// A folder missing from the cached tree triggers one refetch; if it is
    /// still unknown a `Folder <id>` placeholder is returned.
    pub async fn breadcrumb(&self, folder_id: &ItemId) -> AppResult<Vec<PathSegment>> {
        let mut folders = self.folder_tree(false).await?;
        if !folders.iter().any(|f| &f.id == folder_id) {
            debug!(folder_id = %folder_id, "Folder not in cached tree, refetching");
            folders = self.folder_tree(true).await?;
        }
        Ok(self.tree.resolve_path(folder_id, &folders))
    }

    /// Folders `subjects` may be moved into.
    ///
    /// Always refetches the folder tree so exclusions use the freshest
    /// links available.
    pub async fn move_targets(&self, subjects: &[ItemId]) -> AppResult<Vec<TreeNode>> {
        let folders = self.folder_tree(true).await?;
        Ok(self.tree.move_targets(&folders, subjects))
    }

    /// Server-side name search, cached under the search namespace.
    pub async fn search_remote(&self, query: &str, force_refresh: bool) -> AppResult<Vec<Item>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let key = keys::search(query);
        if let Some(items) = self.cached_items(&key, force_refresh) {
            return Ok(items);
        }
        let items = self.api.list_all(&ListQuery::search(query)).await?;
        self.store.set(&key, CacheValue::Items(items.clone()));
        Ok(items)
    }

    fn cached_items(&self, key: &str, force_refresh: bool) -> Option<Vec<Item>> {
        if force_refresh {
            debug!(key, "Cache bypassed");
            return None;
        }
        self.store.get_items(key)
    }
}
