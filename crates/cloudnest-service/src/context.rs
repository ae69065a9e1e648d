//! Composition root shared by every consumer of the service layer.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use cloudnest_cache::ItemStore;
use cloudnest_cache::storage::FileStorage;
use cloudnest_client::{FileApi, HttpFileApi, TokenStore};
use cloudnest_core::config::ClientConfig;
use cloudnest_core::events::{InvalidationBus, SearchMode, Subscription};
use cloudnest_core::result::AppResult;
use cloudnest_core::traits::DurableStorage;

use crate::file::{MutationGateway, UploadPipeline};
use crate::folder::{ItemService, TreeBuilder};
use crate::search::{SearchBox, SearchIndexer};
use crate::surface::attach_search_index;

/// Every service, wired once and shared through `Arc`s.
#[derive(Debug, Clone)]
pub struct DriveContext {
    // ── Configuration ────────────────────────────────────────
    /// Client configuration
    pub config: Arc<ClientConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// Durable storage backing the cache and the token
    pub storage: Arc<dyn DurableStorage>,
    /// Bearer token persistence
    pub tokens: TokenStore,
    /// Item cache
    pub store: Arc<ItemStore>,
    /// Invalidation bus
    pub bus: Arc<InvalidationBus>,
    /// REST backend
    pub api: Arc<dyn FileApi>,

    // ── Services ─────────────────────────────────────────────
    /// Cache-first listings, trees and breadcrumbs
    pub items: ItemService,
    /// Client-side search index
    pub indexer: Arc<SearchIndexer>,
    /// Concurrent uploads
    pub uploads: Arc<UploadPipeline>,
    /// The only mutation path
    pub mutations: MutationGateway,
}

impl DriveContext {
    /// Wire the services over an existing storage and backend.
    pub fn new(config: ClientConfig, storage: Arc<dyn DurableStorage>, api: Arc<dyn FileApi>) -> Self {
        let config = Arc::new(config);
        let tokens = TokenStore::new(Arc::clone(&storage), config.cache.auth_token_key.clone());
        let store = Arc::new(ItemStore::load(Arc::clone(&storage), config.cache.clone()));
        let bus = InvalidationBus::new();

        let tree = TreeBuilder::new(&config.tree);
        let items = ItemService::new(Arc::clone(&api), Arc::clone(&store), tree);
        let indexer = Arc::new(SearchIndexer::new(items.clone(), config.search.max_depth));
        let uploads = Arc::new(UploadPipeline::new(Arc::clone(&api), config.upload.clone()));
        let mutations = MutationGateway::new(
            Arc::clone(&api),
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&uploads),
            config.tree.root_sentinels.clone(),
        );

        info!(cached = store.len(), "Drive context ready");
        Self {
            config,
            storage,
            tokens,
            store,
            bus,
            api,
            items,
            indexer,
            uploads,
            mutations,
        }
    }

    /// Wire the services over file-backed storage and the HTTP backend.
    pub fn connect(config: ClientConfig) -> AppResult<Self> {
        let storage: Arc<dyn DurableStorage> = Arc::new(FileStorage::open(&config.cache.storage_path)?);
        let tokens = TokenStore::new(Arc::clone(&storage), config.cache.auth_token_key.clone());
        let api: Arc<dyn FileApi> = Arc::new(HttpFileApi::new(&config.api, tokens)?);
        info!(base_url = %config.api.base_url, "Connecting to backend");
        Ok(Self::new(config, storage, api))
    }

    /// A search box using the configured debounce delay.
    pub fn search_box(&self, mode: SearchMode) -> SearchBox {
        SearchBox::new(
            Arc::clone(&self.bus),
            Arc::clone(&self.indexer),
            mode,
            self.debounce(),
        )
    }

    /// Clear and re-run the search index whenever its triggers fire.
    pub fn keep_index_fresh(&self) -> Vec<Subscription> {
        attach_search_index(&self.bus, Arc::clone(&self.indexer))
    }

    fn debounce(&self) -> Duration {
        self.config.search.debounce()
    }
}
