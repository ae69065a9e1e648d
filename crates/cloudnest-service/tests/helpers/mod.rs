//! Shared helpers for service scenario tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use cloudnest_cache::storage::MemoryStorage;
use cloudnest_client::{FileApi, ListQuery, MoveDestination, UploadFile};
use cloudnest_core::config::ClientConfig;
use cloudnest_core::error::AppError;
use cloudnest_core::result::AppResult;
use cloudnest_core::types::{ItemId, PageResponse};
use cloudnest_entity::Item;
use cloudnest_service::DriveContext;

/// In-memory backend with scripted latency, failures and call counters.
#[derive(Debug, Default)]
pub struct FakeApi {
    items: Mutex<Vec<Item>>,
    trashed: Mutex<Vec<Item>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    /// Parents whose listing fails.
    failing_parents: Mutex<HashSet<Option<ItemId>>>,
    /// Ids whose move call fails.
    failing_moves: Mutex<HashSet<ItemId>>,
    /// File names whose upload fails.
    failing_uploads: Mutex<HashSet<String>>,
    /// Fail every mutation.
    reject_mutations: Mutex<bool>,
    /// Per-name upload latency.
    upload_latency: Mutex<HashMap<String, Duration>>,
    list_latency: Mutex<Duration>,
    page_size: Mutex<Option<u32>>,
    next_id: AtomicU64,
}

impl FakeApi {
    /// A backend holding `items`.
    pub fn with_items(items: Vec<Item>) -> Arc<Self> {
        let api = Self::default();
        *api.items.lock().unwrap() = items;
        api.next_id.store(1000, Ordering::SeqCst);
        Arc::new(api)
    }

    /// Calls made to one operation so far.
    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Current server-side items.
    pub fn items(&self) -> Vec<Item> {
        self.items.lock().unwrap().clone()
    }

    /// Server-side copy of one item.
    pub fn item(&self, id: &str) -> Option<Item> {
        self.items().into_iter().find(|i| i.id.as_str() == id)
    }

    pub fn fail_listing(&self, parent_id: Option<&str>) {
        self.failing_parents
            .lock()
            .unwrap()
            .insert(parent_id.map(ItemId::from));
    }

    pub fn fail_move(&self, id: &str) {
        self.failing_moves.lock().unwrap().insert(ItemId::from(id));
    }

    pub fn fail_upload(&self, name: &str) {
        self.failing_uploads.lock().unwrap().insert(name.to_string());
    }

    pub fn clear_upload_failures(&self) {
        self.failing_uploads.lock().unwrap().clear();
    }

    pub fn reject_mutations(&self, reject: bool) {
        *self.reject_mutations.lock().unwrap() = reject;
    }

    pub fn set_upload_latency(&self, name: &str, latency: Duration) {
        self.upload_latency
            .lock()
            .unwrap()
            .insert(name.to_string(), latency);
    }

    pub fn set_list_latency(&self, latency: Duration) {
        *self.list_latency.lock().unwrap() = latency;
    }

    /// Serve listings in pages of `size`.
    pub fn set_page_size(&self, size: u32) {
        *self.page_size.lock().unwrap() = Some(size);
    }

    fn record(&self, op: &'static str) {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
    }

    fn guard_mutation(&self) -> AppResult<()> {
        if *self.reject_mutations.lock().unwrap() {
            return Err(AppError::external_service("Backend refused the request"));
        }
        Ok(())
    }

    fn fresh_id(&self) -> ItemId {
        ItemId::from(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn update(&self, id: &ItemId, apply: impl FnOnce(&mut Item)) -> AppResult<()> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| AppError::not_found(format!("Item {id} not found")))?;
        apply(item);
        Ok(())
    }

    fn take(&self, ids: &[ItemId]) -> Vec<Item> {
        let mut items = self.items.lock().unwrap();
        let (taken, kept): (Vec<Item>, Vec<Item>) =
            items.drain(..).partition(|i| ids.contains(&i.id));
        *items = kept;
        taken
    }
}

#[async_trait]
impl FileApi for FakeApi {
    async fn list_items(&self, query: &ListQuery) -> AppResult<PageResponse<Item>> {
        self.record("list");
        let latency = *self.list_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self
            .failing_parents
            .lock()
            .unwrap()
            .contains(&query.parent_id)
        {
            return Err(AppError::network("connection reset"));
        }

        let matching: Vec<Item> = self
            .items()
            .into_iter()
            .filter(|item| match (&query.id, &query.search) {
                (Some(id), _) => &item.id == id,
                (None, Some(q)) => item.name.to_lowercase().contains(&q.to_lowercase()),
                (None, None) => item.parent_id == query.parent_id,
            })
            .collect();

        let Some(size) = *self.page_size.lock().unwrap() else {
            return Ok(PageResponse::single(matching));
        };
        let size = size.max(1) as usize;
        let last_page = matching.len().div_ceil(size).max(1) as u32;
        let page = query.page.page;
        let items = matching
            .into_iter()
            .skip((page as usize - 1) * size)
            .take(size)
            .collect();
        Ok(PageResponse {
            items,
            current_page: page,
            last_page,
        })
    }

    async fn folder_tree(&self) -> AppResult<Vec<Item>> {
        self.record("folder_tree");
        Ok(self.items().into_iter().filter(Item::is_folder).collect())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&ItemId>) -> AppResult<Item> {
        self.record("create_folder");
        self.guard_mutation()?;
        let mut folder = Item::folder(self.fresh_id(), name);
        folder.parent_id = parent_id.cloned();
        self.items.lock().unwrap().push(folder.clone());
        Ok(folder)
    }

    async fn upload_file(&self, file: &UploadFile, parent_id: Option<&ItemId>) -> AppResult<Vec<Item>> {
        self.record("upload");
        let latency = self
            .upload_latency
            .lock()
            .unwrap()
            .get(&file.name)
            .copied()
            .unwrap_or(Duration::from_millis(50));
        tokio::time::sleep(latency).await;

        if self.failing_uploads.lock().unwrap().contains(&file.name) {
            return Err(AppError::external_service("Upload rejected by backend"));
        }
        let mut item = Item::file(self.fresh_id(), file.name.clone());
        item.parent_id = parent_id.cloned();
        item.size = Some(file.size());
        item.mime_type = Some(file.mime_type.clone());
        self.items.lock().unwrap().push(item.clone());
        Ok(vec![item])
    }

    async fn move_item(&self, id: &ItemId, destination: &MoveDestination) -> AppResult<()> {
        self.record("move");
        self.guard_mutation()?;
        if self.failing_moves.lock().unwrap().contains(id) {
            return Err(AppError::conflict(format!("Cannot move {id}")));
        }
        let parent = destination.parent_id().cloned();
        self.update(id, |item| item.parent_id = parent)
    }

    async fn rename(&self, id: &ItemId, name: &str) -> AppResult<()> {
        self.record("rename");
        self.guard_mutation()?;
        self.update(id, |item| item.name = name.to_string())
    }

    async fn trash(&self, id: &ItemId) -> AppResult<()> {
        self.record("trash");
        self.bulk_trash(std::slice::from_ref(id)).await
    }

    async fn restore(&self, id: &ItemId) -> AppResult<()> {
        self.record("restore");
        self.bulk_restore(std::slice::from_ref(id)).await
    }

    async fn bulk_trash(&self, ids: &[ItemId]) -> AppResult<()> {
        self.record("bulk_trash");
        self.guard_mutation()?;
        let taken = self.take(ids);
        self.trashed.lock().unwrap().extend(taken);
        Ok(())
    }

    async fn bulk_restore(&self, ids: &[ItemId]) -> AppResult<()> {
        self.record("bulk_restore");
        self.guard_mutation()?;
        let mut trashed = self.trashed.lock().unwrap();
        let (restored, kept): (Vec<Item>, Vec<Item>) =
            trashed.drain(..).partition(|i| ids.contains(&i.id));
        *trashed = kept;
        self.items.lock().unwrap().extend(restored);
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[ItemId]) -> AppResult<()> {
        self.record("bulk_delete");
        self.guard_mutation()?;
        self.take(ids);
        self.trashed.lock().unwrap().retain(|i| !ids.contains(&i.id));
        Ok(())
    }

    async fn set_starred(&self, id: &ItemId, starred: bool) -> AppResult<()> {
        self.record("star");
        self.guard_mutation()?;
        self.update(id, |item| item.is_starred = starred)
    }

    async fn download_url(&self, id: &ItemId) -> AppResult<String> {
        self.record("download_url");
        Ok(format!("https://files.example.test/download/{id}"))
    }
}

/// A small drive:
///
/// ```text
/// Docs (1)
/// ├── Reports (2)
/// │   ├── q1-report.pdf (20)
/// │   └── Archive (3)
/// │       └── old-report.pdf (30)
/// └── notes.txt (10)
/// Photos (4)
/// readme.txt (40)
/// ```
pub fn sample_items() -> Vec<Item> {
    vec![
        Item::folder("1", "Docs"),
        Item::folder("2", "Reports").with_parent("1"),
        Item::folder("3", "Archive").with_parent("2"),
        Item::folder("4", "Photos"),
        Item::file("10", "notes.txt").with_parent("1"),
        Item::file("20", "q1-report.pdf").with_parent("2"),
        Item::file("30", "old-report.pdf").with_parent("3"),
        Item::file("40", "readme.txt"),
    ]
}

/// A context over `api` with in-memory storage and fast progress ticks.
pub fn context(api: Arc<FakeApi>) -> DriveContext {
    let mut config = ClientConfig::default();
    config.upload.progress_tick_ms = 10;
    DriveContext::new(config, Arc::new(MemoryStorage::new()), api)
}

/// Look up an item the test seeded.
pub fn seeded(api: &FakeApi, id: &str) -> Item {
    api.item(id).unwrap()
}
