//! The single path for mutations: call the backend, then invalidate and
//! notify.

use std::sync::Arc;

use tracing::{info, warn};

use cloudnest_cache::{ItemStore, keys};
use cloudnest_client::{FileApi, MoveDestination, UploadFile};
use cloudnest_core::error::AppError;
use cloudnest_core::events::{EventKind, InvalidationBus, InvalidationEvent};
use cloudnest_core::result::AppResult;
use cloudnest_core::types::{ItemId, UploadTaskId};
use cloudnest_entity::{Item, UploadResult};

use super::upload::{RejectedFile, UploadBatch, UploadPipeline};

/// What a successful mutation invalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Cache keys the mutation targets, sorted. Keys that were already
    /// absent are still listed, so repeating a mutation reports the same
    /// set.
    pub keys: Vec<String>,
    /// Keys that were actually present and dropped, search results
    /// included.
    pub removed: Vec<String>,
    /// Events published, in order.
    pub events: Vec<EventKind>,
}

impl Invalidation {
    /// Whether nothing was invalidated or published.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.events.is_empty()
    }
}

/// Outcome of an upload run through the gateway.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// One result per accepted file, in submission order.
    pub results: Vec<UploadResult>,
    /// Files turned away by validation.
    pub rejected: Vec<RejectedFile>,
    /// Invalidation done for completed files.
    pub invalidation: Invalidation,
}

/// Pending cache keys and events of one mutation.
#[derive(Debug, Default)]
struct Plan {
    keys: Vec<String>,
    events: Vec<InvalidationEvent>,
}

impl Plan {
    fn parent(&mut self, parent_id: Option<&ItemId>) {
        self.keys.extend(keys::parent_scope(parent_id));
    }

    fn folders(&mut self) {
        self.keys.push(keys::folder_tree());
    }

    fn event(&mut self, event: InvalidationEvent) {
        self.events.push(event);
    }
}

/// Wraps every mutating backend call.
///
/// On success the affected cache keys are removed and events are
/// published. On failure nothing is touched and the error is returned.
/// Server-side search results are invalidated by every mutation.
#[derive(Debug, Clone)]
pub struct MutationGateway {
    api: Arc<dyn FileApi>,
    store: Arc<ItemStore>,
    bus: Arc<InvalidationBus>,
    uploads: Arc<UploadPipeline>,
    root_sentinels: Vec<String>,
}

impl MutationGateway {
    /// Creates a new mutation gateway.
    pub fn new(
        api: Arc<dyn FileApi>,
        store: Arc<ItemStore>,
        bus: Arc<InvalidationBus>,
        uploads: Arc<UploadPipeline>,
        root_sentinels: Vec<String>,
    ) -> Self {
        Self {
            api,
            store,
            bus,
            uploads,
            root_sentinels,
        }
    }

    /// Create a folder under `parent_id` (`None` = root).
    pub async fn create_folder(&self, name: &str, parent_id: Option<&ItemId>) -> AppResult<(Item, Invalidation)> {
        let name = validate_name(name)?;
        let parent_id = self.canonical(parent_id);
        let folder = self.api.create_folder(name, parent_id).await?;

        let mut plan = Plan::default();
        plan.parent(parent_id);
        plan.folders();
        plan.event(InvalidationEvent::FolderCreated {
            parent_id: parent_id.cloned(),
            folder_id: folder.id.clone(),
        });
        Ok((folder, self.commit(plan)))
    }

    /// Upload files and wait for every task to finish.
    pub async fn upload(&self, files: Vec<UploadFile>, parent_id: Option<&ItemId>) -> UploadOutcome {
        let batch = self.uploads.submit(files, self.canonical(parent_id).cloned());
        self.finish_upload(batch).await
    }

    /// Wait for a batch started on the pipeline and report its completed
    /// files.
    pub async fn finish_upload(&self, batch: UploadBatch) -> UploadOutcome {
        let (parent_id, handles, rejected) = batch.into_parts();
        let results = futures::future::join_all(handles.into_iter().map(|h| h.wait())).await;
        let invalidation = self.report_uploads(parent_id.as_ref(), &results);
        UploadOutcome {
            results,
            rejected,
            invalidation,
        }
    }

    /// Retry a failed upload task and report it if it completes.
    pub async fn retry_upload(&self, task_id: UploadTaskId) -> AppResult<UploadOutcome> {
        let parent_id = self
            .uploads
            .task(task_id)
            .and_then(|task| task.parent_id);
        let handle = self.uploads.retry(task_id)?;
        let results = vec![handle.wait().await];
        let invalidation = self.report_uploads(parent_id.as_ref(), &results);
        Ok(UploadOutcome {
            results,
            rejected: Vec::new(),
            invalidation,
        })
    }

    /// Invalidate and publish for the completed results of a batch.
    pub fn report_uploads(&self, parent_id: Option<&ItemId>, results: &[UploadResult]) -> Invalidation {
        if !results.iter().any(UploadResult::is_completed) {
            return Invalidation::default();
        }
        let item_ids: Vec<ItemId> = results
            .iter()
            .filter(|r| r.is_completed())
            .flat_map(|r| r.items.iter().map(|i| i.id.clone()))
            .collect();

        let mut plan = Plan::default();
        plan.parent(parent_id);
        plan.event(InvalidationEvent::FileUploaded {
            parent_id: parent_id.cloned(),
            item_ids,
        });
        self.commit(plan)
    }

    /// Move items to `destination`.
    ///
    /// Items move one call at a time. If a call fails, the moves that
    /// already succeeded are still invalidated and published before the
    /// error is returned.
    pub async fn move_items(&self, items: &[Item], destination: Option<&ItemId>) -> AppResult<Invalidation> {
        let destination = MoveDestination::from_parent(destination.cloned(), &self.root_sentinels);
        if let MoveDestination::Folder(dest) = &destination {
            if items.iter().any(|i| &i.id == dest) {
                return Err(AppError::validation("A folder cannot be moved into itself"));
            }
        }

        let mut moved: Vec<&Item> = Vec::with_capacity(items.len());
        let mut failure = None;
        for item in items {
            match self.api.move_item(&item.id, &destination).await {
                Ok(()) => moved.push(item),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let invalidation = if moved.is_empty() {
            Invalidation::default()
        } else {
            self.commit(self.move_plan(&moved, &destination))
        };
        match failure {
            Some(e) if !moved.is_empty() => {
                warn!(moved = moved.len(), error = %e, "Move stopped part-way");
                Err(e)
            }
            Some(e) => Err(e),
            None => Ok(invalidation),
        }
    }

    /// Rename an item.
    pub async fn rename(&self, item: &Item, new_name: &str) -> AppResult<Invalidation> {
        let new_name = validate_name(new_name)?;
        self.api.rename(&item.id, new_name).await?;
        Ok(self.commit(self.refresh_plan(std::slice::from_ref(item))))
    }

    /// Move an item to the trash.
    pub async fn trash(&self, item: &Item) -> AppResult<Invalidation> {
        self.api.trash(&item.id).await?;
        Ok(self.commit(self.refresh_plan(std::slice::from_ref(item))))
    }

    /// Restore an item from the trash.
    pub async fn restore(&self, item: &Item) -> AppResult<Invalidation> {
        self.api.restore(&item.id).await?;
        Ok(self.commit(self.refresh_plan(std::slice::from_ref(item))))
    }

    /// Trash several items in one call.
    pub async fn bulk_trash(&self, items: &[Item]) -> AppResult<Invalidation> {
        if items.is_empty() {
            return Ok(Invalidation::default());
        }
        self.api.bulk_trash(&ids(items)).await?;
        Ok(self.commit(self.refresh_plan(items)))
    }

    /// Restore several items in one call.
    pub async fn bulk_restore(&self, items: &[Item]) -> AppResult<Invalidation> {
        if items.is_empty() {
            return Ok(Invalidation::default());
        }
        self.api.bulk_restore(&ids(items)).await?;
        Ok(self.commit(self.refresh_plan(items)))
    }

    /// Permanently delete several items.
    pub async fn delete_permanently(&self, items: &[Item]) -> AppResult<Invalidation> {
        if items.is_empty() {
            return Ok(Invalidation::default());
        }
        self.api.bulk_delete(&ids(items)).await?;
        Ok(self.commit(self.refresh_plan(items)))
    }

    /// Star or unstar an item.
    pub async fn set_starred(&self, item: &Item, starred: bool) -> AppResult<Invalidation> {
        self.api.set_starred(&item.id, starred).await?;
        let parent_id = self.parent_of(item);
        let mut plan = Plan::default();
        plan.parent(parent_id);
        plan.event(InvalidationEvent::RefreshFileList {
            parent_id: parent_id.cloned(),
        });
        Ok(self.commit(plan))
    }

    /// Resolve a download URL. Read-only: nothing is invalidated.
    pub async fn download_url(&self, id: &ItemId) -> AppResult<String> {
        self.api.download_url(id).await
    }

    fn move_plan(&self, moved: &[&Item], destination: &MoveDestination) -> Plan {
        let mut plan = Plan::default();
        let mut from_parent_ids: Vec<Option<ItemId>> = Vec::new();
        for item in moved {
            let from = self.parent_of(item).cloned();
            if !from_parent_ids.contains(&from) {
                plan.parent(from.as_ref());
                from_parent_ids.push(from);
            }
        }
        plan.parent(destination.parent_id());
        if moved.iter().any(|i| i.is_folder()) {
            plan.folders();
        }
        plan.event(InvalidationEvent::FilesMoved {
            item_ids: moved.iter().map(|i| i.id.clone()).collect(),
            from_parent_ids,
            to_parent_id: destination.parent_id().cloned(),
        });
        plan
    }

    /// Listing refresh for each affected parent, plus the sidebar when a
    /// folder is involved.
    fn refresh_plan(&self, items: &[Item]) -> Plan {
        let mut plan = Plan::default();
        let mut parents: Vec<Option<ItemId>> = Vec::new();
        for item in items {
            let parent = self.parent_of(item).cloned();
            if !parents.contains(&parent) {
                plan.parent(parent.as_ref());
                parents.push(parent);
            }
        }
        for parent_id in parents {
            plan.event(InvalidationEvent::RefreshFileList { parent_id });
        }
        if items.iter().any(Item::is_folder) {
            plan.folders();
            plan.event(InvalidationEvent::RefreshSidebar);
        }
        plan
    }

    fn commit(&self, plan: Plan) -> Invalidation {
        let mut targeted = plan.keys;
        targeted.sort();
        targeted.dedup();

        let searches = self.store.keys().into_iter().filter(|k| keys::is_search(k));
        let mut removed = self
            .store
            .invalidate_many(targeted.iter().cloned().chain(searches));
        removed.sort();
        let mut events = Vec::with_capacity(plan.events.len());
        for event in plan.events {
            events.push(event.kind());
            self.bus.publish(event);
        }
        info!(targeted = targeted.len(), removed = removed.len(), ?events, "Mutation committed");
        Invalidation {
            keys: targeted,
            removed,
            events,
        }
    }

    fn canonical<'a>(&self, parent_id: Option<&'a ItemId>) -> Option<&'a ItemId> {
        parent_id.filter(|id| !id.is_root_sentinel(&self.root_sentinels))
    }

    fn parent_of<'a>(&self, item: &'a Item) -> Option<&'a ItemId> {
        item.effective_parent(&self.root_sentinels)
    }
}

fn ids(items: &[Item]) -> Vec<ItemId> {
    items.iter().map(|i| i.id.clone()).collect()
}

fn validate_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name must not be empty"));
    }
    if name.contains('/') {
        return Err(AppError::validation("Name must not contain '/'"));
    }
    Ok(name)
}
