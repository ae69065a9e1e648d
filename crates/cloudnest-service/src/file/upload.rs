//! Concurrent multi-file uploads with per-task cancellation and retry.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use cloudnest_client::{FileApi, UploadFile};
use cloudnest_core::config::upload::UploadConfig;
use cloudnest_core::error::AppError;
use cloudnest_core::result::AppResult;
use cloudnest_core::types::{ItemId, UploadTaskId};
use cloudnest_entity::{UploadResult, UploadStatus, UploadTask};

/// A file turned away before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    /// File name.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Why it was rejected.
    pub reason: String,
}

/// Bookkeeping for one task in the active set.
#[derive(Debug)]
struct TaskEntry {
    /// Submission sequence, for stable listing order.
    seq: u64,
    file: UploadFile,
    parent_id: Option<ItemId>,
    state: Arc<watch::Sender<UploadTask>>,
    token: CancellationToken,
}

/// Runs uploads concurrently, one task per file.
///
/// Tasks start in submission order; completion order is whatever the
/// network gives. Cancelling a task aborts only its own request.
#[derive(Debug)]
pub struct UploadPipeline {
    api: Arc<dyn FileApi>,
    config: UploadConfig,
    tasks: DashMap<UploadTaskId, TaskEntry>,
    seq: AtomicU64,
}

impl UploadPipeline {
    /// Creates a new upload pipeline.
    pub fn new(api: Arc<dyn FileApi>, config: UploadConfig) -> Self {
        Self {
            api,
            config,
            tasks: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// Check a file against the size limit and MIME allow-list.
    pub fn validate(&self, file: &UploadFile) -> Result<(), String> {
        check(&self.config, file)
    }

    /// Validate `files` and start one task per accepted file.
    ///
    /// Rejected files are reported in the batch and never reach the
    /// network; they do not hold back the accepted ones.
    pub fn submit(&self, files: Vec<UploadFile>, parent_id: Option<ItemId>) -> UploadBatch {
        let mut handles = Vec::with_capacity(files.len());
        let mut rejected = Vec::new();

        for file in files {
            if let Err(reason) = self.validate(&file) {
                let size = file.size();
                warn!(name = %file.name, size, reason = %reason, "Upload rejected");
                rejected.push(RejectedFile {
                    name: file.name,
                    size,
                    reason,
                });
                continue;
            }

            let task = UploadTask::new(file.name.clone(), file.size(), parent_id.clone());
            let (state, _) = watch::channel(task.clone());
            let entry = TaskEntry {
                seq: self.seq.fetch_add(1, Ordering::Relaxed),
                file,
                parent_id: parent_id.clone(),
                state: Arc::new(state),
                token: CancellationToken::new(),
            };
            let handle = self.start(&entry, task.id);
            self.tasks.insert(task.id, entry);
            handles.push(handle);
        }

        info!(accepted = handles.len(), rejected = rejected.len(), "Upload batch submitted");
        UploadBatch {
            parent_id,
            handles,
            rejected,
        }
    }

    /// Read files from disk, then validate and start them like [`Self::submit`].
    ///
    /// A path that cannot be read is rejected on its own. The size limit is
    /// checked against file metadata, so an oversized file is never loaded.
    pub async fn submit_paths<P: AsRef<Path>>(&self, paths: &[P], parent_id: Option<ItemId>) -> UploadBatch {
        let mut files = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();
        for path in paths {
            match self.read(path.as_ref()).await {
                Ok(file) => files.push(file),
                Err(rejected) => {
                    warn!(name = %rejected.name, reason = %rejected.reason, "Upload rejected");
                    unreadable.push(rejected);
                }
            }
        }

        let mut batch = self.submit(files, parent_id);
        unreadable.append(&mut batch.rejected);
        batch.rejected = unreadable;
        batch
    }

    async fn read(&self, path: &Path) -> Result<UploadFile, RejectedFile> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let rejected = |size: u64, reason: String| RejectedFile {
            name: name.clone(),
            size,
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| rejected(0, format!("{name}: cannot read file ({e})")))?;
        if !metadata.is_file() {
            return Err(rejected(0, format!("{name}: not a regular file")));
        }
        if metadata.len() > self.config.max_file_size_bytes {
            return Err(rejected(metadata.len(), too_large(&self.config, &name)));
        }
        UploadFile::from_path(path)
            .await
            .map_err(|e| rejected(metadata.len(), format!("{name}: {}", e.message)))
    }

    /// Start a new attempt for a task in `error` status.
    ///
    /// The same file bytes are sent again under the same task id.
    pub fn retry(&self, task_id: UploadTaskId) -> AppResult<UploadHandle> {
        let mut entry = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| AppError::not_found(format!("Upload task {task_id} not found")))?;

        let current = entry.state.borrow().clone();
        if !current.status.can_retry() {
            return Err(AppError::validation(format!(
                "Upload task {task_id} is {} and cannot be retried",
                current.status
            )));
        }

        entry.token = CancellationToken::new();
        entry.state.send_modify(|task| {
            task.status = UploadStatus::Uploading;
            task.progress = 0;
            task.error = None;
            task.attempt += 1;
        });
        info!(task_id = %task_id, attempt = current.attempt + 1, "Retrying upload");
        Ok(self.start(&entry, task_id))
    }

    /// Cancel one task. Returns `false` if it is unknown or already done.
    pub fn cancel(&self, task_id: UploadTaskId) -> bool {
        match self.tasks.get(&task_id) {
            Some(entry) if !entry.state.borrow().status.is_terminal() => {
                entry.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Snapshot of the active set, in submission order.
    pub fn tasks(&self) -> Vec<UploadTask> {
        let mut tasks: Vec<(u64, UploadTask)> = self
            .tasks
            .iter()
            .map(|e| (e.seq, e.state.borrow().clone()))
            .collect();
        tasks.sort_by_key(|(seq, _)| *seq);
        tasks.into_iter().map(|(_, t)| t).collect()
    }

    /// Snapshot of one task.
    pub fn task(&self, task_id: UploadTaskId) -> Option<UploadTask> {
        self.tasks.get(&task_id).map(|e| e.state.borrow().clone())
    }

    /// Remove completed and cancelled tasks. Failed tasks stay for retry.
    pub fn clear_finished(&self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, entry| {
            !matches!(
                entry.state.borrow().status,
                UploadStatus::Completed | UploadStatus::Cancelled
            )
        });
        before - self.tasks.len()
    }

    fn start(&self, entry: &TaskEntry, task_id: UploadTaskId) -> UploadHandle {
        let attempt = Attempt {
            api: Arc::clone(&self.api),
            file: entry.file.clone(),
            parent_id: entry.parent_id.clone(),
            state: Arc::clone(&entry.state),
            token: entry.token.clone(),
            tick: Duration::from_millis(self.config.progress_tick_ms.max(1)),
            cap: self.config.progress_cap.min(99),
        };
        debug!(task_id = %task_id, name = %entry.file.name, "Starting upload task");
        UploadHandle {
            id: task_id,
            name: entry.file.name.clone(),
            token: entry.token.clone(),
            progress: entry.state.subscribe(),
            join: tokio::spawn(attempt.run(task_id)),
        }
    }
}

fn check(config: &UploadConfig, file: &UploadFile) -> Result<(), String> {
    if file.size() > config.max_file_size_bytes {
        return Err(too_large(config, &file.name));
    }
    if !config.is_allowed(&file.mime_type) {
        return Err(format!(
            "{}: file type '{}' is not allowed",
            file.name, file.mime_type
        ));
    }
    Ok(())
}

fn too_large(config: &UploadConfig, name: &str) -> String {
    format!("{name} exceeds the {} MB upload limit", config.max_file_size_mb())
}

/// Everything one running attempt needs, owned by its tokio task.
struct Attempt {
    api: Arc<dyn FileApi>,
    file: UploadFile,
    parent_id: Option<ItemId>,
    state: Arc<watch::Sender<UploadTask>>,
    token: CancellationToken,
    tick: Duration,
    cap: u8,
}

impl Attempt {
    async fn run(self, task_id: UploadTaskId) -> UploadResult {
        let upload = self.api.upload_file(&self.file, self.parent_id.as_ref());
        tokio::pin!(upload);
        let mut ticker = tokio::time::interval(self.tick);
        ticker.tick().await;

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break None,
                result = &mut upload => break Some(result),
                _ = ticker.tick() => self.advance(),
            }
        };

        let result = match outcome {
            None => {
                info!(task_id = %task_id, name = %self.file.name, "Upload cancelled");
                UploadResult {
                    task_id,
                    name: self.file.name.clone(),
                    status: UploadStatus::Cancelled,
                    items: Vec::new(),
                    error: None,
                }
            }
            Some(Ok(items)) => {
                info!(task_id = %task_id, name = %self.file.name, created = items.len(), "Upload completed");
                UploadResult {
                    task_id,
                    name: self.file.name.clone(),
                    status: UploadStatus::Completed,
                    items,
                    error: None,
                }
            }
            Some(Err(e)) => {
                error!(task_id = %task_id, name = %self.file.name, error = %e, "Upload failed");
                UploadResult {
                    task_id,
                    name: self.file.name.clone(),
                    status: UploadStatus::Error,
                    items: Vec::new(),
                    error: Some(e.user_message()),
                }
            }
        };

        self.state.send_modify(|task| {
            task.status = result.status;
            task.error = result.error.clone();
            if result.status == UploadStatus::Completed {
                task.progress = 100;
            }
        });
        result
    }

    /// Synthetic progress: a random step, never reaching the cap.
    fn advance(&self) {
        let step: u8 = rand::thread_rng().gen_range(3..=12);
        let cap = self.cap;
        self.state.send_if_modified(|task| {
            let next = task.progress.saturating_add(step).min(cap);
            let changed = next != task.progress;
            task.progress = next;
            changed
        });
    }
}

/// Caller's view of one running task.
#[derive(Debug)]
pub struct UploadHandle {
    id: UploadTaskId,
    name: String,
    token: CancellationToken,
    progress: watch::Receiver<UploadTask>,
    join: JoinHandle<UploadResult>,
}

impl UploadHandle {
    /// The task id.
    pub fn id(&self) -> UploadTaskId {
        self.id
    }

    /// The file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Abort this task's request. Siblings are unaffected.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Latest task state.
    pub fn snapshot(&self) -> UploadTask {
        self.progress.borrow().clone()
    }

    /// A receiver that sees every progress and status change.
    pub fn subscribe(&self) -> watch::Receiver<UploadTask> {
        self.progress.clone()
    }

    /// Wait for the task's terminal state.
    pub async fn wait(self) -> UploadResult {
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                error!(task_id = %self.id, error = %e, "Upload task aborted");
                UploadResult {
                    task_id: self.id,
                    name: self.name,
                    status: UploadStatus::Error,
                    items: Vec::new(),
                    error: Some(format!("Upload task aborted: {e}")),
                }
            }
        }
    }
}

/// The tasks started by one [`UploadPipeline::submit`] call.
#[derive(Debug)]
pub struct UploadBatch {
    parent_id: Option<ItemId>,
    handles: Vec<UploadHandle>,
    rejected: Vec<RejectedFile>,
}

impl UploadBatch {
    /// Target folder (`None` = root).
    pub fn parent_id(&self) -> Option<&ItemId> {
        self.parent_id.as_ref()
    }

    /// Running tasks, in submission order.
    pub fn handles(&self) -> &[UploadHandle] {
        &self.handles
    }

    /// Files that failed validation.
    pub fn rejected(&self) -> &[RejectedFile] {
        &self.rejected
    }

    /// Cancel every task in the batch.
    pub fn cancel_all(&self) {
        for handle in &self.handles {
            handle.cancel();
        }
    }

    /// Wait until every task is terminal. Results keep submission order.
    pub async fn wait(self) -> Vec<UploadResult> {
        futures::future::join_all(self.handles.into_iter().map(UploadHandle::wait)).await
    }

    /// Split into parts, for callers that wait on handles individually.
    pub fn into_parts(self) -> (Option<ItemId>, Vec<UploadHandle>, Vec<RejectedFile>) {
        (self.parent_id, self.handles, self.rejected)
    }
}
