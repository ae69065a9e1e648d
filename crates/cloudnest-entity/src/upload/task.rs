//! Per-file upload task state.

use serde::{Deserialize, Serialize};
use std::fmt;

use cloudnest_core::types::{ItemId, UploadTaskId};

use crate::item::Item;

/// Status of one file's upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// The network call is outstanding.
    Uploading,
    /// The backend accepted the file.
    Completed,
    /// The call failed; the task may be retried.
    Error,
    /// The user cancelled the task.
    Cancelled,
}

impl UploadStatus {
    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    /// Check if the task can be retried.
    pub fn can_retry(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of one file's upload.
///
/// The cancellation token lives with the pipeline's task handle, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTask {
    /// Local task identifier.
    pub id: UploadTaskId,
    /// File name.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Progress percentage, 0..=100.
    pub progress: u8,
    /// Current status.
    pub status: UploadStatus,
    /// Target folder (`None` = root).
    pub parent_id: Option<ItemId>,
    /// Failure reason when `status` is `Error`.
    pub error: Option<String>,
    /// 1 for the first attempt, incremented by each retry.
    pub attempt: u32,
}

impl UploadTask {
    /// A fresh task in `Uploading` state.
    pub fn new(name: impl Into<String>, size: u64, parent_id: Option<ItemId>) -> Self {
        Self {
            id: UploadTaskId::new(),
            name: name.into(),
            size,
            progress: 0,
            status: UploadStatus::Uploading,
            parent_id,
            error: None,
            attempt: 1,
        }
    }
}

/// Final outcome of one task, reported when its batch resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    /// The task.
    pub task_id: UploadTaskId,
    /// File name.
    pub name: String,
    /// Terminal status.
    pub status: UploadStatus,
    /// Items created by the backend (empty unless completed).
    pub items: Vec<Item>,
    /// Failure reason when `status` is `Error`.
    pub error: Option<String>,
}

impl UploadResult {
    /// Whether the file reached the backend.
    pub fn is_completed(&self) -> bool {
        self.status == UploadStatus::Completed
    }
}
