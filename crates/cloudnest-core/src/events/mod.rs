//! Invalidation events published after mutations.
//!
//! The vocabulary is fixed: every UI surface that caches a view of the
//! hierarchy subscribes to the kinds it depends on and refetches when one
//! arrives. Events are in-process only and never persisted.

pub mod bus;

use serde::{Deserialize, Serialize};

use crate::types::ItemId;

pub use bus::{InvalidationBus, Subscription};

/// How a free-text search should be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Served from the client-side recursive index.
    Local,
    /// Served by the backend's `search` list parameter.
    Remote,
}

/// Discriminant of [`InvalidationEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// One or more files finished uploading.
    FileUploaded,
    /// A folder was created.
    FolderCreated,
    /// Items were moved to another parent.
    FilesMoved,
    /// The sidebar tree must be refetched.
    RefreshSidebar,
    /// The main list/grid must be refetched.
    RefreshFileList,
    /// A free-text search was submitted.
    GlobalSearch,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 6] = [
        EventKind::FileUploaded,
        EventKind::FolderCreated,
        EventKind::FilesMoved,
        EventKind::RefreshSidebar,
        EventKind::RefreshFileList,
        EventKind::GlobalSearch,
    ];
}

/// An event broadcast on the [`InvalidationBus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InvalidationEvent {
    /// Files were uploaded into `parent_id` (`None` = root).
    FileUploaded {
        /// The folder that received the files.
        parent_id: Option<ItemId>,
        /// Ids of the created items, as reported by the backend.
        item_ids: Vec<ItemId>,
    },
    /// A folder was created under `parent_id` (`None` = root).
    FolderCreated {
        /// Parent of the new folder.
        parent_id: Option<ItemId>,
        /// Id of the new folder.
        folder_id: ItemId,
    },
    /// Items moved between parents.
    FilesMoved {
        /// The moved items.
        item_ids: Vec<ItemId>,
        /// Distinct parents the items were moved out of.
        from_parent_ids: Vec<Option<ItemId>>,
        /// The destination parent (`None` = root).
        to_parent_id: Option<ItemId>,
    },
    /// The folder tree changed shape or labels.
    RefreshSidebar,
    /// The listing of `parent_id` changed (`None` = root).
    RefreshFileList {
        /// Parent whose listing is stale.
        parent_id: Option<ItemId>,
    },
    /// A debounced search query was submitted.
    GlobalSearch {
        /// The query text.
        query: String,
        /// Where the query should be served.
        mode: SearchMode,
    },
}

impl InvalidationEvent {
    /// The subscription key of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::FileUploaded { .. } => EventKind::FileUploaded,
            Self::FolderCreated { .. } => EventKind::FolderCreated,
            Self::FilesMoved { .. } => EventKind::FilesMoved,
            Self::RefreshSidebar => EventKind::RefreshSidebar,
            Self::RefreshFileList { .. } => EventKind::RefreshFileList,
            Self::GlobalSearch { .. } => EventKind::GlobalSearch,
        }
    }
}
