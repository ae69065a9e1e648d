//! Which events make which UI surface refetch.

use std::sync::Arc;

use tracing::debug;

use cloudnest_core::events::{EventKind, InvalidationBus, InvalidationEvent, Subscription};

use crate::search::SearchIndexer;

/// A view that caches part of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Folder tree in the sidebar.
    Sidebar,
    /// Main list/grid of the current folder.
    FileList,
    /// Breadcrumb trail of the current folder.
    Breadcrumb,
    /// Client-side recursive search index.
    SearchIndex,
}

impl Surface {
    /// Every surface.
    pub const ALL: [Surface; 4] = [
        Surface::Sidebar,
        Surface::FileList,
        Surface::Breadcrumb,
        Surface::SearchIndex,
    ];

    /// Event kinds that make this surface refetch.
    pub fn triggers(&self) -> &'static [EventKind] {
        match self {
            Self::Sidebar => &[
                EventKind::FolderCreated,
                EventKind::FilesMoved,
                EventKind::RefreshSidebar,
            ],
            Self::FileList => &[
                EventKind::FileUploaded,
                EventKind::FolderCreated,
                EventKind::FilesMoved,
                EventKind::RefreshFileList,
                EventKind::GlobalSearch,
            ],
            Self::Breadcrumb => &[EventKind::FilesMoved, EventKind::RefreshSidebar],
            Self::SearchIndex => &[
                EventKind::FileUploaded,
                EventKind::FolderCreated,
                EventKind::FilesMoved,
                EventKind::RefreshSidebar,
                EventKind::RefreshFileList,
            ],
        }
    }

    /// Whether `event` should make this surface refetch.
    pub fn matches(&self, event: &InvalidationEvent) -> bool {
        self.triggers().contains(&event.kind())
    }
}

/// Subscribe `handler` to every trigger of `surface`.
///
/// The handler is shared across the subscriptions; dropping the returned
/// guards detaches it.
pub fn attach_surface<F>(bus: &Arc<InvalidationBus>, surface: Surface, handler: F) -> Vec<Subscription>
where
    F: Fn(&InvalidationEvent) + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    surface
        .triggers()
        .iter()
        .map(|&kind| {
            let handler = Arc::clone(&handler);
            bus.subscribe(kind, move |event| handler(event))
        })
        .collect()
}

/// Keep `indexer` fresh: every trigger clears it and, when a tokio
/// runtime is available, starts a background re-index.
pub fn attach_search_index(bus: &Arc<InvalidationBus>, indexer: Arc<SearchIndexer>) -> Vec<Subscription> {
    attach_surface(bus, Surface::SearchIndex, move |event| {
        indexer.clear_index();
        match tokio::runtime::Handle::try_current() {
            Ok(_) => {
                debug!(kind = ?event.kind(), "Re-indexing after invalidation");
                drop(indexer.spawn_index_all(false));
            }
            Err(_) => debug!(kind = ?event.kind(), "No runtime, index left empty"),
        }
    })
}
