//! # cloudnest-service
//!
//! The client-resident layer that turns the backend's flat, paginated
//! listing into a navigable hierarchy. Services take their collaborators
//! as `Arc`s at construction time; [`DriveContext`] wires them together.
//!
//! Every mutation must go through [`MutationGateway`]: it is the only
//! path that invalidates the [`ItemStore`](cloudnest_cache::ItemStore)
//! and publishes refresh events. A direct `FileApi` mutation leaves
//! every surface stale.

pub mod context;
pub mod file;
pub mod folder;
pub mod search;
pub mod surface;

pub use context::DriveContext;
pub use file::{Invalidation, MutationGateway, UploadBatch, UploadHandle, UploadPipeline};
pub use folder::{ItemService, ListOptions, TreeBuilder};
pub use search::{Debouncer, SearchBox, SearchIndexer};
pub use surface::{Surface, attach_search_index, attach_surface};
