//! # cloudnest-entity
//!
//! Domain models for CloudNest. [`item::Item`] mirrors one row of the
//! backend's flat listing; [`item::TreeNode`] and [`item::PathSegment`]
//! are derived views that are never sent back to the server; the
//! [`upload`] module holds the per-file upload lifecycle.

pub mod item;
pub mod search;
pub mod upload;

pub use item::{Item, ItemKind, PathSegment, TreeNode};
pub use search::SearchResult;
pub use upload::{UploadResult, UploadStatus, UploadTask};
