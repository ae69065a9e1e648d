//! Hierarchy views: forest building, breadcrumbs and cache-first listing.

pub mod service;
pub mod tree;

pub use service::{ItemService, ListOptions};
pub use tree::TreeBuilder;
