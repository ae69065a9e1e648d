//! Shared value types used across crates.

pub mod id;
pub mod pagination;

pub use id::{ItemId, SubscriptionId, UploadTaskId};
pub use pagination::{PageRequest, PageResponse};
