//! Upload lifecycle entities.

pub mod task;

pub use task::{UploadResult, UploadStatus, UploadTask};
