//! Upload pipeline configuration.

use serde::{Deserialize, Serialize};

/// Upload validation limits and progress simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes (default 50 MB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// MIME types accepted by the backend.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// Interval between synthetic progress increments, in milliseconds.
    #[serde(default = "default_progress_tick")]
    pub progress_tick_ms: u64,
    /// Synthetic progress never passes this value before the call returns.
    #[serde(default = "default_progress_cap")]
    pub progress_cap: u8,
}

impl UploadConfig {
    /// Whether the MIME type is in the allow-list (parameters ignored).
    pub fn is_allowed(&self, mime_type: &str) -> bool {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }

    /// Size limit rendered in whole megabytes for messages.
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size_bytes / (1024 * 1024)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            allowed_mime_types: default_allowed_mime_types(),
            progress_tick_ms: default_progress_tick(),
            progress_cap: default_progress_cap(),
        }
    }
}

fn default_max_file_size() -> u64 {
    52_428_800 // 50 MB
}

fn default_allowed_mime_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/svg+xml",
        "application/pdf",
        "text/plain",
        "text/csv",
        "text/markdown",
        "application/json",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.ms-powerpoint",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "application/zip",
        "video/mp4",
        "audio/mpeg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_progress_tick() -> u64 {
    200
}

fn default_progress_cap() -> u8 {
    90
}
