//! JSON-file-backed durable storage.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use cloudnest_core::error::{AppError, ErrorKind};
use cloudnest_core::result::AppResult;
use cloudnest_core::traits::DurableStorage;

/// A [`DurableStorage`] that keeps all keys in one JSON object on disk.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStorage {
    /// Path of the JSON file.
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open (or lazily create) storage at `path`.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::with_source(
                    ErrorKind::Cache,
                    format!("Failed to create storage directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(&self) -> AppResult<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Cache,
                    format!("Failed to read storage file: {}", self.path.display()),
                    e,
                ));
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                // Unparseable contents read as empty; the next write replaces them.
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Storage file is not a JSON object, treating it as empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn save_map(&self, map: &BTreeMap<String, String>) -> AppResult<()> {
        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| {
            AppError::with_source(
                ErrorKind::Cache,
                format!("Failed to write storage file: {}", tmp.display()),
                e,
            )
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Cache,
                format!("Failed to replace storage file: {}", self.path.display()),
                e,
            )
        })?;
        debug!(path = %self.path.display(), keys = map.len(), "Wrote storage file");
        Ok(())
    }

    fn modify<F>(&self, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AppError::internal("Storage lock poisoned"))?;
        let mut map = self.load_map()?;
        if f(&mut map) {
            self.save_map(&map)?;
        }
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn read(&self, key: &str) -> AppResult<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AppError::internal("Storage lock poisoned"))?;
        Ok(self.load_map()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> AppResult<()> {
        self.modify(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.modify(|map| map.remove(key).is_some())
    }
}
