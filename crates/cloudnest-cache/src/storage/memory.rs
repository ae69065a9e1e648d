//! In-memory durable storage, for tests and ephemeral sessions.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use cloudnest_core::error::AppError;
use cloudnest_core::result::AppResult;
use cloudnest_core::traits::DurableStorage;

/// A [`DurableStorage`] that lives only as long as the process.
///
/// Writes can be made to fail on demand to simulate a full quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: DashMap<String, String>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `write` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Peek at a raw stored value.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }
}

impl DurableStorage for MemoryStorage {
    fn read(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, value: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::cache("Storage quota exceeded"));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_writes_leave_previous_value() {
        let storage = MemoryStorage::new();
        storage.write("k", "v1").unwrap();
        storage.set_fail_writes(true);
        assert!(storage.write("k", "v2").is_err());
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("v1"));
    }
}
