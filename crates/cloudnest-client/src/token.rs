//! Bearer token persistence.

use std::sync::Arc;

use cloudnest_core::result::AppResult;
use cloudnest_core::traits::DurableStorage;

/// Reads and writes the bearer token under a fixed durable-storage key.
#[derive(Debug, Clone)]
pub struct TokenStore {
    storage: Arc<dyn DurableStorage>,
    key: String,
}

impl TokenStore {
    /// Create a token store over `storage`.
    pub fn new(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The current token; blank values count as absent.
    pub fn token(&self) -> AppResult<Option<String>> {
        Ok(self
            .storage
            .read(&self.key)?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    /// Store a new token.
    pub fn set(&self, token: &str) -> AppResult<()> {
        self.storage.write(&self.key, token.trim())
    }

    /// Forget the token.
    pub fn clear(&self) -> AppResult<()> {
        self.storage.remove(&self.key)
    }
}
