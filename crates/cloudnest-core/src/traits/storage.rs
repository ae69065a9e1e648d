//! Durable key/value storage used to persist the item cache and token.

use crate::result::AppResult;

/// Synchronous string key/value store that survives process restarts.
///
/// Implementations must be cheap to call from synchronous cache paths:
/// the item cache rewrites its whole blob on every `write`.
pub trait DurableStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> AppResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// May fail (e.g. quota exceeded); callers decide whether to surface it.
    fn write(&self, key: &str, value: &str) -> AppResult<()>;

    /// Remove the value stored under `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> AppResult<()>;
}
