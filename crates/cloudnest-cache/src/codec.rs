//! Encoding of the persisted cache blob.
//!
//! The blob is JSON wrapped in standard base64. This only keeps listings
//! from being readable at a glance in storage; it is not encryption and
//! makes no confidentiality claim.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use cloudnest_core::error::AppError;
use cloudnest_core::result::AppResult;

use crate::store::CacheEntry;

/// On-storage layout: `{data: [[key, {data, timestamp}], ...], timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedBlob {
    /// Key/entry pairs.
    pub data: Vec<(String, CacheEntry)>,
    /// When the blob was written, in Unix milliseconds.
    pub timestamp: i64,
}

/// Serialize and obfuscate a blob.
pub fn encode(blob: &PersistedBlob) -> AppResult<String> {
    let json = serde_json::to_vec(blob)?;
    Ok(STANDARD.encode(json))
}

/// Reverse [`encode`]. Any failure means the blob is corrupt.
pub fn decode(raw: &str) -> AppResult<PersistedBlob> {
    let json = STANDARD
        .decode(raw.trim())
        .map_err(|e| AppError::cache(format!("Cache blob is not valid base64: {e}")))?;
    serde_json::from_slice(&json)
        .map_err(|e| AppError::cache(format!("Cache blob is not a valid cache layout: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CacheValue;
    use cloudnest_entity::Item;

    #[test]
    fn test_encoded_blob_is_not_plain_json() {
        let blob = PersistedBlob {
            data: vec![(
                "files_root".to_string(),
                CacheEntry {
                    data: CacheValue::Items(vec![Item::folder("1", "Secret plans")]),
                    timestamp: 1,
                },
            )],
            timestamp: 1,
        };
        let encoded = encode(&blob).unwrap();
        assert!(!encoded.contains("Secret plans"));

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.data.len(), 1);
        assert_eq!(decoded.data[0].0, "files_root");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode("%%% not base64 %%%").is_err());
        assert!(decode(&STANDARD.encode(b"{\"nope\":1}")).is_err());
    }
}
