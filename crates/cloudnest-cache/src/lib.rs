//! # cloudnest-cache
//!
//! The item cache that sits between every UI surface and the list
//! endpoint. Entries are list responses keyed by query shape (see
//! [`keys`]); the whole map is mirrored into one obfuscated blob in
//! durable storage and reloaded, with TTL eviction, at process start.
//!
//! - [`store::ItemStore`]: the cache itself
//! - [`codec`]: blob encoding (JSON + base64, not encryption)
//! - [`storage`]: durable storage adapters (file, memory)

pub mod codec;
pub mod keys;
pub mod storage;
pub mod store;

pub use store::{CacheEntry, CacheValue, ItemStore};
