//! Durable storage adapters for the item cache and the auth token.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;
