//! Seams that let concrete backends be swapped for test doubles.

pub mod storage;

pub use storage::DurableStorage;
