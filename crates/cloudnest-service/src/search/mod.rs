//! Recursive search index and debounced search input.

pub mod debounce;
pub mod indexer;

pub use debounce::{Debouncer, SearchBox};
pub use indexer::{IndexOutcome, SearchIndexer};
