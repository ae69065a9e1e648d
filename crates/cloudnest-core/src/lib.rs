//! # cloudnest-core
//!
//! Core crate for CloudNest. Contains configuration schemas, typed
//! identifiers, the invalidation event vocabulary and bus, the durable
//! storage seam, and the unified error system.
//!
//! This crate has **no** internal dependencies on other CloudNest crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
