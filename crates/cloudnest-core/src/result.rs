//! Convenience result type alias for CloudNest.

use crate::error::AppError;

/// A specialized `Result` type for CloudNest operations.
pub type AppResult<T> = Result<T, AppError>;
