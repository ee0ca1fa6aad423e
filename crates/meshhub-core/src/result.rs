//! Convenience result type alias for MeshHub.

use crate::error::AppError;

/// A specialized `Result` type for MeshHub operations.
pub type AppResult<T> = Result<T, AppError>;
