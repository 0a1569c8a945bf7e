//! Convenience result type alias for store operations.

use crate::error::StoreError;

/// A specialized `Result` type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
