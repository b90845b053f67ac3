//! Errors reported by cached entries.
//!
//! The pool itself never fails; these only travel from [`Evict`](crate::Evict)
//! implementations back to the pool, which logs them.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Releasing an evicted entry's resources failed.
    #[display("failed to close evicted entry: {_0}")]
    Close(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
