//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! [`ErrorKind::NotDownloaded`] is special: the content tree returns it as the
//! top-most frame (never wrapped in another kind) so that
//! [`auto_download`](crate::auto_download) can recognise it and recover.

use crate::download::NotDownloaded;
use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A book's database is missing or unusable; download it and try again.
    #[display("{_0}")]
    NotDownloaded(#[error(not(source))] NotDownloaded),
    /// No item, row or content exists for the given path or id.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Querying a book database failed.
    #[display("database error")]
    Database,
    /// Fetching a book database failed.
    #[display("download failed: {_0}")]
    Download(#[error(not(source))] String),
    /// The catalog for a language could not be loaded.
    #[display("catalog unavailable for language `{_0}`")]
    Catalog(#[error(not(source))] String),
    /// The language is not one the library was configured with.
    #[display("unknown language `{_0}`")]
    Language(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotDownloaded(_) | Self::Download(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
