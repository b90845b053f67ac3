//! Error types for the [`connection`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A book connection error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for book connection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies why a book database could not be opened or queried.
///
/// ### Not downloaded
/// - [`ErrorKind::Missing`]
/// - [`ErrorKind::Invalid`]
///
/// ### Operational
/// - [`ErrorKind::Prepare`]
/// - [`ErrorKind::Query`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The database file does not exist (or can't be looked at).
    #[display("database file missing ({_0})")]
    Missing(#[error(not(source))] std::io::ErrorKind),
    /// The file exists but is not a complete, readable book database.
    #[display("database file unusable ({_0})")]
    Invalid(#[error(not(source))] &'static str),
    /// The database opened but doesn't have the expected schema.
    #[display("could not prepare statement")]
    Prepare,
    /// A query against an open database failed.
    #[display("query failed")]
    Query,
}

impl ErrorKind {
    /// Returns `true` if downloading the book again might fix it.
    #[cfg(test)]
    pub fn is_not_downloaded(&self) -> bool {
        matches!(self, Self::Missing(_) | Self::Invalid(_))
    }
}
