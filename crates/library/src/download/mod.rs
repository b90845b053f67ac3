//! Fetching book databases that aren't available locally.
//!
//! How a book database actually gets onto disk is up to a [`Downloader`]. The
//! content tree only reports *that* a book is missing (as a [`NotDownloaded`]
//! error) and [`auto_download`] ties the two together.

mod orchestrate;

pub use self::orchestrate::{Message, auto_download};
use crate::error::{ErrorKind, Result};
use crate::tree::Book;
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::{fmt, io};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Puts a book's database at [`Book::local_path()`].
///
/// Implementations must leave either a complete database or nothing at all at
/// the destination; a half-written file is reported as not downloaded on the
/// next open and would be fetched again.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, book: &Book) -> Result<()>;
}

/// Why a book counts as not downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// No file at the book's local path.
    Missing(std::io::ErrorKind),
    /// A file exists but isn't a usable book database.
    Invalid(&'static str),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(kind) => write!(f, "missing: {kind}"),
            Self::Invalid(reason) => write!(f, "invalid: {reason}"),
        }
    }
}

/// A book's database is not present locally (or is unusable).
///
/// Two values are equal when they refer to the *same* book (identity, not
/// just the same id) and failed for the same reason, which is what lets the
/// orchestrator notice that a download didn't change anything.
#[derive(Debug, Clone)]
pub struct NotDownloaded {
    book: Arc<Book>,
    cause: Cause,
}

impl NotDownloaded {
    pub(crate) fn new(book: Arc<Book>, cause: Cause) -> Self {
        Self { book, cause }
    }

    pub fn book(&self) -> &Arc<Book> {
        &self.book
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Fetch the missing book using the library's [`Downloader`].
    pub async fn download(&self) -> Result<()> {
        self.book.download().await
    }
}

impl PartialEq for NotDownloaded {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.book, &other.book) && self.cause == other.cause
    }
}

impl Eq for NotDownloaded {}

impl fmt::Display for NotDownloaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has not been downloaded ({})", self.book, self.cause)
    }
}

/// Copies book databases from a local mirror directory.
///
/// The file name is the last path segment of the book's URL, so a mirror is
/// simply a directory of the files the URLs point at.
#[derive(Debug, Clone)]
pub struct MirrorDownloader {
    root: PathBuf,
}

impl MirrorDownloader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn source(&self, book: &Book) -> PathBuf {
        let url = book.url().split(['?', '#']).next().unwrap_or_default();
        match url.rsplit('/').find(|segment| !segment.is_empty()) {
            Some(name) => self.root.join(name),
            None => self.root.join(format!("{}.sqlite", book.id())),
        }
    }
}

#[async_trait]
impl Downloader for MirrorDownloader {
    #[instrument(skip_all, fields(book = %book))]
    async fn download(&self, book: &Book) -> Result<()> {
        let source = self.source(book);
        let target = book.local_path();
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| download_error(parent))?;
        }
        // Copy next to the target then rename, so an interrupted copy never
        // leaves a truncated database where the book expects a complete one.
        let partial = target.with_extension("part");
        debug!(source = %source.display(), partial = %partial.display(), "Copying from mirror");
        if let Err(err) = tokio::fs::copy(&source, &partial).await {
            discard(&partial).await;
            return Err(err).or_raise(|| download_error(&source));
        }
        tokio::fs::rename(&partial, target).await.or_raise(|| download_error(target))?;
        info!(target = %target.display(), "Downloaded book");
        Ok(())
    }
}

async fn discard(partial: &Path) {
    if let Err(err) = tokio::fs::remove_file(partial).await
        && err.kind() != io::ErrorKind::NotFound
    {
        warn!(partial = %partial.display(), error = %err, "Could not remove partial download");
    }
}

fn download_error(path: &Path) -> ErrorKind {
    ErrorKind::Download(path.display().to_string())
}

/// A downloader for when there's nowhere to download from.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDownloader;

#[async_trait]
impl Downloader for OfflineDownloader {
    async fn download(&self, book: &Book) -> Result<()> {
        exn::bail!(ErrorKind::Download(format!("no download source configured for {book}")));
    }
}
