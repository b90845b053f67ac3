//! A multi-language library of books that are downloaded on demand.
//!
//! Each language has a [`Catalog`] of [`Folder`]s and [`Book`]s, built from a
//! manifest. Every book's contents ([`Node`]s) live in a separate SQLite
//! database that may not be on disk yet: operations that need one fail with
//! [`ErrorKind::NotDownloaded`], and [`auto_download`] turns that into a
//! download followed by a retry.
//!
//! All state lives in a [`Library`], which owns the catalogs and the pool of
//! open book databases.

mod connection;
pub mod download;
pub mod error;
mod language;
pub mod manifest;
pub mod search;
#[cfg(test)]
pub(crate) mod test_utils;
mod tree;

pub use crate::download::{
    Cause, Downloader, Message, MirrorDownloader, NotDownloaded, OfflineDownloader, auto_download,
};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::language::Language;
pub use crate::manifest::{FileManifestSource, ManifestSource};
pub use crate::search::{Reference, SearchResult, sort_results};
pub use crate::tree::{Book, Catalog, Folder, Footnote, Item, Node};
use ldss_cache::{ConnectionPool, DEFAULT_CONNECTION_LIMIT, Memo};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, instrument};

const DEFAULT_SEARCH_BUFFER: usize = 64;

type CatalogMemo = Memo<Arc<Catalog>, Error>;

/// How a [`Library`] is set up.
#[derive(Debug, Clone)]
pub struct Options {
    /// Book databases are stored under `<data_dir>/books`.
    pub data_dir: PathBuf,
    /// Maximum number of books with an open database at once.
    pub connection_limit: usize,
    pub languages: Vec<Language>,
    /// Code of the language used when none is given.
    pub default_language: String,
    /// Capacity of the result channel used by [`Library::search_sorted()`].
    pub search_buffer: usize,
}

impl Options {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            languages: vec![Language::new(1, "eng", "English")],
            default_language: "eng".to_string(),
            search_buffer: DEFAULT_SEARCH_BUFFER,
        }
    }
}

/// Shared by every book of every catalog.
pub(crate) struct Context {
    data_dir: PathBuf,
    pool: ConnectionPool<Book>,
    downloader: Arc<dyn Downloader>,
}

impl Context {
    pub(crate) fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub(crate) fn pool(&self) -> &ConnectionPool<Book> {
        &self.pool
    }

    pub(crate) fn downloader(&self) -> &dyn Downloader {
        self.downloader.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("data_dir", &self.data_dir).field("pool", &self.pool).finish_non_exhaustive()
    }
}

/// Entry point: the configured languages and their lazily loaded catalogs.
pub struct Library {
    context: Arc<Context>,
    languages: Vec<Arc<Language>>,
    default_language: Arc<Language>,
    search_buffer: usize,
    manifests: Arc<dyn ManifestSource>,
    catalogs: Mutex<HashMap<u32, Arc<CatalogMemo>>>,
}

impl Library {
    /// Fails with [`ErrorKind::Language`] if the default language isn't one
    /// of the configured languages.
    pub fn new(options: Options, manifests: Arc<dyn ManifestSource>, downloader: Arc<dyn Downloader>) -> Result<Arc<Self>> {
        let Options {
            data_dir,
            connection_limit,
            languages,
            default_language,
            search_buffer,
        } = options;
        let languages: Vec<_> = languages.into_iter().map(Arc::new).collect();
        let Some(default) = languages.iter().find(|language| language.code() == default_language).cloned() else {
            exn::bail!(ErrorKind::Language(default_language));
        };
        debug!(data_dir = %data_dir.display(), connection_limit, languages = languages.len(), "Opening library");
        Ok(Arc::new(Self {
            context: Arc::new(Context {
                data_dir,
                pool: ConnectionPool::new(connection_limit),
                downloader,
            }),
            languages,
            default_language: default,
            search_buffer: search_buffer.max(1),
            manifests,
            catalogs: Mutex::new(HashMap::new()),
        }))
    }

    pub fn languages(&self) -> &[Arc<Language>] {
        &self.languages
    }

    pub fn default_language(&self) -> &Arc<Language> {
        &self.default_language
    }

    pub fn language(&self, code: &str) -> Result<Arc<Language>> {
        match self.languages.iter().find(|language| language.code() == code) {
            Some(language) => Ok(language.clone()),
            None => exn::bail!(ErrorKind::Language(code.to_string())),
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.context.data_dir()
    }

    pub fn search_buffer(&self) -> usize {
        self.search_buffer
    }

    /// The catalog for `language`, loading its manifest on first use.
    ///
    /// A catalog that loaded successfully is kept for the lifetime of the
    /// library; a failed load is retried on the next call.
    #[instrument(level = "debug", skip(self))]
    pub async fn catalog(&self, language: &str) -> Result<Arc<Catalog>> {
        let language = self.language(language)?;
        let memo = {
            let mut catalogs = self.catalogs.lock().await;
            catalogs.entry(language.id()).or_insert_with(|| Arc::new(self.catalog_memo(language))).clone()
        };
        memo.get().await
    }

    fn catalog_memo(&self, language: Arc<Language>) -> CatalogMemo {
        let manifests = self.manifests.clone();
        let context = self.context.clone();
        Memo::new(move || {
            let manifests = manifests.clone();
            let context = context.clone();
            let language = language.clone();
            async move {
                let manifest = manifests.manifest(&language).await?;
                Ok(Catalog::build(language, manifest, &context))
            }
        })
    }

    /// A book from `language`'s catalog by id.
    pub async fn book(&self, language: &str, id: u32) -> Result<Arc<Book>> {
        let catalog = self.catalog(language).await?;
        match catalog.book_by_id(id) {
            Some(book) => Ok(book),
            None => exn::bail!(ErrorKind::NotFound(format!("book {id} in {language}"))),
        }
    }

    /// The default language's catalog, reported through [`auto_download`].
    pub fn default_catalog(self: &Arc<Self>) -> mpsc::Receiver<Message<Arc<Catalog>>> {
        let library = self.clone();
        auto_download(move || {
            let library = library.clone();
            async move { library.catalog(library.default_language.code()).await }
        })
    }

    /// Resolve `path` in `language`'s catalog, downloading books as needed.
    pub fn lookup_path(self: &Arc<Self>, language: &str, path: &str) -> mpsc::Receiver<Message<Item>> {
        let library = self.clone();
        let language = language.to_string();
        let path = path.to_string();
        auto_download(move || {
            let library = library.clone();
            let language = language.clone();
            let path = path.clone();
            async move { library.catalog(&language).await?.lookup_path(&path).await }
        })
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("context", &self.context)
            .field("languages", &self.languages)
            .field("default_language", &self.default_language.code())
            .finish_non_exhaustive()
    }
}
