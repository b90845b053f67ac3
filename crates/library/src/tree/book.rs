use crate::Context;
use crate::connection::error::ErrorKind as ConnectionErrorKind;
use crate::connection::{BookConnection, FootnoteRow};
use crate::download::{Cause, NotDownloaded};
use crate::error::{ErrorKind, Result};
use crate::language::Language;
use crate::manifest::BookManifest;
use crate::tree::{Item, Node, ParentRef};
use async_trait::async_trait;
use exn::ResultExt;
use ldss_cache::{Evict, Memo};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

type ConnectionMemo = Memo<Arc<BookConnection>, crate::connection::error::Error>;

/// A book whose nodes live in their own database file.
///
/// The database may not be present locally; anything that needs it fails with
/// [`ErrorKind::NotDownloaded`] until it has been [downloaded](Self::download).
/// The open connection is cached until the connection pool evicts it, after
/// which the next query opens it again.
pub struct Book {
    id: u32,
    name: String,
    path: String,
    url: String,
    language: Arc<Language>,
    parent: ParentRef,
    local_path: PathBuf,
    context: Arc<Context>,
    connection: ConnectionMemo,
}

impl Book {
    pub(crate) fn build(
        manifest: BookManifest,
        parent: ParentRef,
        language: &Arc<Language>,
        context: &Arc<Context>,
        books_by_id: &mut HashMap<u32, Arc<Book>>,
    ) -> Arc<Self> {
        let local_path = local_path(context.data_dir(), language, manifest.id);
        let connection = {
            let path = local_path.clone();
            Memo::new(move || {
                let path = path.clone();
                async move { BookConnection::open(&path).await.map(Arc::new) }
            })
        };
        let book = Arc::new(Self {
            id: manifest.id,
            name: manifest.name,
            path: manifest.path,
            url: manifest.url,
            language: language.clone(),
            parent,
            local_path,
            context: context.clone(),
            connection,
        });
        books_by_id.insert(book.id, book.clone());
        book
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Remote location of the book database.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    /// Where the book database is (or will be, once downloaded).
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn parent(&self) -> Option<Item> {
        self.parent.upgrade()
    }

    /// Whether a connection to the database is currently cached.
    pub async fn is_open(&self) -> bool {
        self.connection.is_populated().await
    }

    /// Fetch the database with the library's downloader.
    pub async fn download(&self) -> Result<()> {
        info!(book = %self, url = %self.url, "Downloading book");
        self.context.downloader().download(self).await
    }

    /// The open database, opening it first if needed.
    ///
    /// Registers the book with the connection pool before opening, which may
    /// evict some other book's connection.
    pub(crate) async fn connection(self: &Arc<Self>) -> Result<Arc<BookConnection>> {
        self.context.pool().register(self).await;
        let err = match self.connection.get().await {
            Ok(connection) => return Ok(connection),
            Err(err) => err,
        };
        let cause = match &*err {
            ConnectionErrorKind::Missing(kind) => Some(Cause::Missing(*kind)),
            ConnectionErrorKind::Invalid(reason) => Some(Cause::Invalid(*reason)),
            ConnectionErrorKind::Prepare | ConnectionErrorKind::Query => None,
        };
        let Some(cause) = cause else {
            return Err(err).or_raise(|| ErrorKind::Database);
        };
        debug!(book = %self, %cause, "Book not downloaded");
        exn::bail!(ErrorKind::NotDownloaded(NotDownloaded::new(self.clone(), cause)))
    }

    /// Top-level nodes of the book, as stored.
    pub async fn index(self: &Arc<Self>) -> Result<Vec<Node>> {
        self.node_children(0).await
    }

    /// Top-level nodes, except that a node with exactly one child is replaced
    /// by that child.
    #[instrument(level = "debug", skip_all, fields(book = %self.path))]
    pub async fn children(self: &Arc<Self>) -> Result<Vec<Node>> {
        let index = self.index().await?;
        let mut children = Vec::with_capacity(index.len());
        for node in index {
            if node.child_count() != 1 {
                children.push(node);
                continue;
            }
            match node.children().await {
                Ok(mut only) if only.len() == 1 => children.extend(only.pop()),
                _ => children.push(node),
            }
        }
        Ok(children)
    }

    pub async fn lookup_id(self: &Arc<Self>, id: i64) -> Result<Node> {
        let row = self.connection().await?.by_id(id).await.or_raise(|| ErrorKind::Database)?;
        let row = row.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(format!("{}#{id}", self.path))))?;
        Ok(Node::from_row(self.clone(), row))
    }

    pub async fn lookup_uri(self: &Arc<Self>, uri: &str) -> Result<Node> {
        let row = self.connection().await?.by_uri(uri).await.or_raise(|| ErrorKind::Database)?;
        let row = row.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(uri.to_string())))?;
        Ok(Node::from_row(self.clone(), row))
    }

    pub(crate) async fn node_children(self: &Arc<Self>, parent_id: i64) -> Result<Vec<Node>> {
        let rows = self.connection().await?.children(parent_id).await.or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(|row| Node::from_row(self.clone(), row)).collect())
    }

    pub(crate) async fn node_content(self: &Arc<Self>, node: &Node) -> Result<String> {
        let content = self.connection().await?.content(node.id()).await.or_raise(|| ErrorKind::Database)?;
        match content.flatten() {
            Some(content) => Ok(content),
            None => exn::bail!(ErrorKind::NotFound(format!("content of {}", node.path()))),
        }
    }

    pub(crate) async fn node_footnotes(self: &Arc<Self>, node: &Node) -> Result<Vec<FootnoteRow>> {
        self.connection().await?.footnotes(node.id()).await.or_raise(|| ErrorKind::Database)
    }
}

#[async_trait]
impl Evict for Book {
    fn label(&self) -> String {
        self.to_string()
    }

    async fn evict(&self) -> ldss_cache::error::Result<()> {
        let Some(connection) = self.connection.take().await else {
            return Ok(());
        };
        // Searches may still be holding the connection; they keep it alive
        // and it closes when the last of them lets go.
        if Arc::strong_count(&connection) == 1 {
            connection.close().await;
            debug!(book = %self, "Closed book database");
        } else {
            debug!(book = %self, "Book database still in use; released from cache");
        }
        Ok(())
    }
}

impl fmt::Debug for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Book")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("language", &self.language.code())
            .field("local_path", &self.local_path)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}

/// `<data_dir>/books/<language id>/<book id>.sqlite`
fn local_path(data_dir: &Path, language: &Language, id: u32) -> PathBuf {
    data_dir.join("books").join(language.id().to_string()).join(format!("{id}.sqlite"))
}
