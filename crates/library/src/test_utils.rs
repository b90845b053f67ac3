//! Fixture books, catalogs and downloaders shared by the crate's tests.

use crate::download::Downloader;
use crate::error::{ErrorKind, Result};
use crate::language::Language;
use crate::manifest::{BookManifest, CatalogManifest, FolderManifest, ManifestSource};
use crate::tree::Book;
use crate::{Library, Options};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Connection, Executor, SqliteConnection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct FixtureNode {
    pub(crate) id: i64,
    pub(crate) title: &'static str,
    pub(crate) uri: &'static str,
    pub(crate) parent_id: i64,
    pub(crate) content: Option<&'static str>,
}

pub(crate) struct FixtureRef {
    pub(crate) node_id: i64,
    pub(crate) ref_name: &'static str,
    pub(crate) link_name: &'static str,
    pub(crate) content: &'static str,
}

pub(crate) struct FixtureBook {
    pub(crate) nodes: &'static [FixtureNode],
    pub(crate) refs: &'static [FixtureRef],
}

pub(crate) static BOFM: FixtureBook = FixtureBook {
    nodes: &[
        FixtureNode {
            id: 1,
            title: "1 Nephi",
            uri: "/scriptures/bofm/1-ne",
            parent_id: 0,
            content: None,
        },
        FixtureNode {
            id: 2,
            title: "1 Nephi 1",
            uri: "/scriptures/bofm/1-ne/1",
            parent_id: 1,
            content: Some(
                "<p class=\"verse\"><span>1</span> I, Nephi, having been born of goodly parents, therefore I was taught \
                 somewhat in all the learning of my father.</p>\n<p class=\"verse\"><span>2</span> And I had great \
                 <em>faith</em> in the Lord.</p>",
            ),
        },
        FixtureNode {
            id: 3,
            title: "1 Nephi 3",
            uri: "/scriptures/bofm/1-ne/3",
            parent_id: 1,
            content: Some(
                "<p>And it came to pass that I, Nephi, returned from speaking with the Lord to the tent of my \
                 father.</p><p>I will go and do the things which the Lord hath commanded.</p>",
            ),
        },
        FixtureNode {
            id: 4,
            title: "Enos",
            uri: "/scriptures/bofm/enos",
            parent_id: 0,
            content: None,
        },
        FixtureNode {
            id: 5,
            title: "Enos 1",
            uri: "/scriptures/bofm/enos/1",
            parent_id: 4,
            content: Some(
                "<p>And I said: Lord, how is it done?</p><p>And he said unto me: Because of thy faith in Christ. \
                 Wherefore, go to, thy faith hath made thee whole.</p>",
            ),
        },
    ],
    refs: &[
        FixtureRef {
            node_id: 2,
            ref_name: "1a",
            link_name: "goodly",
            content: "<p>Prov. 22:1.</p>",
        },
        FixtureRef {
            node_id: 2,
            ref_name: "2b",
            link_name: "faith",
            content: "<p>TG Faith.</p>",
        },
        FixtureRef {
            node_id: 2,
            ref_name: "10c",
            link_name: "learning",
            content: "<p>Mosiah 1:2.</p>",
        },
        FixtureRef {
            node_id: 2,
            ref_name: "intro",
            link_name: "heading",
            content: "<p>Chapter heading.</p>",
        },
    ],
};

pub(crate) static DC: FixtureBook = FixtureBook {
    nodes: &[
        FixtureNode {
            id: 1,
            title: "Doctrine and Covenants",
            uri: "/scriptures/dc-testament/dc",
            parent_id: 0,
            content: None,
        },
        FixtureNode {
            id: 2,
            title: "Section 1",
            uri: "/scriptures/dc-testament/dc/1",
            parent_id: 1,
            content: Some(
                "<p>That faith also might increase in the earth; that mine everlasting covenant might be \
                 established.</p><p>Faith cometh by hearing, and by faith the weak shall be made strong.</p>",
            ),
        },
        FixtureNode {
            id: 3,
            title: "Section 4",
            uri: "/scriptures/dc-testament/dc/4",
            parent_id: 1,
            content: Some(
                "<p>Remember faith, virtue, knowledge, temperance, patience, brotherly kindness, godliness, \
                 charity, humility, diligence.</p>",
            ),
        },
    ],
    refs: &[],
};

/// Shape of the `eng` catalog: two scripture books and a magazine that is
/// never installed.
pub(crate) fn manifest() -> CatalogManifest {
    let book = |id, name: &str, path: &str, file: &str| BookManifest {
        id,
        name: name.to_string(),
        path: path.to_string(),
        url: format!("https://example.org/eng/{file}"),
    };
    CatalogManifest {
        name: "Gospel Library".to_string(),
        folders: vec![
            FolderManifest {
                name: "Scriptures".to_string(),
                path: "/scriptures".to_string(),
                folders: vec![],
                books: vec![
                    book(1, "Book of Mormon", "/scriptures/bofm", "bofm.sqlite"),
                    book(2, "Doctrine and Covenants", "/scriptures/dc-testament", "dc.sqlite"),
                ],
            },
            FolderManifest {
                name: "Magazines".to_string(),
                path: "/magazines".to_string(),
                folders: vec![],
                books: vec![book(3, "Liahona", "/magazines/liahona", "liahona.sqlite?v=2")],
            },
        ],
        books: vec![],
    }
}

/// Create a book database at `path` holding `book`.
pub(crate) async fn write_book(path: &Path, book: &FixtureBook) {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.unwrap();
    }
    let options =
        SqliteConnectOptions::new().filename(path).create_if_missing(true).journal_mode(SqliteJournalMode::Delete);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    conn.execute(
        "CREATE TABLE node (id INTEGER PRIMARY KEY, title TEXT NOT NULL, uri TEXT NOT NULL, parent_id INTEGER NOT NULL, content TEXT NULL);",
    )
    .await
    .unwrap();
    conn.execute(
        "CREATE TABLE ref (id INTEGER PRIMARY KEY, node_id INTEGER NOT NULL, ref_name TEXT NOT NULL, link_name TEXT NOT NULL, ref TEXT NOT NULL);",
    )
    .await
    .unwrap();
    for node in book.nodes {
        sqlx::query("INSERT INTO node (id, title, uri, parent_id, content) VALUES (?, ?, ?, ?, ?)")
            .bind(node.id)
            .bind(node.title)
            .bind(node.uri)
            .bind(node.parent_id)
            .bind(node.content)
            .execute(&mut conn)
            .await
            .unwrap();
    }
    for footnote in book.refs {
        sqlx::query("INSERT INTO ref (node_id, ref_name, link_name, ref) VALUES (?, ?, ?, ?)")
            .bind(footnote.node_id)
            .bind(footnote.ref_name)
            .bind(footnote.link_name)
            .bind(footnote.content)
            .execute(&mut conn)
            .await
            .unwrap();
    }
    conn.close().await.unwrap();
}

/// Serves [`manifest()`] for `eng` and nothing else.
pub(crate) struct StaticManifest;

#[async_trait]
impl ManifestSource for StaticManifest {
    async fn manifest(&self, language: &Language) -> Result<CatalogManifest> {
        match language.code() {
            "eng" => Ok(manifest()),
            code => exn::bail!(ErrorKind::Catalog(code.to_string())),
        }
    }
}

/// "Downloads" fixture books by writing them in place. Books it doesn't know
/// are reported as downloaded without anything being written.
#[derive(Default)]
pub(crate) struct FixtureDownloader {
    books: HashMap<u32, &'static FixtureBook>,
    calls: AtomicUsize,
}

impl FixtureDownloader {
    pub(crate) fn with_books(books: impl IntoIterator<Item = (u32, &'static FixtureBook)>) -> Self {
        Self {
            books: books.into_iter().collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for FixtureDownloader {
    async fn download(&self, book: &Book) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fixture) = self.books.get(&book.id()) {
            write_book(book.local_path(), fixture).await;
        }
        Ok(())
    }
}

pub(crate) fn options(data_dir: &Path) -> Options {
    Options {
        languages: vec![Language::new(1, "eng", "English"), Language::new(2, "deu", "Deutsch")],
        ..Options::new(data_dir)
    }
}

pub(crate) async fn library(data_dir: &Path, downloader: Arc<dyn Downloader>) -> Arc<Library> {
    Library::new(options(data_dir), Arc::new(StaticManifest), downloader).unwrap()
}

pub(crate) async fn library_with_limit(data_dir: &Path, downloader: Arc<dyn Downloader>, limit: usize) -> Arc<Library> {
    let options = Options {
        connection_limit: limit,
        ..options(data_dir)
    };
    Library::new(options, Arc::new(StaticManifest), downloader).unwrap()
}

/// Write `fixture` where the `eng` book `id` expects its database.
pub(crate) async fn install(library: &Library, id: u32, fixture: &FixtureBook) -> Arc<Book> {
    let book = library.book("eng", id).await.unwrap();
    write_book(book.local_path(), fixture).await;
    book
}
