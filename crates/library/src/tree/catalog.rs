use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::language::Language;
use crate::manifest::CatalogManifest;
use crate::tree::{Book, Folder, Item, ParentRef};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

const ROOT: &str = "/";

/// Root of a language's content tree.
#[derive(Debug)]
pub struct Catalog {
    language: Arc<Language>,
    name: String,
    folders: Vec<Arc<Folder>>,
    books: Vec<Arc<Book>>,
    books_by_id: HashMap<u32, Arc<Book>>,
}

impl Catalog {
    pub(crate) fn build(language: Arc<Language>, manifest: CatalogManifest, context: &Arc<Context>) -> Arc<Self> {
        let CatalogManifest { name, folders, books } = manifest;
        let catalog = Arc::new_cyclic(|this| {
            let parent = ParentRef::Catalog(this.clone());
            let mut books_by_id = HashMap::new();
            let folders = folders
                .into_iter()
                .map(|folder| Folder::build(folder, parent.clone(), &language, context, &mut books_by_id))
                .collect();
            let books = books
                .into_iter()
                .map(|book| Book::build(book, parent.clone(), &language, context, &mut books_by_id))
                .collect();
            Self {
                language: language.clone(),
                name,
                folders,
                books,
                books_by_id,
            }
        });
        debug!(language = %catalog.language.code(), books = catalog.books_by_id.len(), "Built catalog");
        catalog
    }

    pub fn path(&self) -> &str {
        ROOT
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    /// Folders first, then books, each in manifest order.
    pub fn children(self: &Arc<Self>) -> Vec<Item> {
        let folders = self.folders.iter().cloned().map(Item::Folder);
        folders.chain(self.books.iter().cloned().map(Item::Book)).collect()
    }

    /// Any book in this catalog, however deeply it's nested.
    pub fn book_by_id(&self, id: u32) -> Option<Arc<Book>> {
        self.books_by_id.get(&id).cloned()
    }

    pub fn books(&self) -> impl Iterator<Item = &Arc<Book>> {
        self.books_by_id.values()
    }

    /// Resolve an absolute path to the item it names.
    ///
    /// Folders and books are matched by path prefix, one level at a time.
    /// Once a book is reached the rest is resolved by its database, which may
    /// fail with [`ErrorKind::NotDownloaded`].
    #[instrument(level = "debug", skip(self))]
    pub async fn lookup_path(self: &Arc<Self>, path: &str) -> Result<Item> {
        let mut current = Item::Catalog(self.clone());
        loop {
            if current.path() == path {
                return Ok(current);
            }
            let children = match &current {
                Item::Catalog(catalog) => catalog.children(),
                Item::Folder(folder) => folder.children(),
                Item::Book(book) => return book.lookup_uri(path).await.map(Item::Node),
                Item::Node(_) => break,
            };
            match children.into_iter().find(|child| contains(child.path(), path)) {
                Some(child) => current = child,
                None => break,
            }
        }
        exn::bail!(ErrorKind::NotFound(path.to_string()))
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.language.code())
    }
}

/// Whether `path` is `parent` itself or lies somewhere below it.
fn contains(parent: &str, path: &str) -> bool {
    match path.strip_prefix(parent) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || parent.ends_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::OfflineDownloader;
    use crate::test_utils::{self, BOFM, DC};
    use rstest::rstest;
    use std::ops::Deref;

    #[rstest]
    #[case("/scriptures", "/scriptures", true)]
    #[case("/scriptures", "/scriptures/bofm", true)]
    #[case("/scriptures", "/scriptures-extra", false)]
    #[case("/scriptures/bofm", "/scriptures", false)]
    #[case("/", "/magazines", true)]
    fn test_contains(#[case] parent: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(contains(parent, path), expected);
    }

    #[rstest]
    #[case::catalog("/")]
    #[case::folder("/scriptures")]
    #[case::other_folder("/magazines")]
    #[case::book("/scriptures/dc-testament")]
    #[case::node("/scriptures/bofm/1-ne")]
    #[case::leaf("/scriptures/bofm/1-ne/3")]
    #[tokio::test]
    async fn test_lookup_round_trip(#[case] path: &str) {
        let data = tempfile::tempdir().unwrap();
        let library = test_utils::library(data.path(), Arc::new(OfflineDownloader)).await;
        test_utils::install(&library, 1, &BOFM).await;
        let catalog = library.catalog("eng").await.unwrap();
        let item = catalog.lookup_path(path).await.unwrap();
        assert_eq!(item.path(), path);
    }

    #[tokio::test]
    async fn test_every_reachable_item_round_trips() {
        let data = tempfile::tempdir().unwrap();
        let library = test_utils::library(data.path(), Arc::new(OfflineDownloader)).await;
        test_utils::install(&library, 1, &BOFM).await;
        test_utils::install(&library, 2, &DC).await;
        let catalog = library.catalog("eng").await.unwrap();

        let mut pending = vec![Item::Catalog(catalog.clone())];
        let mut visited = Vec::new();
        while let Some(item) = pending.pop() {
            let found = catalog.lookup_path(item.path()).await.unwrap();
            assert_eq!(found.path(), item.path());
            assert_eq!(found.name(), item.name());
            visited.push(item.path().to_string());
            match item.children().await {
                Ok(children) => pending.extend(children),
                Err(err) => assert!(matches!(err.deref(), ErrorKind::NotDownloaded(_)), "{}: {err:?}", item.path()),
            }
        }
        visited.sort();
        assert_eq!(
            visited,
            [
                "/",
                "/magazines",
                "/magazines/liahona",
                "/scriptures",
                "/scriptures/bofm",
                "/scriptures/bofm/1-ne",
                "/scriptures/bofm/1-ne/1",
                "/scriptures/bofm/1-ne/3",
                "/scriptures/bofm/enos/1",
                "/scriptures/dc-testament",
                "/scriptures/dc-testament/dc",
                "/scriptures/dc-testament/dc/1",
                "/scriptures/dc-testament/dc/4",
            ]
        );
    }

    #[rstest]
    #[case::no_folder("/videos")]
    #[case::no_book("/scriptures/pgp")]
    #[case::no_node("/scriptures/bofm/moro/10")]
    #[tokio::test]
    async fn test_lookup_not_found(#[case] path: &str) {
        let data = tempfile::tempdir().unwrap();
        let library = test_utils::library(data.path(), Arc::new(OfflineDownloader)).await;
        test_utils::install(&library, 1, &BOFM).await;
        let catalog = library.catalog("eng").await.unwrap();
        let err = catalog.lookup_path(path).await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_lookup_inside_missing_book() {
        let data = tempfile::tempdir().unwrap();
        let library = test_utils::library(data.path(), Arc::new(OfflineDownloader)).await;
        let catalog = library.catalog("eng").await.unwrap();
        let err = catalog.lookup_path("/magazines/liahona/2024/01").await.unwrap_err();
        let ErrorKind::NotDownloaded(missing) = err.deref() else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(missing.book().id(), 3);
        assert!(Arc::ptr_eq(missing.book(), &catalog.book_by_id(3).unwrap()));
    }

    #[tokio::test]
    async fn test_books_indexed_by_id() {
        let data = tempfile::tempdir().unwrap();
        let library = test_utils::library(data.path(), Arc::new(OfflineDownloader)).await;
        let catalog = library.catalog("eng").await.unwrap();
        assert_eq!(catalog.books().count(), 3);
        assert_eq!(catalog.book_by_id(2).unwrap().path(), "/scriptures/dc-testament");
        assert!(catalog.book_by_id(42).is_none());
    }
}
