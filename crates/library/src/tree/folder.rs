use crate::Context;
use crate::language::Language;
use crate::manifest::FolderManifest;
use crate::tree::{Book, Item, ParentRef};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named group of books (and possibly other folders) within a catalog.
#[derive(Debug)]
pub struct Folder {
    name: String,
    path: String,
    parent: ParentRef,
    folders: Vec<Arc<Folder>>,
    books: Vec<Arc<Book>>,
}

impl Folder {
    pub(crate) fn build(
        manifest: FolderManifest,
        parent: ParentRef,
        language: &Arc<Language>,
        context: &Arc<Context>,
        books_by_id: &mut HashMap<u32, Arc<Book>>,
    ) -> Arc<Self> {
        let FolderManifest { name, path, folders, books } = manifest;
        Arc::new_cyclic(|this| {
            let me = ParentRef::Folder(this.clone());
            let folders = folders
                .into_iter()
                .map(|folder| Folder::build(folder, me.clone(), language, context, books_by_id))
                .collect();
            let books =
                books.into_iter().map(|book| Book::build(book, me.clone(), language, context, books_by_id)).collect();
            Self {
                name,
                path,
                parent,
                folders,
                books,
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> Option<Item> {
        self.parent.upgrade()
    }

    /// Folders first, then books, each in manifest order.
    pub fn children(self: &Arc<Self>) -> Vec<Item> {
        let folders = self.folders.iter().cloned().map(Item::Folder);
        folders.chain(self.books.iter().cloned().map(Item::Book)).collect()
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}
