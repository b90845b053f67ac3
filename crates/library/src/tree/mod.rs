//! The content tree: Catalog → Folder/Book → Node.
//!
//! Catalogs, folders and books are built once from a manifest and shared
//! behind [`Arc`]s; each holds a [`Weak`] reference to its parent. Nodes come
//! from a book's database and are materialized fresh for every query.

mod book;
mod catalog;
mod folder;
mod node;

pub use self::book::Book;
pub use self::catalog::Catalog;
pub use self::folder::Folder;
pub use self::node::{Footnote, Node};
use crate::error::Result;
use std::fmt;
use std::sync::{Arc, Weak};

/// Any entry of the content tree.
#[derive(Debug, Clone)]
pub enum Item {
    Catalog(Arc<Catalog>),
    Folder(Arc<Folder>),
    Book(Arc<Book>),
    Node(Node),
}

impl Item {
    /// Absolute path of the item, e.g. `/scriptures/bofm/1-ne/3`.
    pub fn path(&self) -> &str {
        match self {
            Self::Catalog(catalog) => catalog.path(),
            Self::Folder(folder) => folder.path(),
            Self::Book(book) => book.path(),
            Self::Node(node) => node.path(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Catalog(catalog) => catalog.name(),
            Self::Folder(folder) => folder.name(),
            Self::Book(book) => book.name(),
            Self::Node(node) => node.name(),
        }
    }

    /// The item containing this one; `None` for a catalog.
    pub async fn parent(&self) -> Result<Option<Item>> {
        match self {
            Self::Catalog(_) => Ok(None),
            Self::Folder(folder) => Ok(folder.parent()),
            Self::Book(book) => Ok(book.parent()),
            Self::Node(node) => node.parent().await.map(Some),
        }
    }

    pub async fn children(&self) -> Result<Vec<Item>> {
        match self {
            Self::Catalog(catalog) => Ok(catalog.children()),
            Self::Folder(folder) => Ok(folder.children()),
            Self::Book(book) => Ok(book.children().await?.into_iter().map(Item::Node).collect()),
            Self::Node(node) => Ok(node.children().await?.into_iter().map(Item::Node).collect()),
        }
    }

    /// The item after this one among its parent's children.
    pub async fn next(&self) -> Result<Option<Item>> {
        self.sibling(1).await
    }

    /// The item before this one among its parent's children.
    pub async fn previous(&self) -> Result<Option<Item>> {
        self.sibling(-1).await
    }

    async fn sibling(&self, offset: isize) -> Result<Option<Item>> {
        let Some(parent) = self.parent().await? else {
            return Ok(None);
        };
        let siblings = parent.children().await?;
        let Some(position) = siblings.iter().position(|sibling| sibling.path() == self.path()) else {
            return Ok(None);
        };
        Ok(position.checked_add_signed(offset).and_then(|index| siblings.get(index)).cloned())
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_book(&self) -> Option<&Arc<Book>> {
        match self {
            Self::Book(book) => Some(book),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog(catalog) => write!(f, "{catalog}"),
            Self::Folder(folder) => write!(f, "{folder}"),
            Self::Book(book) => write!(f, "{book}"),
            Self::Node(node) => write!(f, "{node}"),
        }
    }
}

/// Non-owning link from a catalog-built item to its container.
#[derive(Debug, Clone)]
pub(crate) enum ParentRef {
    Catalog(Weak<Catalog>),
    Folder(Weak<Folder>),
}

impl ParentRef {
    /// `None` once the catalog that built the tree has been dropped.
    pub(crate) fn upgrade(&self) -> Option<Item> {
        match self {
            Self::Catalog(catalog) => catalog.upgrade().map(Item::Catalog),
            Self::Folder(folder) => folder.upgrade().map(Item::Folder),
        }
    }
}
