use crate::connection::{FootnoteRow, NodeRow};
use crate::error::Result;
use crate::tree::{Book, Item};
use std::fmt;
use std::sync::Arc;

/// An entry in a book's table of contents: a chapter, a section, a heading.
///
/// Nodes are read from the book database on demand and not cached; two
/// lookups of the same path give two equal but separate values.
#[derive(Debug, Clone)]
pub struct Node {
    book: Arc<Book>,
    id: i64,
    name: String,
    path: String,
    parent_id: i64,
    has_content: bool,
    child_count: i64,
}

impl Node {
    pub(crate) fn from_row(book: Arc<Book>, row: NodeRow) -> Self {
        Self {
            book,
            id: row.id,
            name: row.title,
            path: row.uri,
            parent_id: row.parent_id,
            has_content: row.has_content != 0,
            child_count: row.child_count,
        }
    }

    pub fn book(&self) -> &Arc<Book> {
        &self.book
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the node has a body of its own (folders of chapters don't).
    pub fn has_content(&self) -> bool {
        self.has_content
    }

    pub fn child_count(&self) -> i64 {
        self.child_count
    }

    /// The enclosing node, or the book itself for top-level nodes.
    ///
    /// A top-level node with a single child is hidden by
    /// [`Book::children()`], so that child's parent is the book.
    pub async fn parent(&self) -> Result<Item> {
        if self.parent_id == 0 {
            return Ok(Item::Book(self.book.clone()));
        }
        let parent = self.book.lookup_id(self.parent_id).await?;
        if parent.parent_id == 0 && parent.child_count == 1 {
            return Ok(Item::Book(self.book.clone()));
        }
        Ok(Item::Node(parent))
    }

    /// Direct children, in database order.
    pub async fn children(&self) -> Result<Vec<Node>> {
        self.book.node_children(self.id).await
    }

    /// The HTML body of the node.
    ///
    /// Fails with [`NotFound`](crate::ErrorKind::NotFound) when the node has
    /// no content.
    pub async fn content(&self) -> Result<String> {
        self.book.node_content(self).await
    }

    /// Footnotes attached to the node.
    ///
    /// With an empty `verses` every footnote is returned. Otherwise only those
    /// whose name starts with one of the verse numbers are kept (`"10c"`
    /// belongs to verse 10); footnotes without a leading number are dropped.
    pub async fn footnotes(&self, verses: &[u32]) -> Result<Vec<Footnote>> {
        let rows = self.book.node_footnotes(self).await?;
        let footnotes = rows.into_iter().map(|row| Footnote::from_row(row, &self.path));
        if verses.is_empty() {
            return Ok(footnotes.collect());
        }
        let mut verses = verses.to_vec();
        verses.sort_unstable();
        Ok(footnotes.filter(|footnote| footnote.verse().is_some_and(|verse| verses.binary_search(&verse).is_ok())).collect())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}

/// A footnote reference attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footnote {
    /// Marker within the text, e.g. `"3b"`.
    pub name: String,
    pub link_name: String,
    /// HTML body.
    pub content: String,
    /// Path of the node the footnote belongs to.
    pub path: String,
}

impl Footnote {
    fn from_row(row: FootnoteRow, path: &str) -> Self {
        Self {
            name: row.ref_name,
            link_name: row.link_name,
            content: row.content,
            path: path.to_string(),
        }
    }

    /// The verse number the footnote's name starts with.
    pub fn verse(&self) -> Option<u32> {
        let end = self.name.find(|c: char| !c.is_ascii_digit()).unwrap_or(self.name.len());
        self.name[..end].parse().ok()
    }
}
