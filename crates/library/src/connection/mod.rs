//! Read-only access to a single book database.
//!
//! Every book is its own SQLite file with two tables:
//! - `node(id, title, uri, parent_id, content)`: the navigation tree and the
//!   HTML body of each content-bearing node (`content` is `NULL` for folders).
//! - `ref(node_id, ref_name, link_name, ref)`: footnotes belonging to a node.

pub mod error;

use crate::connection::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, FromRow};
use std::path::Path;
use tracing::{debug, instrument};

// Content is read far more than it's navigated; a handful of readers per book
// lets a search over one book fan out.
const MAX_CONNECTIONS: u32 = 4;

macro_rules! select_node {
    ($filter:literal) => {
        concat!(
            "SELECT node.id, node.title, node.uri, COALESCE(node.parent_id, 0) AS parent_id, ",
            "CASE WHEN node.content IS NULL THEN 0 ELSE 1 END AS has_content, ",
            "(SELECT COUNT(*) FROM node AS subnode WHERE subnode.parent_id = node.id) AS child_count ",
            "FROM node WHERE ",
            $filter
        )
    };
}

const CHILDREN: &str = select_node!("node.parent_id = ?");
const BY_URI: &str = select_node!("node.uri = ?");
const BY_ID: &str = select_node!("node.id = ?");
const CONTENT: &str = "SELECT content FROM node WHERE id = ?";
const FOOTNOTES: &str = "SELECT ref.ref_name, ref.link_name, ref.ref FROM ref WHERE ref.node_id = ?";

/// One row of the `node` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub(crate) struct NodeRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) uri: String,
    pub(crate) parent_id: i64,
    pub(crate) has_content: i64,
    pub(crate) child_count: i64,
}

/// One row of the `ref` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub(crate) struct FootnoteRow {
    pub(crate) ref_name: String,
    pub(crate) link_name: String,
    #[sqlx(rename = "ref")]
    pub(crate) content: String,
}

/// An open, validated book database.
///
/// Every query is prepared once when the database is opened, which rejects
/// files with the wrong schema. After that the prepared statements live in
/// sqlx's per-connection statement cache: they belong to the pooled
/// connections and are finalized when [`close()`](Self::close) shuts them
/// down.
#[derive(Debug)]
pub(crate) struct BookConnection {
    pool: SqlitePool,
}

impl BookConnection {
    /// Open the book database at `path`.
    ///
    /// A missing file fails with [`ErrorKind::Missing`] before anything is
    /// opened. A file that can't be opened as a database, or one that doesn't
    /// contain a readable `node` table (typically a partial download), fails
    /// with [`ErrorKind::Invalid`].
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub(crate) async fn open(path: &Path) -> Result<Self> {
        if let Err(err) = tokio::fs::metadata(path).await {
            exn::bail!(ErrorKind::Missing(err.kind()));
        }
        let options = SqliteConnectOptions::new().filename(path).read_only(true).create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Invalid("cannot open database"))?;
        let sanity = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM node;").fetch_one(&pool).await;
        let nodes = match sanity {
            Ok(nodes) => nodes,
            Err(err) => {
                pool.close().await;
                return Err(err).or_raise(|| ErrorKind::Invalid("node table unreadable"));
            },
        };
        for sql in [CHILDREN, BY_URI, BY_ID, CONTENT, FOOTNOTES] {
            if let Err(err) = (&pool).prepare(sql).await {
                pool.close().await;
                return Err(err).or_raise(|| ErrorKind::Prepare);
            }
        }
        debug!(nodes, "Opened book database");
        Ok(Self { pool })
    }

    /// Nodes whose `parent_id` is `parent_id`, in table order.
    pub(crate) async fn children(&self, parent_id: i64) -> Result<Vec<NodeRow>> {
        sqlx::query_as(CHILDREN)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)
    }

    pub(crate) async fn by_uri(&self, uri: &str) -> Result<Option<NodeRow>> {
        sqlx::query_as(BY_URI)
            .bind(uri)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)
    }

    pub(crate) async fn by_id(&self, id: i64) -> Result<Option<NodeRow>> {
        sqlx::query_as(BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)
    }

    /// The HTML body of a node. The outer `Option` is the row, the inner one
    /// the (nullable) content column.
    pub(crate) async fn content(&self, id: i64) -> Result<Option<Option<String>>> {
        sqlx::query_scalar(CONTENT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)
    }

    pub(crate) async fn footnotes(&self, node_id: i64) -> Result<Vec<FootnoteRow>> {
        sqlx::query_as(FOOTNOTES)
            .bind(node_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)
    }

    /// Close every connection to the database. Statements go with them.
    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
