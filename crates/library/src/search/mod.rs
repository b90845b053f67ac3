//! Full-text search over a subtree of a catalog.
//!
//! The walk itself is sequential, but every node with content is scored on its
//! own task. Results flow back through a bounded channel that closes once the
//! walk has finished and every scoring task has completed.

mod score;

use crate::Library;
use crate::error::Result;
use crate::tree::{Item, Node};
use futures::future::BoxFuture;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};

/// An address within the library, optionally narrowed to verses or qualified
/// with search keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reference {
    /// Language code, e.g. `eng`.
    pub language: String,
    pub path: String,
    pub keywords: Vec<String>,
    pub verses: Vec<u32>,
}

impl Reference {
    pub fn new(language: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_verses(mut self, verses: impl IntoIterator<Item = u32>) -> Self {
        self.verses = verses.into_iter().collect();
        self
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.language, self.path)
    }
}

/// A node that matched a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub reference: Reference,
    pub title: String,
    /// How many times the keywords occur in the node's text.
    pub weight: usize,
    /// The text around the first match, stripped of markup.
    pub excerpt: String,
}

impl SearchResult {
    /// Heaviest first; equal weights by path so the order is stable.
    pub fn rank(&self, other: &Self) -> Ordering {
        other.weight.cmp(&self.weight).then_with(|| self.reference.path.cmp(&other.reference.path))
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({}): {}", self.weight, self.title, self.reference.path, self.excerpt)
    }
}

pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(SearchResult::rank);
}

struct Query {
    language: String,
    keywords: Vec<String>,
    lowercase: Vec<String>,
}

impl Library {
    /// Search everything below `reference.path` for `reference.keywords`,
    /// sending each matching node to `results` as soon as it has been scored.
    ///
    /// Returns once the whole subtree has been walked; results may keep
    /// arriving until the channel closes. If part of the subtree can't be
    /// read (a book that isn't downloaded, say) the walk stops there and the
    /// error is returned, but whatever was already found is still delivered.
    #[instrument(skip_all, fields(reference = %reference))]
    pub async fn search(&self, reference: &Reference, results: mpsc::Sender<SearchResult>) -> Result<()> {
        let catalog = self.catalog(&reference.language).await?;
        let item = catalog.lookup_path(&reference.path).await?;
        let query = Arc::new(Query {
            language: reference.language.clone(),
            keywords: reference.keywords.clone(),
            lowercase: reference.keywords.iter().map(|keyword| keyword.to_lowercase()).collect(),
        });
        walk(item, &query, &results).await
    }

    /// [`search()`](Self::search), collected and ranked.
    pub async fn search_sorted(&self, reference: &Reference) -> Result<Vec<SearchResult>> {
        let (tx, mut rx) = mpsc::channel(self.search_buffer());
        let collect = async {
            let mut results = Vec::new();
            while let Some(result) = rx.recv().await {
                results.push(result);
            }
            results
        };
        let (outcome, mut results) = tokio::join!(self.search(reference, tx), collect);
        outcome?;
        sort_results(&mut results);
        debug!(results = results.len(), "Search finished");
        Ok(results)
    }
}

fn walk<'a>(item: Item, query: &'a Arc<Query>, results: &'a mpsc::Sender<SearchResult>) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        if let Item::Node(node) = &item
            && node.has_content()
        {
            tokio::spawn(score_node(node.clone(), query.clone(), results.clone()));
        }
        for child in item.children().await? {
            walk(child, query, results).await?;
        }
        Ok(())
    })
}

async fn score_node(node: Node, query: Arc<Query>, results: mpsc::Sender<SearchResult>) {
    let content = match node.content().await {
        Ok(content) => content,
        Err(err) => {
            trace!(node = %node.path(), error = %&*err, "Skipping unreadable node");
            return;
        },
    };
    let Some(score) = score::score(&score::text(&content), &query.lowercase) else {
        return;
    };
    let result = SearchResult {
        reference: Reference::new(query.language.clone(), node.path()).with_keywords(query.keywords.iter().cloned()),
        title: node.name().to_string(),
        weight: score.weight,
        excerpt: score.excerpt,
    };
    if results.send(result).await.is_err() {
        trace!(node = %node.path(), "Search receiver dropped");
    }
}
