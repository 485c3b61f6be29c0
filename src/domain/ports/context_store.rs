//! Port trait for the optional context retrieval capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for context store operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A ranked context snippet returned by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    /// Snippet text.
    pub content: String,
    /// Retrieval relevance, `[0, 1]`, higher first.
    pub relevance: f64,
    /// Where the snippet came from, when known.
    pub source: Option<String>,
}

/// Port trait for the vector-memory / context retrieval collaborator.
///
/// Retrieval is optional: callers that disable it inject
/// [`NullContextStore`], and the engine degrades to using only the
/// immediate task context. A retrieval failure is treated the same way as
/// an empty result by consumers.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Retrieve up to `limit` snippets ranked by descending relevance.
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Snippet>>;
}

/// A no-op context store that retrieves nothing.
///
/// Use this when retrieval is disabled; the engine must keep operating
/// without it.
#[derive(Debug, Clone, Default)]
pub struct NullContextStore;

impl NullContextStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContextStore for NullContextStore {
    async fn retrieve(&self, _query: &str, _limit: usize) -> Result<Vec<Snippet>> {
        Ok(Vec::new())
    }
}

/// A fixed-content context store for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticContextStore {
    snippets: Vec<Snippet>,
}

impl StaticContextStore {
    /// Build a store that always returns the given snippets.
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self { snippets }
    }
}

#[async_trait]
impl ContextStore for StaticContextStore {
    async fn retrieve(&self, _query: &str, limit: usize) -> Result<Vec<Snippet>> {
        Ok(self.snippets.iter().take(limit).cloned().collect())
    }
}
