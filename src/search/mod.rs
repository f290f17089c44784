#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use tracing::debug;

use crate::EmbedixError;
use crate::embeddings::Embedder;
use crate::store::{SearchHit, VectorStore};

/// Embeds a query with the same model that embedded the corpus, then ranks
/// stored chunks by cosine similarity against it.
pub struct SearchService<'a> {
    embedder: &'a dyn Embedder,
    store: &'a VectorStore,
}

impl<'a> SearchService<'a> {
    #[inline]
    pub fn new(embedder: &'a dyn Embedder, store: &'a VectorStore) -> Self {
        Self { embedder, store }
    }

    /// Returns up to `top_k` hits, best match first.
    #[inline]
    pub async fn search(&self, query_text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let embeddings = self
            .embedder
            .encode(&[query_text.to_string()])
            .context("Failed to embed search query")?;
        let query = embeddings.into_iter().next().ok_or_else(|| {
            EmbedixError::Embedding("Model returned no vector for the query".to_string())
        })?;

        debug!("Searching for the top {top_k} matches");
        self.store.search(&query, top_k).await
    }
}
