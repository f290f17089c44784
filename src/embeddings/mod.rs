// Embeddings module
// This module handles the embedding trait and Ollama integration

pub mod ollama;

pub use ollama::OllamaEmbedder;

use anyhow::Result;

/// A batch text-embedding engine bound to one model and one output dimension.
///
/// Implementations return exactly one vector per input, aligned with input
/// order, every vector `dimension()` long, deterministic for a fixed model
/// identifier.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model.
    fn model(&self) -> &str;

    /// Length of every vector produced by `encode`.
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts in one call, preserving order.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
