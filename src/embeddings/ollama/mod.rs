
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OllamaConfig;
use crate::embeddings::Embedder;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

const DIMENSION_PROBE_TEXT: &str = "embedding dimension probe";

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: Url,
    model: String,
    dimension: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    model: String,
    #[serde(rename = "input")]
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaEmbedder {
    /// Build a client from config without touching the network.
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            dimension: config.embedding_dimension as usize,
            agent: ureq::Agent::new_with_defaults(),
        })
    }

    /// Connect to the configured Ollama server and bind the embedding model.
    ///
    /// Verifies that the server is reachable and has the model installed,
    /// then probes that produced vectors have the configured length. Any of
    /// these failing is fatal: the pipeline cannot run without a working
    /// engine.
    #[inline]
    pub fn connect(config: &OllamaConfig) -> Result<Self> {
        let embedder = Self::new(config)?;

        let models = embedder
            .fetch_models()
            .context("Ollama server is not reachable")?;
        embedder.ensure_model_available(&models)?;
        embedder
            .verify_dimension()
            .context("Embedding dimension check failed")?;

        info!(
            "Connected to Ollama at {} with model {} ({} dimensions)",
            embedder.base_url, embedder.model, embedder.dimension
        );

        Ok(embedder)
    }

    /// One GET against `/api/tags` doubles as the reachability check and
    /// the model inventory.
    fn fetch_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        debug!("Listing models at {}", url);

        let body = self
            .agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Model listing request failed")?;

        let listing: ModelsResponse =
            serde_json::from_str(&body).context("Failed to parse model listing")?;

        debug!("Server reports {} installed models", listing.models.len());
        Ok(listing.models)
    }

    fn ensure_model_available(&self, models: &[ModelInfo]) -> Result<()> {
        if models.iter().any(|m| m.name == self.model) {
            debug!("Model {} is installed", self.model);
            return Ok(());
        }

        let installed: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        warn!("Model {} missing, server has {:?}", self.model, installed);
        bail!(
            "Model '{}' is not available. Available models: {:?}",
            self.model,
            installed
        )
    }

    /// Embed one probe string and check the model's actual output length
    /// against the configured dimension.
    fn verify_dimension(&self) -> Result<()> {
        self.embed_batch(&[DIMENSION_PROBE_TEXT.to_string()])?;
        debug!(
            "Model {} produces {}-dimension vectors as configured",
            self.model, self.dimension
        );
        Ok(())
    }

    /// Embed a batch of texts with a single `/api/embed` call.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        debug!("Embedding {} texts via {}", texts.len(), url);

        let payload = serde_json::to_string(&BatchEmbedRequest {
            model: self.model.clone(),
            inputs: texts.to_vec(),
        })
        .context("Failed to serialize embedding request")?;

        let body = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&payload)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Embedding request failed")?;

        let response: BatchEmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;

        if response.embeddings.len() != texts.len() {
            bail!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            );
        }

        if let Some(bad) = response
            .embeddings
            .iter()
            .find(|embedding| embedding.len() != self.dimension)
        {
            bail!(
                "Model returned a {}-dimension vector, expected {}",
                bad.len(),
                self.dimension
            );
        }

        Ok(response.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    #[inline]
    fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        self.embed_batch(texts)
            .with_context(|| format!("Failed to embed batch of {} texts", texts.len()))
    }
}
