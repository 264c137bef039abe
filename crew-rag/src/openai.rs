//! OpenAI-compatible embedding provider.
//!
//! Calls the `/embeddings` endpoint of any OpenAI-compatible API with
//! `reqwest`. Only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// # Configuration
///
/// Constructed explicitly with an API key, or from the environment via
/// [`from_env`](OpenAiEmbedder::from_env):
///
/// - `CREW_EMBED_API_KEY` — required.
/// - `CREW_EMBED_BASE_URL` — optional, defaults to the OpenAI API.
/// - `CREW_EMBED_MODEL` — optional, defaults to `text-embedding-3-small`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create a provider with the given API key and default model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Embedding {
                provider: "openai".into(),
                message: "API key must not be empty".into(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a provider from `CREW_EMBED_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("CREW_EMBED_API_KEY").map_err(|_| RagError::Embedding {
            provider: "openai".into(),
            message: "CREW_EMBED_API_KEY environment variable not set".into(),
        })?;
        let mut embedder = Self::new(api_key)?;
        if let Ok(base_url) = std::env::var("CREW_EMBED_BASE_URL") {
            embedder.base_url = base_url;
        }
        if let Ok(model) = std::env::var("CREW_EMBED_MODEL") {
            embedder.model = model;
        }
        Ok(embedder)
    }

    /// Override the base URL (for OpenAI-compatible deployments).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the reported dimensionality (for non-default models).
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_batch(&[text]).await?;
        if results.is_empty() {
            return Err(RagError::Embedding {
                provider: "openai".into(),
                message: "API returned empty response".into(),
            });
        }
        Ok(results.swap_remove(0))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(batch_size = texts.len(), model = %self.model, "embedding batch");

        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: texts.to_vec() })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "embedding request failed");
                RagError::Embedding {
                    provider: "openai".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "embedding API error");
            return Err(RagError::Embedding {
                provider: "openai".into(),
                message: format!("API returned {status}: {body}"),
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| RagError::Embedding {
            provider: "openai".into(),
            message: format!("failed to parse response: {e}"),
        })?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
