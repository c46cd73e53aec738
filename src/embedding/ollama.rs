//! Ollama embedder using the `/api/embed` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, Embedder, EmbedderError};

/// Default base URL for the Ollama API.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";

/// Ollama-based embedder using the `/api/embed` endpoint.
///
/// Calls `POST {base_url}/api/embed` with the model name and input text,
/// returning the embedding vector.
pub struct OllamaEmbedder {
    model: String,
    client: reqwest::Client,
    base_url: String,
    dims: usize,
}

impl std::fmt::Debug for OllamaEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaEmbedder")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("dims", &self.dims)
            .finish()
    }
}

impl OllamaEmbedder {
    /// Create an Ollama embedder against the default local server.
    ///
    /// # Errors
    ///
    /// Returns `EmbedderError::Request` if the HTTP client cannot be built.
    pub fn new(model: &str, dims: usize, timeout: Duration) -> Result<Self, EmbedderError> {
        Self::with_base_url(model, DEFAULT_OLLAMA_BASE_URL, dims, timeout)
    }

    /// Create an Ollama embedder with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns `EmbedderError::Request` if the HTTP client cannot be built.
    pub fn with_base_url(
        model: &str,
        base_url: &str,
        dims: usize,
        timeout: Duration,
    ) -> Result<Self, EmbedderError> {
        Ok(Self {
            model: model.to_owned(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            dims,
        })
    }

    /// Build the request body for the embed endpoint.
    fn build_request(&self, text: &str) -> OllamaEmbedRequest {
        OllamaEmbedRequest {
            model: self.model.clone(),
            input: text.to_owned(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = self.build_request(text);

        let response = self.client.post(&url).json(&body).send().await?;
        let response = check_status("ollama", response).await?;

        let parsed: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::Parse(e.to_string()))?;

        parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedderError::Parse("empty embeddings array".to_owned()))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request body for Ollama `/api/embed`.
#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: String,
}

/// Response body from Ollama `/api/embed`.
#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    /// One embedding per input.
    embeddings: Vec<Vec<f32>>,
}
