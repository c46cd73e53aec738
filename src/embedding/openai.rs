//! OpenAI embedder using the `/v1/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, Embedder, EmbedderError};

const OPENAI_API_BASE: &str = "https://api.openai.com";

/// Embedder backed by the OpenAI embeddings API.
///
/// The configured dimensionality is sent as the `dimensions` request field,
/// so `text-embedding-3-*` models return vectors sized for the index.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dims: usize,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("dims", &self.dims)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OpenAiEmbedder {
    /// Create an embedder for `model` producing `dims`-sized vectors.
    ///
    /// # Errors
    ///
    /// Returns `EmbedderError::Unavailable` for an empty key and
    /// `EmbedderError::Request` if the HTTP client cannot be built.
    pub fn new(
        model: &str,
        api_key: String,
        dims: usize,
        timeout: Duration,
    ) -> Result<Self, EmbedderError> {
        if api_key.trim().is_empty() {
            return Err(EmbedderError::Unavailable(
                "OpenAI API key must not be empty".to_owned(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key,
            model: model.to_owned(),
            base_url: OPENAI_API_BASE.to_owned(),
            dims,
        })
    }

    /// Point the embedder at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        debug!(model = %self.model, text_len = text.len(), "embedding text");

        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
            dimensions: Some(self.dims),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status("openai", response).await?;

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::Parse(e.to_string()))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedderError::Parse("empty data array".to_owned()))?;

        if vector.len() != self.dims {
            return Err(EmbedderError::Parse(format!(
                "expected {} dimensions, got {}",
                self.dims,
                vector.len()
            )));
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

// ── Wire types ──────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
