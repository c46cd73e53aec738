//! Embedding generation.
//!
//! The [`Embedder`] trait abstracts over embedding providers. Two HTTP
//! implementations exist: [`openai::OpenAiEmbedder`] (`/v1/embeddings`) and
//! [`ollama::OllamaEmbedder`] (`/api/embed`). [`from_spec`] picks one from a
//! `provider/model` string.
//!
//! The embedder must be the same model that populated the similarity index,
//! otherwise scores are meaningless.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::credentials::{Credentials, OPENAI_API_KEY};
use crate::providers::{parse_provider_string, sanitize_http_error_body};

pub mod ollama;
pub mod openai;

/// Core embedding generation interface.
///
/// All implementations must be `Send + Sync` to allow shared use across
/// async task boundaries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding provider is unreachable or the
    /// request fails.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Returns the dimensionality of the embedding vectors produced.
    fn dimensions(&self) -> usize;
}

/// Errors from embedding generation.
#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    /// HTTP transport failure.
    #[error("embedder request failed: {0}")]
    Request(reqwest::Error),

    /// The call did not finish within its deadline.
    #[error("embedder timed out: {0}")]
    Timeout(String),

    /// Response did not match expected format.
    #[error("embedder response parse error: {0}")]
    Parse(String),

    /// Provider is unavailable or returned an error status.
    #[error("embedder unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for EmbedderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

/// Turn a non-success HTTP response into [`EmbedderError::Unavailable`].
async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, EmbedderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EmbedderError::Unavailable(format!(
        "{provider} returned {status}: {}",
        sanitize_http_error_body(&body)
    )))
}

/// Connection settings for embedders.
#[derive(Debug, Clone)]
pub struct EmbedderSettings {
    /// Expected vector dimensionality.
    pub dimensions: usize,
    /// Override for the provider's default base URL.
    pub base_url: Option<String>,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
}

/// Instantiate an embedder from a `provider/model` spec.
///
/// # Errors
///
/// Returns an error for an unknown provider prefix, a missing API key, or
/// an HTTP client that cannot be built.
pub fn from_spec(
    spec: &str,
    settings: &EmbedderSettings,
    credentials: &Credentials,
) -> anyhow::Result<Arc<dyn Embedder>> {
    let (provider, model) = parse_provider_string(spec)?;
    match provider {
        "openai" => {
            let key = credentials.require(OPENAI_API_KEY)?;
            let mut embedder =
                openai::OpenAiEmbedder::new(model, key, settings.dimensions, settings.timeout)?;
            if let Some(base_url) = &settings.base_url {
                embedder = embedder.with_base_url(base_url);
            }
            Ok(Arc::new(embedder))
        }
        "ollama" => {
            let base_url = settings
                .base_url
                .as_deref()
                .unwrap_or(ollama::DEFAULT_OLLAMA_BASE_URL);
            Ok(Arc::new(ollama::OllamaEmbedder::with_base_url(
                model,
                base_url,
                settings.dimensions,
                settings.timeout,
            )?))
        }
        other => anyhow::bail!("unsupported embedding provider '{other}'"),
    }
}
