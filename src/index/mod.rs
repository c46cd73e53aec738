//! Nearest-neighbour search over per-persona email collections.
//!
//! The [`SimilarityIndex`] trait is the seam between the drafting pipeline
//! and the vector database. [`pinecone::PineconeIndex`] talks to Pinecone's
//! REST data plane; [`memory::InMemoryIndex`] is a cosine-similarity index
//! held in process, used for tests and local runs.

use async_trait::async_trait;
use serde::Serialize;

pub mod memory;
pub mod pinecone;

/// One stored email returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Record identifier in the index.
    pub id: String,
    /// Closeness to the query vector; higher is closer.
    pub similarity_score: f32,
    /// Subject of the stored email.
    pub subject: String,
    /// Body of the stored email.
    pub body: String,
    /// Where the email came from (mailbox, export file, ...).
    pub source_tag: String,
    /// Whether the stored email is a reply that was actually sent.
    pub is_reply: bool,
}

/// Equality filter applied to record metadata before ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    /// Required value of the `is_reply` tag, if any.
    pub is_reply: Option<bool>,
}

impl MetadataFilter {
    /// Filter that keeps only sent replies.
    pub fn replies_only() -> Self {
        Self {
            is_reply: Some(true),
        }
    }

    /// Whether a record with the given tag passes this filter.
    pub fn accepts(&self, is_reply: bool) -> bool {
        match self.is_reply {
            Some(want) => want == is_reply,
            None => true,
        }
    }
}

/// Errors from similarity index queries.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// HTTP transport failure.
    #[error("index request failed: {0}")]
    Request(reqwest::Error),
    /// The query did not finish within its deadline.
    #[error("index query timed out: {0}")]
    Timeout(String),
    /// The index responded with an error status.
    #[error("index returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitised response body.
        body: String,
    },
    /// Response did not match the expected format.
    #[error("index response parse error: {0}")]
    Parse(String),
    /// No collection with this name is known to the index.
    #[error("unknown index collection '{0}'")]
    UnknownCollection(String),
    /// The query vector does not fit the collection.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

/// Nearest-neighbour search over named collections.
///
/// Implementations must return matches in descending `similarity_score`
/// order and honour `filter` server-side where the backend supports it.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Return up to `top_k` records of `collection` closest to `vector`.
    ///
    /// An empty collection yields an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the backend is unreachable, rejects the
    /// query, or the collection does not exist.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<Match>, IndexError>;
}
