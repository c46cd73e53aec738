//! Retrieval-augmented reply drafting.
//!
//! A draft flows through five stages, each in its own module:
//!
//! 1. [`ranker`]: embed the framed message, query the persona's collection,
//!    keep confident replies only.
//! 2. [`context`]: render the best exemplars into a bounded text block.
//! 3. [`prompt`]: combine persona instructions, message and exemplars.
//! 4. generation via [`crate::providers::LlmProvider`].
//! 5. [`formatter`]: reply subject and the final [`Draft`].
//!
//! [`confidence`] scores the draft from the ranked matches. [`pipeline`]
//! wires the stages together with per-stage deadlines.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::embedding::EmbedderError;
use crate::index::IndexError;
use crate::providers::ProviderError;

pub mod confidence;
pub mod context;
pub mod formatter;
pub mod pipeline;
pub mod prompt;
pub mod ranker;

pub use pipeline::{DraftSettings, Drafter};
pub use ranker::RankedExemplars;

/// An email awaiting a reply. Missing fields default to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingMessage {
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// Sender address (`from` on the wire).
    #[serde(rename = "from")]
    pub sender: String,
}

impl IncomingMessage {
    /// Reject a message with nothing to reply to.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::Validation`] when subject and body are both blank.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.subject.trim().is_empty() && self.body.trim().is_empty() {
            return Err(DraftError::Validation(
                "message must have a subject or a body".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A finished draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    /// Persona id the draft was written in.
    pub style: String,
    /// Reply subject line.
    pub draft_subject: String,
    /// Generated reply body.
    pub draft_body: String,
    /// Mean exemplar similarity in `[0, 1]`, two decimals.
    pub confidence_score: f64,
    /// Exemplars actually placed in the prompt.
    pub similar_examples_used: usize,
}

/// Terminal outcome of one drafting operation.
///
/// Serialises as `{"success": true, ...draft}` or
/// `{"success": false, "error": "..."}`; a failure never carries draft fields.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftResult {
    /// The draft was produced.
    Success(Draft),
    /// The draft failed; `error` is safe to show to callers.
    Failure {
        /// Sanitised error message.
        error: String,
    },
}

impl DraftResult {
    /// Whether this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<Draft, DraftError>> for DraftResult {
    fn from(outcome: Result<Draft, DraftError>) -> Self {
        match outcome {
            Ok(draft) => Self::Success(draft),
            Err(e) => Self::Failure {
                error: e.public_message(),
            },
        }
    }
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    success: bool,
    #[serde(flatten)]
    draft: &'a Draft,
}

#[derive(Serialize)]
struct FailureBody<'a> {
    success: bool,
    error: &'a str,
}

impl Serialize for DraftResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(draft) => SuccessBody {
                success: true,
                draft,
            }
            .serialize(serializer),
            Self::Failure { error } => FailureBody {
                success: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

/// Pipeline stage with a network hop, used to label timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Embedding the incoming message.
    Embedding,
    /// Querying the similarity index.
    Retrieval,
    /// Calling the generative model.
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Embedding => "embedding",
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
        })
    }
}

/// Why a draft could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// The request itself is unusable.
    #[error("invalid request: {0}")]
    Validation(String),
    /// No persona with this id.
    #[error("unknown persona '{0}'")]
    UnknownPersona(String),
    /// The embedder failed.
    #[error("embedding failed: {0}")]
    Embedding(#[source] EmbedderError),
    /// The similarity index failed.
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] IndexError),
    /// The generative model failed.
    #[error("generation failed: {0}")]
    Provider(#[source] ProviderError),
    /// A network stage exceeded its deadline.
    #[error("{stage} timed out")]
    Timeout {
        /// Stage that timed out.
        stage: Stage,
    },
}

impl From<EmbedderError> for DraftError {
    fn from(err: EmbedderError) -> Self {
        match err {
            EmbedderError::Timeout(_) => Self::Timeout {
                stage: Stage::Embedding,
            },
            other => Self::Embedding(other),
        }
    }
}

impl From<IndexError> for DraftError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Timeout(_) => Self::Timeout {
                stage: Stage::Retrieval,
            },
            other => Self::Retrieval(other),
        }
    }
}

impl From<ProviderError> for DraftError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout(_) => Self::Timeout {
                stage: Stage::Generation,
            },
            other => Self::Provider(other),
        }
    }
}

impl DraftError {
    /// Short machine-readable kind for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownPersona(_) => "unknown_persona",
            Self::Embedding(_) => "embedding",
            Self::Retrieval(_) => "retrieval",
            Self::Provider(_) => "provider",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// HTTP status for this failure.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::UnknownPersona(_) => 404,
            Self::Embedding(_) | Self::Retrieval(_) => 503,
            Self::Provider(_) => 502,
            Self::Timeout { .. } => 504,
        }
    }

    /// Caller-facing message; never includes upstream response text.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("invalid request: {msg}"),
            Self::UnknownPersona(_) => "unknown persona".to_owned(),
            Self::Embedding(_) => "embedding service unavailable".to_owned(),
            Self::Retrieval(_) => "similarity index unavailable".to_owned(),
            Self::Provider(ProviderError::RateLimited { .. }) => {
                "generation provider is rate limited, retry later".to_owned()
            }
            Self::Provider(_) => "generation provider failed".to_owned(),
            Self::Timeout { stage } => format!("{stage} timed out"),
        }
    }
}
