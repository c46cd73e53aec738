//! End-to-end drafting: embed, retrieve, rank, prompt, generate, package.
//!
//! [`Drafter`] holds shared, read-only handles to the embedder, similarity
//! index, provider and persona table, so one instance serves any number of
//! concurrent requests. Each network stage runs under its own deadline.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::context::ContextAssembler;
use super::ranker::{build_query_text, RetrievalRanker};
use super::{
    confidence, formatter, prompt, Draft, DraftError, DraftResult, IncomingMessage, Stage,
};
use crate::embedding::Embedder;
use crate::index::SimilarityIndex;
use crate::persona::PersonaRegistry;
use crate::providers::{LlmProvider, ProviderError, StopReason, UsageStats};

/// Retrieval sizes and per-stage deadlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DraftSettings {
    /// Candidates requested from the index.
    pub top_k: usize,
    /// Exclusive similarity threshold.
    pub min_score: f32,
    /// Exemplars placed in the prompt.
    pub max_examples: usize,
    /// Body characters kept per exemplar.
    pub excerpt_chars: usize,
    /// Deadline for embedding the message.
    pub embed_timeout: Duration,
    /// Deadline for the index query.
    pub query_timeout: Duration,
    /// Deadline for generation, retries included.
    pub generation_timeout: Duration,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self {
            top_k: super::ranker::DEFAULT_TOP_K,
            min_score: super::ranker::DEFAULT_MIN_SCORE,
            max_examples: super::context::DEFAULT_MAX_EXAMPLES,
            excerpt_chars: super::context::DEFAULT_EXCERPT_CHARS,
            embed_timeout: Duration::from_secs(10),
            query_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(120),
        }
    }
}

/// Drafts replies in a persona's voice.
pub struct Drafter {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    provider: Arc<dyn LlmProvider>,
    personas: Arc<PersonaRegistry>,
    ranker: RetrievalRanker,
    assembler: ContextAssembler,
    settings: DraftSettings,
}

impl std::fmt::Debug for Drafter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drafter")
            .field("model", &self.provider.model_id())
            .field("personas", &self.personas.ids())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Generation bookkeeping carried out of the stages for the summary event.
struct Completion {
    usage: UsageStats,
    stop_reason: StopReason,
}

async fn within<T, E>(
    stage: Stage,
    deadline: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, DraftError>
where
    DraftError: From<E>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(DraftError::from),
        Err(_) => Err(DraftError::Timeout { stage }),
    }
}

impl Drafter {
    /// Wire a drafter from its collaborators.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
        provider: Arc<dyn LlmProvider>,
        personas: PersonaRegistry,
        settings: DraftSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            provider,
            personas: Arc::new(personas),
            ranker: RetrievalRanker::new(settings.top_k, settings.min_score),
            assembler: ContextAssembler::new(settings.max_examples, settings.excerpt_chars),
            settings,
        }
    }

    /// The persona table.
    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    /// Active settings.
    pub fn settings(&self) -> &DraftSettings {
        &self.settings
    }

    /// Draft a reply to `message` as `persona_id`.
    ///
    /// Each call is independent. Nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] for an empty message, an unknown persona, or a
    /// failed or timed-out embedding, retrieval or generation stage.
    pub async fn draft(
        &self,
        persona_id: &str,
        message: &IncomingMessage,
    ) -> Result<Draft, DraftError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("draft", %request_id, persona = persona_id);
        self.run(persona_id, message).instrument(span).await
    }

    /// [`Self::draft`] folded into the wire result.
    pub async fn draft_result(&self, persona_id: &str, message: &IncomingMessage) -> DraftResult {
        DraftResult::from(self.draft(persona_id, message).await)
    }

    async fn run(&self, persona_id: &str, message: &IncomingMessage) -> Result<Draft, DraftError> {
        let started = Instant::now();
        let result = self.stages(persona_id, message).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok((draft, completion)) => {
                info!(
                    elapsed_ms,
                    confidence = draft.confidence_score,
                    examples_used = draft.similar_examples_used,
                    input_tokens = completion.usage.input_tokens,
                    output_tokens = completion.usage.output_tokens,
                    stop_reason = ?completion.stop_reason,
                    "draft complete"
                );
                Ok(draft)
            }
            Err(e) => {
                warn!(elapsed_ms, kind = e.kind(), error = %e, "draft failed");
                Err(e)
            }
        }
    }

    async fn stages(
        &self,
        persona_id: &str,
        message: &IncomingMessage,
    ) -> Result<(Draft, Completion), DraftError> {
        message.validate()?;
        let persona = self
            .personas
            .get(persona_id)
            .map_err(|_| DraftError::UnknownPersona(persona_id.to_owned()))?;

        let query_text = build_query_text(message);

        let vector = within(
            Stage::Embedding,
            self.settings.embed_timeout,
            self.embedder.embed(&query_text),
        )
        .await?;
        debug!(dimensions = vector.len(), "message embedded");

        let ranked = within(
            Stage::Retrieval,
            self.settings.query_timeout,
            self.ranker
                .retrieve(self.index.as_ref(), &persona.collection, &vector),
        )
        .await?;

        let confidence_score = confidence::estimate(&ranked);
        let exemplars = self.assembler.assemble(&ranked);
        let request = prompt::build_request(persona, &query_text, &exemplars);
        debug!(
            ranked = ranked.len(),
            used = exemplars.used,
            model = self.provider.model_id(),
            "prompt assembled"
        );

        let response = within(
            Stage::Generation,
            self.settings.generation_timeout,
            self.provider.complete(request),
        )
        .await?;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(DraftError::from(ProviderError::Parse(
                "model returned an empty completion".to_owned(),
            )));
        }
        if response.stop_reason == StopReason::MaxTokens {
            warn!(
                max_output_tokens = persona.max_output_tokens,
                output_tokens = response.usage.output_tokens,
                "completion hit the token limit, draft may be truncated"
            );
        }

        let draft = formatter::package(
            &persona.id,
            &message.subject,
            text,
            confidence_score,
            exemplars.used,
        );
        let completion = Completion {
            usage: response.usage,
            stop_reason: response.stop_reason,
        };
        Ok((draft, completion))
    }
}
