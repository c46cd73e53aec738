//! Bounded retry with exponential backoff around any [`LlmProvider`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use super::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError};

/// Retry limits for generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Provider wrapper that retries transient failures.
///
/// Only errors for which [`ProviderError::is_retryable`] holds are retried.
/// Each delay doubles up to `max_backoff_ms`, plus up to 50% random jitter
/// (still capped).
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RetryingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingProvider")
            .field("model", &self.inner.model_id())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RetryingProvider {
    /// Wrap `inner` with the given policy.
    pub fn new(inner: Arc<dyn LlmProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

fn jittered(backoff_ms: u64, cap_ms: u64) -> Duration {
    let spread = backoff_ms.saturating_div(2);
    let jitter = if spread == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=spread)
    };
    Duration::from_millis(backoff_ms.saturating_add(jitter).min(cap_ms))
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut backoff_ms = self.policy.initial_backoff_ms;
        let mut attempt: u32 = 1;

        loop {
            match self.inner.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = jittered(backoff_ms, self.policy.max_backoff_ms);
                    warn!(
                        model = %self.inner.model_id(),
                        attempt,
                        max_attempts = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    backoff_ms = backoff_ms
                        .saturating_mul(2)
                        .min(self.policy.max_backoff_ms);
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
