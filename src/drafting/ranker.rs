//! Retrieval and ranking of past replies.

use tracing::{debug, warn};

use super::IncomingMessage;
use crate::index::{IndexError, Match, MetadataFilter, SimilarityIndex};

/// Candidates requested from the index.
pub const DEFAULT_TOP_K: usize = 5;

/// Matches at or below this score are discarded.
pub const DEFAULT_MIN_SCORE: f32 = 0.6;

/// Frame an incoming message as the text that is embedded and prompted.
///
/// Embedding and generation see the same framing.
pub fn build_query_text(message: &IncomingMessage) -> String {
    format!(
        "Subject: {}\n\nFrom: {}\n\nBody: {}",
        message.subject, message.sender, message.body
    )
}

/// Confident past replies, best first.
///
/// Every member is a reply scoring above the ranker's threshold, the
/// sequence is non-increasing by score, and its length is at most `top_k`.
/// Only [`RetrievalRanker::rank`] constructs one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedExemplars(Vec<Match>);

impl RankedExemplars {
    /// The matches, best first.
    pub fn as_slice(&self) -> &[Match] {
        &self.0
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing cleared the threshold.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the matches out.
    pub fn into_inner(self) -> Vec<Match> {
        self.0
    }
}

/// Queries a persona's collection and keeps confident replies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalRanker {
    top_k: usize,
    min_score: f32,
}

impl Default for RetrievalRanker {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K, DEFAULT_MIN_SCORE)
    }
}

impl RetrievalRanker {
    /// Ranker requesting `top_k` candidates and keeping scores above `min_score`.
    pub fn new(top_k: usize, min_score: f32) -> Self {
        Self { top_k, min_score }
    }

    /// Candidates requested per query.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Exclusive score threshold.
    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Query `collection` with `vector` and rank the result.
    ///
    /// An empty collection or no match above the threshold gives an empty
    /// set, which is not an error.
    ///
    /// # Errors
    ///
    /// Propagates [`IndexError`] from the index.
    pub async fn retrieve(
        &self,
        index: &dyn SimilarityIndex,
        collection: &str,
        vector: &[f32],
    ) -> Result<RankedExemplars, IndexError> {
        let candidates = index
            .query(collection, vector, self.top_k, &MetadataFilter::replies_only())
            .await?;
        let returned = candidates.len();
        let ranked = self.rank(candidates);
        debug!(
            collection,
            returned,
            kept = ranked.len(),
            min_score = self.min_score,
            "ranked index matches"
        );
        Ok(ranked)
    }

    /// Filter, order and cap raw index matches.
    pub fn rank(&self, candidates: Vec<Match>) -> RankedExemplars {
        let mut kept: Vec<Match> = candidates
            .into_iter()
            .filter(|m| m.is_reply && m.similarity_score > self.min_score)
            .collect();

        let ordered = kept
            .windows(2)
            .all(|pair| pair[0].similarity_score >= pair[1].similarity_score);
        if !ordered {
            warn!("index returned matches out of score order, re-sorting");
            kept.sort_by(|a, b| {
                b.similarity_score
                    .partial_cmp(&a.similarity_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        kept.truncate(self.top_k);
        RankedExemplars(kept)
    }
}
