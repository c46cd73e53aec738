//! In-process similarity index using cosine similarity.
//!
//! Collections are fixed at construction time; the drafting service never
//! writes to its index.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{IndexError, Match, MetadataFilter, SimilarityIndex};

/// A stored email with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEmail {
    /// Record identifier.
    pub id: String,
    /// Embedding of the email text.
    pub vector: Vec<f32>,
    /// Email subject.
    pub subject: String,
    /// Email body.
    pub body: String,
    /// Source tag.
    pub source_tag: String,
    /// Whether this is a sent reply.
    pub is_reply: bool,
}

/// Cosine-similarity index over named, immutable collections.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    collections: HashMap<String, Vec<IndexedEmail>>,
}

impl InMemoryIndex {
    /// Create an index with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a collection.
    pub fn with_collection(mut self, name: &str, records: Vec<IndexedEmail>) -> Self {
        self.collections.insert(name.to_owned(), records);
        self
    }

    /// Number of records in a collection, if it exists.
    pub fn len(&self, collection: &str) -> Option<usize> {
        self.collections.get(collection).map(Vec::len)
    }
}

/// Cosine similarity of two vectors; 0.0 when either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<Match>, IndexError> {
        let records = self
            .collections
            .get(collection)
            .ok_or_else(|| IndexError::UnknownCollection(collection.to_owned()))?;

        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector.len()) {
            return Err(IndexError::InvalidQuery(format!(
                "query has {} dimensions, record '{}' has {}",
                vector.len(),
                bad.id,
                bad.vector.len()
            )));
        }

        let mut scored: Vec<Match> = records
            .iter()
            .filter(|r| filter.accepts(r.is_reply))
            .map(|r| Match {
                id: r.id.clone(),
                similarity_score: cosine_similarity(&r.vector, vector),
                subject: r.subject.clone(),
                body: r.body.clone(),
                source_tag: r.source_tag.clone(),
                is_reply: r.is_reply,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}
