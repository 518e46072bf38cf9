//! Re-ranking of retrieved chunks.

use crate::embeddings::providers::mock::STOP_WORDS;
use crate::types::ScoredChunk;
use std::collections::HashSet;

/// Re-scores retrieval candidates against the query.
pub trait Reranker: Send + Sync {
    fn name(&self) -> &str;

    /// Re-score `candidates`, sort best first and keep at most `top_n`.
    fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>, top_n: usize) -> Vec<ScoredChunk>;
}

/// Blends the vector score with the share of query terms found in the chunk.
#[derive(Debug, Clone, Copy)]
pub struct LexicalReranker {
    vector_weight: f32,
    lexical_weight: f32,
}

impl Default for LexicalReranker {
    fn default() -> Self {
        Self {
            vector_weight: 0.6,
            lexical_weight: 0.4,
        }
    }
}

impl LexicalReranker {
    pub fn new(vector_weight: f32, lexical_weight: f32) -> Self {
        Self {
            vector_weight,
            lexical_weight,
        }
    }
}

impl Reranker for LexicalReranker {
    fn name(&self) -> &str {
        "lexical"
    }

    fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>, top_n: usize) -> Vec<ScoredChunk> {
        let query_terms = terms(query);

        let mut scored: Vec<ScoredChunk> = candidates
            .into_iter()
            .map(|mut candidate| {
                let overlap = lexical_overlap(&query_terms, &terms(&candidate.chunk.text));
                candidate.score =
                    self.vector_weight * candidate.vector_score + self.lexical_weight * overlap;
                candidate
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_n);

        tracing::debug!(
            "Re-ranked to {} chunks: {:?}",
            scored.len(),
            scored.iter().map(|c| c.score).collect::<Vec<_>>()
        );

        scored
    }
}

/// Lowercased content words of `text`.
pub fn terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Fraction of query terms present in the chunk terms, in `[0, 1]`.
fn lexical_overlap(query_terms: &HashSet<String>, chunk_terms: &HashSet<String>) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    query_terms.intersection(chunk_terms).count() as f32 / query_terms.len() as f32
}
