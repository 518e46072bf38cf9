//! RAG response types.

use serde::{Deserialize, Serialize};

/// A single source reference used to answer a query.
///
/// Chunk IDs, scores and embeddings stay internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSourceRef {
    /// City the passage describes, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Document label (e.g., "corpus:chicago", "seattle-notes.md")
    pub source: String,

    /// Human-readable location within the source, e.g. "chars 0-512"
    pub location: String,

    /// Short snippet showing the relevant evidence (truncated if needed)
    pub snippet: String,
}

/// Answer synthesized from retrieved passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,

    pub sources: Vec<RagSourceRef>,

    /// Highest vector similarity among the passages used
    #[serde(skip_serializing, default)]
    pub max_score: f32,

    /// Whether the prompt asked the model to hedge
    #[serde(skip_serializing, default)]
    pub low_confidence: bool,
}

impl RagResponse {
    pub fn new(answer: String, sources: Vec<RagSourceRef>, max_score: f32) -> Self {
        Self {
            answer,
            sources,
            max_score,
            low_confidence: max_score < CONFIDENCE_THRESHOLD,
        }
    }
}

/// Below this vector score the model is told the passages may not answer the question.
pub const CONFIDENCE_THRESHOLD: f32 = 0.30;
