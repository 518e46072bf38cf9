//! Knowledge index type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A document the index has learned from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Unique source identifier
    pub id: String,

    /// File path, or a `corpus:<city>` label for built-in descriptions
    pub location: String,

    /// City the document describes, when known
    pub city: Option<String>,

    /// Content type: "markdown", "html", "text"
    pub content_type: String,

    pub learned_at: DateTime<Utc>,

    pub size_bytes: u64,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Metadata: `city`, `source`, `start`, `end`, plus any caller-supplied keys
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl KnowledgeChunk {
    /// City recorded in the chunk metadata.
    pub fn city(&self) -> Option<&str> {
        self.metadata.get("city").and_then(|v| v.as_str())
    }

    /// Source label recorded in the chunk metadata.
    pub fn source_label(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// A chunk with its retrieval score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,

    /// Cosine similarity against the query
    pub vector_score: f32,

    /// Score after re-ranking; equals `vector_score` until re-ranked
    pub score: f32,
}

impl ScoredChunk {
    pub fn new(chunk: KnowledgeChunk, vector_score: f32) -> Self {
        Self {
            chunk,
            vector_score,
            score: vector_score,
        }
    }
}

/// Options for the learn operation.
#[derive(Debug, Clone)]
pub struct LearnOptions {
    /// Files or directories to learn from
    pub paths: Vec<PathBuf>,

    /// Substring patterns a path must contain (any); empty means all
    pub include: Vec<String>,

    /// Substring patterns that exclude a path
    pub exclude: Vec<String>,

    /// City attached to every chunk learned in this run
    pub city: Option<String>,

    /// Extra metadata keys attached to every chunk
    pub extra_metadata: serde_json::Map<String, serde_json::Value>,

    /// Clear the index before learning
    pub reset: bool,
}

impl LearnOptions {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            include: Vec::new(),
            exclude: Vec::new(),
            city: None,
            extra_metadata: serde_json::Map::new(),
            reset: false,
        }
    }
}

/// A file the learn operation could not use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Statistics from a learn operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnStats {
    /// Number of sources processed
    pub sources_count: u32,

    /// Number of chunks created
    pub chunks_count: u32,

    /// Total bytes processed
    pub bytes_processed: u64,

    /// Files that were reported and skipped
    pub skipped: Vec<SkippedFile>,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub sources_count: u32,
    pub chunks_count: u32,

    /// Database size in bytes; zero for in-memory indexes
    pub db_size_bytes: u64,
}

/// Chunk before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Value,
}
