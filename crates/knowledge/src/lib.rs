//! Semantic retrieval backend for cityq.
//!
//! Local-first RAG: city descriptions and learned documents are chunked,
//! embedded and stored in SQLite; questions are answered by retrieving the
//! closest passages, re-ranking them and asking the language model.

pub mod chunker;
pub mod corpus;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod rag;
pub mod rerank;
pub mod semantic;
pub mod types;


pub use corpus::{CorpusDocument, CITY_DESCRIPTIONS};
pub use index::EmbeddingSignature;
pub use embeddings::{create_provider, EmbeddingProvider, EmbeddingSettings};
pub use rag::{RagResponse, RagSourceRef, CONFIDENCE_THRESHOLD};
pub use rerank::{LexicalReranker, Reranker};
pub use semantic::{IndexSettings, SemanticIndex};
pub use types::{
    IndexStats, KnowledgeChunk, KnowledgeSource, LearnOptions, LearnStats, ScoredChunk,
    SkippedFile,
};
