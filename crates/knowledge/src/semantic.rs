//! The semantic index: built-in city corpus plus learned documents.

use crate::chunker::chunk_text;
use crate::corpus::{CorpusDocument, CITY_DESCRIPTIONS};
use crate::embeddings::EmbeddingProvider;
use crate::index::{self, EmbeddingSignature};
use crate::parser::{parse_file, ContentType};
use crate::rerank::{LexicalReranker, Reranker};
use crate::types::{
    IndexStats, KnowledgeChunk, KnowledgeSource, LearnOptions, LearnStats, ScoredChunk,
    SkippedFile,
};
use chrono::Utc;
use cityq_core::config::IndexConfig;
use cityq_core::{AppError, AppResult};
use cityq_llm::LlmClient;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use walkdir::WalkDir;

/// Retrieval and chunking knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexSettings {
    pub top_k: usize,
    pub rerank_top_n: usize,
    pub min_score: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self::from_config(&IndexConfig::default())
    }
}

impl IndexSettings {
    pub fn from_config(config: &IndexConfig) -> Self {
        Self {
            top_k: config.top_k,
            rerank_top_n: config.rerank_top_n,
            min_score: config.min_score,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// Vector index over city documents, answering questions with an LLM.
pub struct SemanticIndex {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) client: Arc<dyn LlmClient>,
    pub(crate) model: String,
    pub(crate) settings: IndexSettings,
    reranker: Box<dyn Reranker>,
    pub(crate) prompts_dir: Option<PathBuf>,
}

impl SemanticIndex {
    /// Open the index at `path`, or an in-memory index for `None`.
    pub fn open(
        path: Option<&Path>,
        embedder: Arc<dyn EmbeddingProvider>,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        let conn = index::init_index(path)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.map(Path::to_path_buf),
            embedder,
            client,
            model: model.into(),
            settings: IndexSettings::default(),
            reranker: Box::new(LexicalReranker::default()),
            prompts_dir: None,
        })
    }

    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_reranker(mut self, reranker: Box<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Use workspace prompt overrides from `dir`.
    pub fn with_prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = Some(dir.into());
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Signature of the configured embedder.
    pub fn signature(&self) -> EmbeddingSignature {
        EmbeddingSignature {
            provider: self.embedder.provider_name().to_string(),
            model: self.embedder.model_name().to_string(),
            dimensions: self.embedder.dimensions(),
        }
    }

    /// Fail if the stored chunks were embedded by a different embedder.
    ///
    /// An index without chunks takes on the configured signature.
    fn check_embedder(&self, conn: &Connection) -> AppResult<()> {
        let current = self.signature();

        match index::read_signature(conn)? {
            Some(stored) if stored == current => Ok(()),
            Some(stored) if index::get_stats(conn)?.1 > 0 => Err(AppError::Semantic(format!(
                "Index was built with {} embeddings but {} is configured; \
                 rebuild it with `cityq index --reset`",
                stored, current
            ))),
            _ => index::write_signature(conn, &current),
        }
    }

    /// Index the six built-in city descriptions.
    ///
    /// Descriptions already present are left alone, so the call is
    /// idempotent. Returns the number of descriptions newly indexed.
    pub async fn seed_corpus(&self) -> AppResult<usize> {
        self.check_embedder(&self.lock())?;
        let mut added = 0;

        for doc in CITY_DESCRIPTIONS.iter() {
            let source_id = doc.source_id();
            if index::source_exists(&self.lock(), &source_id)? {
                tracing::debug!("Corpus document {} already indexed", source_id);
                continue;
            }

            let chunks = self.index_corpus_document(doc, &source_id).await?;
            tracing::debug!("Indexed {} ({} chunks)", source_id, chunks);
            added += 1;
        }

        if added > 0 {
            tracing::info!("Seeded {} city descriptions into the semantic index", added);
        }
        Ok(added)
    }

    async fn index_corpus_document(&self, doc: &CorpusDocument, source_id: &str) -> AppResult<u32> {
        let source = KnowledgeSource {
            id: source_id.to_string(),
            location: source_id.to_string(),
            city: Some(doc.city.to_string()),
            content_type: ContentType::PlainText.as_str().to_string(),
            learned_at: Utc::now(),
            size_bytes: doc.text.len() as u64,
        };
        let metadata = serde_json::json!({
            "city": doc.city,
            "source": source_id,
        });

        self.index_text(source, doc.text, &metadata).await
    }

    /// Learn from files and directories.
    ///
    /// Files that cannot be read or parsed are reported in
    /// [`LearnStats::skipped`] and do not stop the run.
    pub async fn learn(&self, options: LearnOptions) -> AppResult<LearnStats> {
        let start = Instant::now();

        if options.reset {
            self.reset()?;
        }

        let mut stats = LearnStats::default();

        for root in &options.paths {
            if !root.exists() {
                tracing::warn!("Skipping {:?}: path does not exist", root);
                stats.skipped.push(SkippedFile {
                    path: root.clone(),
                    reason: "path does not exist".to_string(),
                });
                continue;
            }

            for entry in WalkDir::new(root).follow_links(false) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                        tracing::warn!("Skipping {:?}: {}", path, e);
                        stats.skipped.push(SkippedFile {
                            path,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

                let path = entry.path();
                if !entry.file_type().is_file() || !should_include(path, &options) {
                    continue;
                }

                match self.learn_file(path, &options).await {
                    Ok((chunks, bytes)) => {
                        stats.sources_count += 1;
                        stats.chunks_count += chunks;
                        stats.bytes_processed += bytes;
                    }
                    Err(e @ AppError::InvalidInput(_)) | Err(e @ AppError::Io(_)) => {
                        tracing::warn!("Skipping {:?}: {}", path, e);
                        stats.skipped.push(SkippedFile {
                            path: path.to_path_buf(),
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        stats.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            "Learned {} sources, {} chunks, {} bytes in {:.2}s ({} skipped)",
            stats.sources_count,
            stats.chunks_count,
            stats.bytes_processed,
            stats.duration_secs,
            stats.skipped.len()
        );

        Ok(stats)
    }

    async fn learn_file(&self, path: &Path, options: &LearnOptions) -> AppResult<(u32, u64)> {
        let text = parse_file(path)?;
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput("file has no text".to_string()));
        }

        let location = path.to_string_lossy().to_string();
        let source_id = format!("file:{}", location);
        let city = options.city.clone().or_else(|| infer_city(path));
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| location.clone());

        let mut metadata = serde_json::Map::new();
        metadata.insert("source".to_string(), serde_json::json!(label));
        if let Some(city) = &city {
            metadata.insert("city".to_string(), serde_json::json!(city));
        }
        for (key, value) in &options.extra_metadata {
            metadata.insert(key.clone(), value.clone());
        }

        let source = KnowledgeSource {
            id: source_id,
            location,
            city,
            content_type: ContentType::from_path(path).as_str().to_string(),
            learned_at: Utc::now(),
            size_bytes: text.len() as u64,
        };

        let size = source.size_bytes;
        let chunks = self
            .index_text(source, &text, &serde_json::Value::Object(metadata))
            .await?;
        tracing::debug!("Learned {:?}: {} chunks", path, chunks);

        Ok((chunks, size))
    }

    /// Chunk, embed and store one document, replacing any earlier copy.
    async fn index_text(
        &self,
        source: KnowledgeSource,
        text: &str,
        metadata: &serde_json::Value,
    ) -> AppResult<u32> {
        self.check_embedder(&self.lock())?;

        let candidates = chunk_text(
            &source.id,
            text,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
            metadata,
        );

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != candidates.len() {
            return Err(AppError::Semantic(format!(
                "Embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                candidates.len()
            )));
        }

        let mut conn = self.lock();
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Semantic(format!("Failed to start transaction: {}", e)))?;

        index::delete_source(&tx, &source.id)?;
        index::insert_source(&tx, &source)?;

        let mut count = 0u32;
        for (candidate, embedding) in candidates.into_iter().zip(embeddings) {
            let chunk = KnowledgeChunk {
                id: format!("{}#{}", candidate.source_id, candidate.position),
                source_id: candidate.source_id,
                position: candidate.position,
                text: candidate.text,
                embedding: Some(embedding),
                metadata: candidate.metadata,
            };
            index::insert_chunk(&tx, &chunk)?;
            count += 1;
        }

        tx.commit()
            .map_err(|e| AppError::Semantic(format!("Failed to commit chunks: {}", e)))?;

        Ok(count)
    }

    /// Embed `question`, pull the nearest chunks, drop weak matches and re-rank.
    ///
    /// Returns an empty list when nothing clears the minimum score.
    pub async fn retrieve(&self, question: &str) -> AppResult<Vec<ScoredChunk>> {
        self.check_embedder(&self.lock())?;
        let query_embedding = self.embedder.embed(question).await?;

        let candidates = index::query_chunks(&self.lock(), &query_embedding, self.settings.top_k)?;

        tracing::debug!(
            "Vector scores before filtering: {:?}",
            candidates.iter().map(|c| c.vector_score).collect::<Vec<_>>()
        );

        let relevant: Vec<ScoredChunk> = candidates
            .into_iter()
            .filter(|c| c.vector_score >= self.settings.min_score)
            .collect();

        if relevant.is_empty() {
            tracing::info!(
                "No chunks at or above the {:.2} relevance threshold",
                self.settings.min_score
            );
            return Ok(relevant);
        }

        Ok(self
            .reranker
            .rerank(question, relevant, self.settings.rerank_top_n))
    }

    pub fn stats(&self) -> AppResult<IndexStats> {
        let (sources_count, chunks_count) = index::get_stats(&self.lock())?;
        let db_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(IndexStats {
            sources_count,
            chunks_count,
            db_size_bytes,
        })
    }

    /// Remove every source and chunk, including the built-in corpus.
    ///
    /// The next write records the configured embedder afresh.
    pub fn reset(&self) -> AppResult<()> {
        index::reset_index(&self.lock())
    }
}

/// Check if a file should be included based on patterns.
fn should_include(path: &Path, options: &LearnOptions) -> bool {
    let path_str = path.to_string_lossy();

    if options.exclude.iter().any(|p| path_str.contains(p.as_str())) {
        return false;
    }

    options.include.is_empty() || options.include.iter().any(|p| path_str.contains(p.as_str()))
}

/// Match a file stem like `seattle-notes` against the seeded city names.
fn infer_city(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy().to_lowercase();
    let stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    CITY_DESCRIPTIONS
        .iter()
        .find(|doc| {
            let name = doc.city.to_lowercase();
            format!(" {} ", stem).contains(&format!(" {} ", name))
        })
        .map(|doc| doc.city.to_string())
}
