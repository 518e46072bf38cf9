//! SQLite-backed vector index for knowledge chunks.

use crate::embeddings::cosine_similarity;
use crate::types::{KnowledgeChunk, KnowledgeSource, ScoredChunk};
use chrono::{DateTime, Utc};
use cityq_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sources (
        id TEXT PRIMARY KEY,
        location TEXT NOT NULL,
        city TEXT,
        content_type TEXT NOT NULL,
        learned_at TEXT NOT NULL,
        size_bytes INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        source_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT,
        FOREIGN KEY (source_id) REFERENCES sources(id)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);

    CREATE TABLE IF NOT EXISTS index_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

const EMBEDDING_KEY: &str = "embedding";

/// Provider, model and vector length the stored embeddings were made with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSignature {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl fmt::Display for EmbeddingSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} dims)", self.provider, self.model, self.dimensions)
    }
}

/// Open (or create) the index database. `None` opens an in-memory index.
pub fn init_index(db_path: Option<&Path>) -> AppResult<Connection> {
    let conn = match db_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Semantic(format!("Failed to create index directory: {}", e))
                })?;
            }
            Connection::open(path)
        }
        None => Connection::open_in_memory(),
    }
    .map_err(|e| AppError::Semantic(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(SCHEMA)
        .map_err(|e| AppError::Semantic(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Insert a source into the index.
pub fn insert_source(conn: &Connection, source: &KnowledgeSource) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (id, location, city, content_type, learned_at, size_bytes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            source.id,
            source.location,
            source.city,
            source.content_type,
            source.learned_at.to_rfc3339(),
            source.size_bytes as i64,
        ],
    )
    .map_err(|e| AppError::Semantic(format!("Failed to insert source: {}", e)))?;

    Ok(())
}

/// Look up a source by ID.
pub fn get_source(conn: &Connection, id: &str) -> AppResult<Option<KnowledgeSource>> {
    conn.query_row(
        "SELECT id, location, city, content_type, learned_at, size_bytes FROM sources WHERE id = ?1",
        params![id],
        |row| {
            let learned_at: String = row.get(4)?;
            Ok(KnowledgeSource {
                id: row.get(0)?,
                location: row.get(1)?,
                city: row.get(2)?,
                content_type: row.get(3)?,
                learned_at: DateTime::parse_from_rfc3339(&learned_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                size_bytes: row.get::<_, i64>(5)? as u64,
            })
        },
    )
    .optional()
    .map_err(|e| AppError::Semantic(format!("Failed to look up source '{}': {}", id, e)))
}

/// Whether a source with this ID has been indexed.
pub fn source_exists(conn: &Connection, id: &str) -> AppResult<bool> {
    Ok(get_source(conn, id)?.is_some())
}

/// Insert a chunk with embedding into the index.
pub fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let embedding = chunk
        .embedding
        .as_ref()
        .ok_or_else(|| AppError::Semantic("Chunk missing embedding".to_string()))?;

    let metadata_json = serde_json::to_string(&chunk.metadata)?;

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.text,
            embedding_to_bytes(embedding),
            metadata_json,
        ],
    )
    .map_err(|e| AppError::Semantic(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

/// Query the index for the top-k chunks by cosine similarity, best first.
pub fn query_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<ScoredChunk>> {
    let mut stmt = conn
        .prepare("SELECT id, source_id, position, text, embedding, metadata FROM chunks")
        .map_err(|e| AppError::Semantic(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let metadata_json: Option<String> = row.get(5)?;
            Ok((
                KnowledgeChunk {
                    id: row.get(0)?,
                    source_id: row.get(1)?,
                    position: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                    embedding: None,
                    metadata: serde_json::Value::Null,
                },
                embedding_bytes,
                metadata_json,
            ))
        })
        .map_err(|e| AppError::Semantic(format!("Failed to query chunks: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let (mut chunk, embedding_bytes, metadata_json) =
            row.map_err(|e| AppError::Semantic(format!("Failed to read chunk: {}", e)))?;

        let embedding = bytes_to_embedding(&embedding_bytes)?;
        chunk.metadata = match metadata_json {
            Some(json) => serde_json::from_str(&json)?,
            None => serde_json::json!({}),
        };

        let score = cosine_similarity(query_embedding, &embedding);
        chunk.embedding = Some(embedding);
        results.push(ScoredChunk::new(chunk, score));
    }

    results.sort_by(|a, b| {
        b.vector_score
            .partial_cmp(&a.vector_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} chunks (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Source and chunk counts.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let count = |table: &str| -> AppResult<u32> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Semantic(format!("Failed to count {}: {}", table, e)))
    };

    Ok((count("sources")?, count("chunks")?))
}

/// Delete a source and its chunks.
pub fn delete_source(conn: &Connection, id: &str) -> AppResult<()> {
    conn.execute("DELETE FROM chunks WHERE source_id = ?1", params![id])
        .and_then(|_| conn.execute("DELETE FROM sources WHERE id = ?1", params![id]))
        .map_err(|e| AppError::Semantic(format!("Failed to delete source '{}': {}", id, e)))?;
    Ok(())
}

/// Signature recorded by the first write, if any.
pub fn read_signature(conn: &Connection) -> AppResult<Option<EmbeddingSignature>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = ?1",
            params![EMBEDDING_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| AppError::Semantic(format!("Failed to read index metadata: {}", e)))?;

    value
        .map(|json| serde_json::from_str(&json).map_err(AppError::from))
        .transpose()
}

pub fn write_signature(conn: &Connection, signature: &EmbeddingSignature) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)",
        params![EMBEDDING_KEY, serde_json::to_string(signature)?],
    )
    .map_err(|e| AppError::Semantic(format!("Failed to write index metadata: {}", e)))?;
    Ok(())
}

/// Delete all sources, chunks and the recorded signature.
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("DELETE FROM chunks; DELETE FROM sources; DELETE FROM index_meta;")
        .map_err(|e| AppError::Semantic(format!("Failed to reset index: {}", e)))?;

    tracing::info!("Reset semantic index");
    Ok(())
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Semantic(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn source(id: &str) -> KnowledgeSource {
        KnowledgeSource {
            id: id.to_string(),
            location: "corpus:test".to_string(),
            city: Some("Houston".to_string()),
            content_type: "text".to_string(),
            learned_at: Utc::now(),
            size_bytes: 100,
        }
    }

    #[test]
    fn test_init_index_on_disk() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(Some(temp_file.path())).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 3);
    }

    #[test]
    fn test_insert_and_query() {
        let conn = init_index(None).unwrap();
        insert_source(&conn, &source("source1")).unwrap();

        let chunk = KnowledgeChunk {
            id: "chunk1".to_string(),
            source_id: "source1".to_string(),
            position: 0,
            text: "Houston hosts mission control".to_string(),
            embedding: Some(vec![1.0, 0.0, 0.0]),
            metadata: serde_json::json!({"city": "Houston", "claim_id": "C-1"}),
        };
        insert_chunk(&conn, &chunk).unwrap();

        let results = query_chunks(&conn, &[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "chunk1");
        assert_eq!(results[0].chunk.city(), Some("Houston"));
        assert_eq!(results[0].chunk.metadata["claim_id"], "C-1");
        assert!((results[0].vector_score - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_source_round_trip_and_exists() {
        let conn = init_index(None).unwrap();
        assert!(!source_exists(&conn, "source1").unwrap());

        insert_source(&conn, &source("source1")).unwrap();
        let loaded = get_source(&conn, "source1").unwrap().unwrap();
        assert_eq!(loaded.city.as_deref(), Some("Houston"));
        assert!(source_exists(&conn, "source1").unwrap());
    }

    #[test]
    fn test_insert_chunk_without_embedding() {
        let conn = init_index(None).unwrap();
        let chunk = KnowledgeChunk {
            id: "c".to_string(),
            source_id: "s".to_string(),
            position: 0,
            text: "x".to_string(),
            embedding: None,
            metadata: serde_json::json!({}),
        };
        assert!(insert_chunk(&conn, &chunk).is_err());
    }

    #[test]
    fn test_stats_and_reset() {
        let conn = init_index(None).unwrap();
        insert_source(&conn, &source("s")).unwrap();
        for i in 0..3 {
            insert_chunk(
                &conn,
                &KnowledgeChunk {
                    id: format!("c{}", i),
                    source_id: "s".to_string(),
                    position: i,
                    text: format!("text {}", i),
                    embedding: Some(vec![i as f32, 1.0]),
                    metadata: serde_json::json!({}),
                },
            )
            .unwrap();
        }

        assert_eq!(get_stats(&conn).unwrap(), (1, 3));
        delete_source(&conn, "s").unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0));

        insert_source(&conn, &source("t")).unwrap();
        reset_index(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0));
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }

    #[test]
    fn test_signature_roundtrip_and_reset() {
        let conn = init_index(None).unwrap();
        assert_eq!(read_signature(&conn).unwrap(), None);

        let signature = EmbeddingSignature {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        };
        write_signature(&conn, &signature).unwrap();
        assert_eq!(read_signature(&conn).unwrap(), Some(signature.clone()));
        assert_eq!(signature.to_string(), "ollama/nomic-embed-text (768 dims)");

        reset_index(&conn).unwrap();
        assert_eq!(read_signature(&conn).unwrap(), None);
    }
}
