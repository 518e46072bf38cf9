//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default overlap between consecutive chunks in bytes.
pub const DEFAULT_CHUNK_OVERLAP: usize = 64;

/// Chunk text into overlapping segments.
///
/// Boundaries are moved to the nearest UTF-8 character boundary, and a cut
/// that would split a word is pulled back to the preceding whitespace when
/// one exists in the second half of the window.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
    base_metadata: &serde_json::Value,
) -> Vec<ChunkCandidate> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        if end < text.len() {
            if let Some(space) = text[start..end].rfind(char::is_whitespace) {
                if space > chunk_size / 2 {
                    end = start + space;
                }
            }
        }

        let piece = text[start..end].trim();

        if !piece.is_empty() {
            let mut metadata = base_metadata.clone();
            if let Some(map) = metadata.as_object_mut() {
                map.insert("start".to_string(), serde_json::json!(start));
                map.insert("end".to_string(), serde_json::json!(end));
            }

            chunks.push(ChunkCandidate {
                source_id: source_id.to_string(),
                position,
                text: piece.to_string(),
                metadata,
            });
            position += 1;
        }

        if end >= text.len() {
            break;
        }

        let consumed = end - start;
        let step = if consumed > overlap { consumed - overlap } else { consumed.max(1) };

        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}
