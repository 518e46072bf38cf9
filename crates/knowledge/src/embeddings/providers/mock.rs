//! Offline embedding provider built from hashed words and character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use cityq_core::AppResult;
use std::collections::HashMap;

pub(crate) const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "tell", "about", "me", "how", "does", "did",
];

/// Deterministic, content-dependent embeddings without a model server.
///
/// Words are lowercased and split on anything that is not alphanumeric, stop
/// words are dropped, and each remaining word contributes to one bucket for
/// the whole word and one bucket per padded character trigram. Vectors are
/// unit length unless the text has no usable words.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let lower = text.to_lowercase();
        let mut frequencies: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        {
            *frequencies.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &frequencies {
            let weight = (*freq as f32).sqrt();

            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for window in padded.windows(3) {
                let bucket = hash_chars(window, 37) % self.dimensions;
                embedding[bucket] += weight;
            }

            let bucket = hash_chars(&word.chars().collect::<Vec<_>>(), 31) % self.dimensions;
            embedding[bucket] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }

        embedding
    }
}

fn hash_chars(chars: &[char], multiplier: u64) -> usize {
    chars
        .iter()
        .fold(0u64, |acc, c| acc.wrapping_mul(multiplier).wrapping_add(*c as u64)) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
