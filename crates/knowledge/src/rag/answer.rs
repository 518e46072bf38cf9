//! Answer synthesis from retrieved passages.

use crate::rag::types::{RagResponse, RagSourceRef, CONFIDENCE_THRESHOLD};
use crate::semantic::SemanticIndex;
use crate::types::ScoredChunk;
use cityq_core::{AppError, AppResult};
use cityq_llm::LlmRequest;
use cityq_prompt::{build_prompt, load_prompt, RAG_ANSWER};
use std::collections::{HashMap, HashSet};
use tracing::Instrument;

/// Maximum snippet length for source references, in characters.
const MAX_SNIPPET_LENGTH: usize = 150;

impl SemanticIndex {
    /// Retrieve passages for `question` and have the language model answer from them.
    ///
    /// Fails with [`AppError::Semantic`] when no passage clears the relevance
    /// threshold, so callers never receive an answer built from nothing.
    pub async fn answer(&self, question: &str) -> AppResult<RagResponse> {
        let span = tracing::info_span!("semantic_answer");

        async move {
            let passages = self.retrieve(question).await?;
            if passages.is_empty() {
                return Err(AppError::Semantic(format!(
                    "No relevant passages found for \"{}\"",
                    question
                )));
            }

            let max_score = passages
                .iter()
                .map(|p| p.vector_score)
                .fold(f32::MIN, f32::max);
            let low_confidence = max_score < CONFIDENCE_THRESHOLD;

            tracing::info!(
                "Using {} passages (max score: {:.3}, low_confidence: {})",
                passages.len(),
                max_score,
                low_confidence
            );

            let answer = self
                .generate_answer(question, &build_context(&passages), low_confidence)
                .await?;

            Ok(RagResponse::new(
                answer,
                map_chunks_to_sources(&passages),
                max_score,
            ))
        }
        .instrument(span)
        .await
    }

    async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        low_confidence: bool,
    ) -> AppResult<String> {
        let loaded = load_prompt(self.prompts_dir.as_deref(), RAG_ANSWER)?;
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("context".to_string(), context.to_string());
        variables.insert(
            "caution".to_string(),
            if low_confidence { "yes" } else { "" }.to_string(),
        );
        let built = build_prompt(&loaded.definition, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(0.3)
            .with_max_tokens(1000);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.client.complete(&request).await?;
        let answer = response.content.trim().to_string();

        if answer.is_empty() {
            return Err(AppError::Semantic(
                "Language model returned an empty answer".to_string(),
            ));
        }

        Ok(answer)
    }
}

fn build_context(passages: &[ScoredChunk]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| match p.chunk.city() {
            Some(city) => format!("[Passage {}] ({})\n{}", i + 1, city, p.chunk.text),
            None => format!("[Passage {}]\n{}", i + 1, p.chunk.text),
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// One reference per distinct (source, location).
fn map_chunks_to_sources(passages: &[ScoredChunk]) -> Vec<RagSourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for passage in passages {
        let chunk = &passage.chunk;
        let source = chunk
            .source_label()
            .unwrap_or(chunk.source_id.as_str())
            .to_string();
        let location = match (
            chunk.metadata.get("start").and_then(|v| v.as_u64()),
            chunk.metadata.get("end").and_then(|v| v.as_u64()),
        ) {
            (Some(start), Some(end)) => format!("chars {}-{}", start, end),
            _ => format!("position {}", chunk.position),
        };

        if seen.insert((source.clone(), location.clone())) {
            sources.push(RagSourceRef {
                city: chunk.city().map(str::to_string),
                source,
                location,
                snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
            });
        }
    }

    sources
}

/// Cut at a word boundary within `max_chars` characters.
fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(space) if space > 0 => format!("{}...", truncated[..space].trim_end()),
        _ => format!("{}...", truncated),
    }
}
