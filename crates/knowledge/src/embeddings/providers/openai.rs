//! OpenAI embeddings API provider.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use cityq_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Texts per request
const BATCH_LIMIT: usize = 256;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Calls `POST {base}/embeddings` with a bearer key.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Semantic(format!("Failed to create HTTP client: {}", e)))?;
        Ok(self)
    }

    async fn call_api(&self, input: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| AppError::Semantic(format!("OpenAI embeddings request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Semantic(format!(
                "OpenAI embeddings error ({}): {}",
                status, body
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Semantic(format!("Failed to parse OpenAI response: {}", e)))?;

        order_embeddings(body.data, input.len())
    }
}

/// Put response rows back into request order and check nothing is missing.
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> AppResult<Vec<Vec<f32>>> {
    data.sort_by_key(|d| d.index);

    if data.len() != expected || data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err(AppError::Semantic(format!(
            "OpenAI returned {} embeddings for {} inputs",
            data.len(),
            expected
        )));
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_LIMIT) {
            embeddings.extend(self.call_api(batch).await?);
        }

        tracing::debug!("Generated {} OpenAI embeddings", embeddings.len());
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_embeddings_sorts_by_index() {
        let data = vec![
            EmbeddingData {
                index: 1,
                embedding: vec![0.0, 1.0],
            },
            EmbeddingData {
                index: 0,
                embedding: vec![1.0, 0.0],
            },
        ];

        let ordered = order_embeddings(data, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_order_embeddings_missing_row() {
        let data = vec![EmbeddingData {
            index: 0,
            embedding: vec![1.0],
        }];
        assert!(order_embeddings(data, 2).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let provider = OpenAiProvider::new("sk-test", "text-embedding-3-small", 1536)
            .with_base_url("http://127.0.0.1:9");
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let provider = OpenAiProvider::new("sk-test", "text-embedding-3-small", 1536)
            .with_base_url("http://127.0.0.1:9/v1/");
        let err = provider.embed("Miami").await.unwrap_err();
        assert!(matches!(err, AppError::Semantic(_)));
    }
}
