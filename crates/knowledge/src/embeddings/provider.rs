//! Embedding provider trait and factory.

use super::config::EmbeddingSettings;
use super::providers::{MockProvider, OllamaProvider, OpenAiProvider};
use cityq_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Semantic("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from resolved settings.
///
/// # Errors
/// `Config` for an unknown provider or an OpenAI provider without a key.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(settings.dimensions))),

        "ollama" => {
            let mut provider = OllamaProvider::new(&settings.model, settings.dimensions);
            if let Some(ref endpoint) = settings.endpoint {
                provider = provider.with_base_url(endpoint);
            }
            if let Some(timeout) = settings.timeout {
                provider = provider.with_timeout(timeout)?;
            }
            Ok(Arc::new(provider))
        }

        "openai" => {
            let api_key = settings.api_key.as_deref().ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires an API key".to_string())
            })?;

            let mut provider = OpenAiProvider::new(api_key, &settings.model, settings.dimensions);
            if let Some(ref endpoint) = settings.endpoint {
                provider = provider.with_base_url(endpoint);
            }
            if let Some(timeout) = settings.timeout {
                provider = provider.with_timeout(timeout)?;
            }
            Ok(Arc::new(provider))
        }

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama, openai",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&EmbeddingSettings::default()).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_unknown_provider() {
        let settings = EmbeddingSettings {
            provider: "gguf".to_string(),
            ..Default::default()
        };

        let err = create_provider(&settings).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_openai_requires_key() {
        let settings = EmbeddingSettings {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            ..Default::default()
        };

        assert!(matches!(create_provider(&settings), Err(AppError::Config(_))));
    }

    #[test]
    fn test_create_ollama_provider_is_lazy() {
        let settings = EmbeddingSettings {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: Some("http://127.0.0.1:9".to_string()),
            ..Default::default()
        };

        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.dimensions(), 768);
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingSettings::default()).unwrap();
        let embedding = provider.embed("Seattle rain").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
