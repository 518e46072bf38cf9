//! Embedding settings resolved from the application config.

use cityq_core::AppConfig;
use std::time::Duration;

/// Default Ollama embedding model.
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Default OpenAI embedding model.
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Model name used by the offline trigram embedder.
pub const MOCK_EMBEDDING_MODEL: &str = "trigram-v1";

/// Everything needed to build an embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSettings {
    /// Provider name: "mock", "ollama", "openai"
    pub provider: String,

    pub model: String,

    /// Expected vector length
    pub dimensions: usize,

    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    pub timeout: Option<Duration>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: MOCK_EMBEDDING_MODEL.to_string(),
            dimensions: 384,
            endpoint: None,
            api_key: None,
            timeout: None,
        }
    }
}

impl EmbeddingSettings {
    /// Resolve settings from the `index` section plus the provider blocks.
    ///
    /// When a real provider is selected but the model is still the trigram
    /// default, the provider's `embeddingModel` (or its stock model) is used.
    pub fn from_config(config: &AppConfig) -> Self {
        let provider = config.index.embedding_provider.clone();

        let model = if provider != "mock" && config.index.embedding_model == MOCK_EMBEDDING_MODEL {
            config
                .get_provider_config(&provider)
                .and_then(|pc| pc.embedding_model())
                .map(str::to_string)
                .unwrap_or_else(|| match provider.as_str() {
                    "openai" => DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
                    _ => DEFAULT_OLLAMA_EMBEDDING_MODEL.to_string(),
                })
        } else {
            config.index.embedding_model.clone()
        };

        Self {
            endpoint: config.resolve_endpoint(&provider),
            api_key: config.resolve_api_key(&provider),
            timeout: config.timeout_secs().map(Duration::from_secs),
            dimensions: config.index.dimensions,
            model,
            provider,
        }
    }
}
