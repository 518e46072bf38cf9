//! LLM provider factory.
//!
//! Resolves a provider name plus connection options into a shared client.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use cityq_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Connection options for a provider.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// API key (required for OpenAI)
    pub api_key: Option<String>,

    /// OpenAI organization identifier
    pub organization: Option<String>,

    /// Blanket request timeout, passed through unmodified
    pub timeout: Option<Duration>,
}

impl ClientOptions {
    /// Resolve options for `provider` from the application config.
    pub fn from_config(config: &AppConfig, provider: &str) -> Self {
        Self {
            endpoint: config.resolve_endpoint(provider),
            api_key: config.resolve_api_key(provider),
            organization: config.resolve_organization(provider),
            timeout: config.timeout_secs().map(Duration::from_secs),
        }
    }
}

/// Create an LLM client for the named provider.
///
/// # Errors
/// Returns a `Config` error if the provider is unknown or a required API key
/// is missing, and an `Llm` error if the HTTP client cannot be built.
pub fn create_client(provider: &str, options: &ClientOptions) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown provider: {}. Supported: openai, ollama",
            provider
        ))
    })?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = options.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            let client = match options.timeout {
                Some(timeout) => OllamaClient::with_timeout(base_url, timeout)?,
                None => OllamaClient::with_base_url(base_url),
            };
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI => {
            let api_key = options
                .api_key
                .as_deref()
                .ok_or_else(|| AppError::Config("OpenAI provider requires API key".to_string()))?;

            let mut client = OpenAiClient::new(api_key).with_organization(options.organization.clone());
            if let Some(ref endpoint) = options.endpoint {
                client = client.with_base_url(endpoint);
            }
            if let Some(timeout) = options.timeout {
                client = client.with_timeout(timeout)?;
            }
            Ok(Arc::new(client))
        }
    }
}
