//! Configuration management for cityq.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - The workspace config file (`.cityq/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! All persistent state lives under `<workspace>/.cityq/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Value of `database.url` selecting a process-local, throwaway store.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .cityq/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("openai", "ollama")
    pub provider: String,

    /// Active completion model
    pub model: String,

    /// Explicit API key, overriding any provider key variable
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// City statistics store settings
    pub database: DatabaseConfig,

    /// Semantic index settings
    pub index: IndexConfig,

    /// Query routing settings
    pub router: RouterConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    /// Blanket request timeout handed to every HTTP client
    #[serde(rename = "timeoutSecs", default)]
    pub timeout_secs: Option<u64>,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
        #[serde(rename = "organizationEnv")]
        organization_env: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Completion model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Embedding model configured for this provider.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::OpenAI {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    /// Custom endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// How the six seed records are written into the city table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedMode {
    /// Insert or update on primary key conflict; safe to run repeatedly
    #[default]
    Upsert,
    /// Plain insert; fails with a uniqueness violation on a populated table
    Insert,
}

impl SeedMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "upsert" => Some(Self::Upsert),
            "insert" => Some(Self::Insert),
            _ => None,
        }
    }
}

/// City statistics store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `:memory:` or a SQLite file path (relative paths resolve against the workspace)
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(rename = "seedMode", default)]
    pub seed_mode: SeedMode,

    /// Phrase SQL rows as a sentence with a second LLM call
    #[serde(default)]
    pub synthesize: bool,
}

fn default_database_url() -> String {
    MEMORY_DATABASE.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            seed_mode: SeedMode::default(),
            synthesize: false,
        }
    }
}

/// Semantic index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index name; data lives in `.cityq/index/<name>/`
    #[serde(default = "default_index_name")]
    pub name: String,

    /// Embedding provider: "mock", "ollama", "openai"
    #[serde(rename = "embeddingProvider", default = "default_embedding_provider")]
    pub embedding_provider: String,

    #[serde(rename = "embeddingModel", default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Candidates pulled from the vector index
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Candidates kept after re-ranking
    #[serde(rename = "rerankTopN", default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    /// Minimum cosine similarity for a chunk to count as relevant
    #[serde(rename = "minScore", default = "default_min_score")]
    pub min_score: f32,

    /// Chunk size in bytes
    #[serde(rename = "chunkSize", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in bytes
    #[serde(rename = "chunkOverlap", default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_index_name() -> String {
    "cities".to_string()
}

fn default_embedding_provider() -> String {
    "mock".to_string()
}

fn default_embedding_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_top_k() -> usize {
    4
}

fn default_rerank_top_n() -> usize {
    2
}

fn default_min_score() -> f32 {
    0.10
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    64
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            embedding_provider: default_embedding_provider(),
            embedding_model: default_embedding_model(),
            dimensions: default_dimensions(),
            top_k: default_top_k(),
            rerank_top_n: default_rerank_top_n(),
            min_score: default_min_score(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Which routing strategy picks the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Language-model classifier over tool descriptions
    #[default]
    Llm,
    /// Substring rules, no model involved
    Keyword,
}

impl StrategyKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "llm" | "model" => Some(Self::Llm),
            "keyword" | "keywords" => Some(Self::Keyword),
            _ => None,
        }
    }
}

/// Query routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Substrings that send a question to the structured backend
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

fn default_keywords() -> Vec<String> {
    vec!["population".to_string(), "state".to_string()]
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            keywords: default_keywords(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    database: Option<DatabaseConfig>,
    index: Option<IndexConfig>,
    router: Option<RouterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            database: DatabaseConfig::default(),
            index: IndexConfig::default(),
            router: RouterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `CITYQ_WORKSPACE`: Override workspace path
    /// - `CITYQ_CONFIG`: Path to config file
    /// - `CITYQ_PROVIDER`: LLM provider
    /// - `CITYQ_MODEL`: Model identifier
    /// - `CITYQ_API_KEY`: API key
    /// - `CITYQ_DATABASE_URL`: `:memory:` or SQLite file path
    /// - `CITYQ_INDEX`: Semantic index name
    /// - `CITYQ_ROUTER`: Routing strategy (`llm`, `keyword`)
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CITYQ_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CITYQ_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.cityq_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env()?;

        Ok(config)
    }

    /// Apply environment variable overrides on top of file settings.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(provider) = std::env::var("CITYQ_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("CITYQ_MODEL") {
            self.model = model;
        }

        if let Ok(key) = std::env::var("CITYQ_API_KEY") {
            self.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("CITYQ_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(index) = std::env::var("CITYQ_INDEX") {
            self.index.name = index;
        }

        if let Ok(router) = std::env::var("CITYQ_ROUTER") {
            self.router.strategy = StrategyKind::parse(&router).ok_or_else(|| {
                AppError::Config(format!(
                    "Unknown router strategy in CITYQ_ROUTER: {}. Supported: llm, keyword",
                    router
                ))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(database) = config_file.database {
            result.database = database;
        }

        if let Some(index) = config_file.index {
            result.index = index;
        }

        if let Some(router) = config_file.router {
            result.router = router;
        }

        Ok(result)
    }

    /// Apply CLI overrides; flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        database_url: Option<String>,
        router: Option<StrategyKind>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(url) = database_url {
            self.database.url = url;
        }

        if let Some(strategy) = router {
            self.router.strategy = strategy;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .cityq directory.
    pub fn cityq_dir(&self) -> PathBuf {
        self.workspace.join(".cityq")
    }

    /// Ensure the .cityq directory exists.
    pub fn ensure_cityq_dir(&self) -> AppResult<()> {
        let dir = self.cityq_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .cityq directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolved SQLite file for the city store, or `None` for an in-memory store.
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.database.url == MEMORY_DATABASE {
            return None;
        }

        let path = PathBuf::from(&self.database.url);
        Some(if path.is_absolute() {
            path
        } else {
            self.workspace.join(path)
        })
    }

    /// Directory holding the semantic index named in the config.
    pub fn index_dir(&self) -> PathBuf {
        self.cityq_dir().join("index").join(&self.index.name)
    }

    /// Directory holding prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.cityq_dir().join("prompts")
    }

    /// Blanket request timeout for HTTP clients.
    pub fn timeout_secs(&self) -> Option<u64> {
        self.llm.as_ref().and_then(|llm| llm.timeout_secs)
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Custom endpoint for a provider, if configured.
    pub fn resolve_endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint())
            .map(str::to_string)
    }

    /// Resolve the API key for a provider.
    ///
    /// `CITYQ_API_KEY` wins; otherwise the variable named by the provider's
    /// `apiKeyEnv`, falling back to `OPENAI_API_KEY` for OpenAI.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => Some(api_key_env.clone()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider.eq_ignore_ascii_case("openai") => Some("OPENAI_API_KEY".to_string()),
            None => None,
        };

        env_var
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Resolve the OpenAI organization identifier, if configured.
    pub fn resolve_organization(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI {
                organization_env: Some(var),
                ..
            }) => std::env::var(var).ok(),
            _ => None,
        }
    }

    /// Validate configuration before any backend is built.
    ///
    /// Missing credentials are fatal here so the process never starts half
    /// configured.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if self.provider == "openai" && self.resolve_api_key("openai").is_none() {
            return Err(AppError::Config(format!(
                "API key not found for provider 'openai'. Set {} or CITYQ_API_KEY",
                self.api_key_env_name("openai")
            )));
        }

        let known_embedders = ["mock", "openai", "ollama"];
        if !known_embedders.contains(&self.index.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.index.embedding_provider,
                known_embedders.join(", ")
            )));
        }

        if self.index.embedding_provider == "openai" && self.resolve_api_key("openai").is_none() {
            return Err(AppError::Config(format!(
                "API key not found for embedding provider 'openai'. Set {} or CITYQ_API_KEY",
                self.api_key_env_name("openai")
            )));
        }

        if self.index.chunk_size == 0 || self.index.chunk_overlap >= self.index.chunk_size {
            return Err(AppError::Config(
                "index.chunkSize must be positive and larger than index.chunkOverlap".to_string(),
            ));
        }

        if self.index.top_k == 0 || self.index.rerank_top_n == 0 {
            return Err(AppError::Config(
                "index.topK and index.rerankTopN must be at least 1".to_string(),
            ));
        }

        // The llm strategy falls back to these
        if self.router.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(AppError::Config(
                "router.keywords needs at least one non-blank entry".to_string(),
            ));
        }

        Ok(())
    }

    fn api_key_env_name(&self, provider: &str) -> String {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => api_key_env.clone(),
            _ => "OPENAI_API_KEY".to_string(),
        }
    }
}
