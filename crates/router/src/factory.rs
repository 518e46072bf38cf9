//! Router construction from the application config.

use crate::router::Router;
use crate::session::RouterFactory;
use crate::strategy::{KeywordStrategy, LlmStrategy, RoutingStrategy};
use crate::tool::Tool;
use crate::tools::{SemanticTool, SqlTool};
use async_trait::async_trait;
use cityq_core::config::StrategyKind;
use cityq_core::{AppConfig, AppResult};
use cityq_knowledge::{create_provider, EmbeddingSettings, IndexSettings, SemanticIndex};
use cityq_llm::{create_client, ClientOptions, LlmClient};
use cityq_sql::{CityStore, DatabaseTarget, SqlEngine, SqlTranslator};
use std::path::PathBuf;
use std::sync::Arc;

/// File name of the semantic index inside its index directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// Builds both backends and the configured strategy.
///
/// Every `build` opens fresh handles: the city store is migrated and the
/// built-in corpus seeded, both idempotently.
pub struct ConfiguredFactory {
    config: AppConfig,
    client: Option<Arc<dyn LlmClient>>,
}

impl ConfiguredFactory {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Use `client` instead of creating one from the provider settings.
    pub fn with_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> AppResult<Arc<dyn LlmClient>> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => create_client(
                &self.config.provider,
                &ClientOptions::from_config(&self.config, &self.config.provider),
            ),
        }
    }

    /// Open the city store without migrating it.
    pub fn open_store(&self) -> AppResult<CityStore> {
        let target = match self.config.database_path() {
            Some(path) => DatabaseTarget::File(path),
            None => DatabaseTarget::Memory,
        };
        CityStore::open(target)
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.index_dir().join(INDEX_FILE)
    }

    /// Open the semantic index without seeding it.
    pub fn open_index(&self, client: Arc<dyn LlmClient>) -> AppResult<SemanticIndex> {
        let embedder = create_provider(&EmbeddingSettings::from_config(&self.config))?;
        let path = self.index_path();

        Ok(
            SemanticIndex::open(Some(path.as_path()), embedder, client, &self.config.model)?
                .with_settings(IndexSettings::from_config(&self.config.index))
                .with_prompts_dir(self.config.prompts_dir()),
        )
    }

    pub fn strategy(&self, client: Arc<dyn LlmClient>) -> Box<dyn RoutingStrategy> {
        let keywords = KeywordStrategy::new(&self.config.router.keywords);

        match self.config.router.strategy {
            StrategyKind::Keyword => Box::new(keywords),
            StrategyKind::Llm => Box::new(
                LlmStrategy::new(client, &self.config.model, keywords)
                    .with_prompts_dir(self.config.prompts_dir()),
            ),
        }
    }
}

#[async_trait]
impl RouterFactory for ConfiguredFactory {
    async fn build(&self) -> AppResult<Router> {
        let client = self.client()?;

        let store = self.open_store()?;
        let seeded = store.migrate(self.config.database.seed_mode)?;
        tracing::debug!("City store ready ({} seed rows written)", seeded);

        let translator = SqlTranslator::new(client.clone(), &self.config.model)
            .with_prompts_dir(self.config.prompts_dir());
        let engine = SqlEngine::new(Arc::new(store), translator)
            .with_synthesis(self.config.database.synthesize);

        let index = self.open_index(client.clone())?;
        index.seed_corpus().await?;

        let sql: Arc<dyn Tool> = Arc::new(SqlTool::new(Arc::new(engine)));
        let semantic: Arc<dyn Tool> = Arc::new(SemanticTool::new(Arc::new(index)));

        Router::new(vec![sql, semantic], self.strategy(client))
    }
}
