//! Whole-router scenarios over the real backends with a scripted model.

use crate::factory::ConfiguredFactory;
use crate::router::Router;
use crate::session::{Role, RouterFactory, Session};
use crate::strategy::KeywordStrategy;
use crate::tool::{BackendKind, Tool, ToolDetail};
use crate::tools::{SemanticTool, SqlTool};
use async_trait::async_trait;
use cityq_core::config::{SeedMode, StrategyKind};
use cityq_core::{AppConfig, AppError, AppResult};
use cityq_knowledge::embeddings::config::MOCK_EMBEDDING_MODEL;
use cityq_knowledge::{EmbeddingProvider, SemanticIndex};
use cityq_llm::ScriptedClient;
use cityq_sql::{SqlEngine, SqlTranslator};
use std::sync::Arc;
use tempfile::TempDir;

const MIAMI_SQL: &str = "SELECT population FROM city_stats WHERE city_name = 'Miami'";

fn factory(workspace: &TempDir, strategy: StrategyKind) -> (ConfiguredFactory, Arc<ScriptedClient>) {
    let mut config = AppConfig::default();
    config.workspace = workspace.path().to_path_buf();
    config.router.strategy = strategy;

    let client = Arc::new(ScriptedClient::new(Vec::<String>::new()));
    let factory = ConfiguredFactory::new(config).with_client(client.clone());
    (factory, client)
}

/// The seeding embedder, with its service gone.
#[derive(Debug)]
struct Unreachable;

#[async_trait]
impl EmbeddingProvider for Unreachable {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        MOCK_EMBEDDING_MODEL
    }

    fn dimensions(&self) -> usize {
        384
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Semantic(
            "Failed to reach embedding service: connection refused".to_string(),
        ))
    }
}

#[tokio::test]
async fn test_population_question_answered_from_sql() {
    let workspace = TempDir::new().unwrap();
    let (factory, client) = factory(&workspace, StrategyKind::Keyword);
    client.push_reply(MIAMI_SQL);

    let router = factory.build().await.unwrap();
    let routed = router.route("What is the population of Miami?").await.unwrap();

    assert_eq!(routed.decision.selected_backend, BackendKind::Structured);
    assert_eq!(routed.decision.tool_name, "sql_tool");
    assert!(routed.text().contains("449514"), "{}", routed.text());

    let output = routed.outcome.output().unwrap();
    match &output.detail {
        ToolDetail::Sql { query, row_count } => {
            assert_eq!(query, MIAMI_SQL);
            assert_eq!(*row_count, 1);
        }
        other => panic!("expected SQL detail, got {:?}", other),
    }
}

#[tokio::test]
async fn test_history_question_answered_from_descriptions() {
    let workspace = TempDir::new().unwrap();
    let (factory, client) = factory(&workspace, StrategyKind::Keyword);
    client.push_reply("Chicago was rebuilt after the Great Fire of 1871.");

    let router = factory.build().await.unwrap();
    let routed = router
        .route("Tell me about the history of Chicago.")
        .await
        .unwrap();

    assert_eq!(routed.decision.selected_backend, BackendKind::Semantic);
    assert_eq!(routed.decision.tool_name, "vector_tool");
    assert!(routed.text().contains("1871"));

    match &routed.outcome.output().unwrap().detail {
        ToolDetail::Sources { sources } => {
            assert!(sources
                .iter()
                .any(|s| s.city.as_deref() == Some("Chicago")));
        }
        other => panic!("expected sources, got {:?}", other),
    }

    // The model saw Chicago's description, not just the question
    let requests = client.requests();
    assert!(requests[0].prompt.contains("(Chicago)"));
}

#[tokio::test]
async fn test_llm_strategy_routes_by_model_choice() {
    let workspace = TempDir::new().unwrap();
    let (factory, client) = factory(&workspace, StrategyKind::Llm);

    // Selection first, then the backend's own call
    client.push_reply(r#"{"choice": 1, "reason": "asks for a number"}"#);
    client.push_reply(MIAMI_SQL);

    let router = factory.build().await.unwrap();
    let routed = router
        .route("How many people live in Miami?")
        .await
        .unwrap();

    assert_eq!(routed.decision.strategy, "llm");
    assert_eq!(routed.decision.tool_name, "sql_tool");
    assert!(routed.text().contains("449514"));
    assert_eq!(client.remaining(), 0);
}

#[tokio::test]
async fn test_reset_starts_from_empty_history() {
    let workspace = TempDir::new().unwrap();
    let (factory, client) = factory(&workspace, StrategyKind::Keyword);
    client.push_reply(MIAMI_SQL);

    let mut session = Session::start(Arc::new(factory)).await.unwrap();
    session.ask("What is the population of Miami?").await.unwrap();
    assert_eq!(session.history().len(), 2);

    session.reset().await.unwrap();
    assert!(session.history().is_empty());

    client.push_reply("SELECT city_name, state FROM city_stats WHERE city_name = 'Seattle'");
    let routed = session.ask("What state is Seattle in?").await.unwrap();

    assert!(routed.text().contains("Washington"));
    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "What state is Seattle in?");
}

#[tokio::test]
async fn test_unreachable_semantic_backend_reports_single_error() {
    let workspace = TempDir::new().unwrap();
    let (factory, client) = factory(&workspace, StrategyKind::Keyword);

    // Seed the on-disk index while embeddings still work
    factory.build().await.unwrap();

    let store = factory.open_store().unwrap();
    store.migrate(SeedMode::Upsert).unwrap();
    let engine = SqlEngine::new(
        Arc::new(store),
        SqlTranslator::new(client.clone(), "test-model"),
    );
    let path = factory.index_path();
    let index = SemanticIndex::open(
        Some(path.as_path()),
        Arc::new(Unreachable),
        client.clone(),
        "test-model",
    )
    .unwrap();

    let sql: Arc<dyn Tool> = Arc::new(SqlTool::new(Arc::new(engine)));
    let semantic: Arc<dyn Tool> = Arc::new(SemanticTool::new(Arc::new(index)));
    let router = Router::new(vec![sql, semantic], Box::new(KeywordStrategy::default())).unwrap();

    let routed = router
        .route("Tell me about the history of Chicago.")
        .await
        .unwrap();
    assert!(!routed.outcome.is_answered());
    assert!(routed.text().starts_with("Error: "));
    assert!(routed.text().contains("connection refused"));
    assert_eq!(routed.text().lines().count(), 1);

    // Nothing was asked of the model, and the structured side still works
    assert!(client.requests().is_empty());
    client.push_reply(MIAMI_SQL);
    let routed = router.route("What is the population of Miami?").await.unwrap();
    assert!(routed.text().contains("449514"));
}
