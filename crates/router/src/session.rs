//! Conversation session: history plus the live router.

use crate::router::{RoutedAnswer, Router};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cityq_core::AppResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// Builds a router with fresh backend handles.
#[async_trait]
pub trait RouterFactory: Send + Sync {
    async fn build(&self) -> AppResult<Router>;
}

/// One user's conversation.
///
/// Questions are answered one at a time; `ask` takes `&mut self`.
pub struct Session {
    id: Uuid,
    history: Vec<ConversationTurn>,
    router: Router,
    factory: Arc<dyn RouterFactory>,
}

impl Session {
    pub async fn start(factory: Arc<dyn RouterFactory>) -> AppResult<Self> {
        let router = factory.build().await?;
        let id = Uuid::new_v4();

        tracing::info!(session = %id, "Session started with strategy {}", router.strategy_name());

        Ok(Self {
            id,
            history: Vec::new(),
            router,
            factory,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Route `question` and record the exchange.
    ///
    /// A backend failure is recorded as its `Error: ...` text. Questions the
    /// router rejects outright (blank input) leave the history untouched.
    pub async fn ask(&mut self, question: &str) -> AppResult<RoutedAnswer> {
        let routed = self.router.route(question).await?;

        self.history.push(ConversationTurn::new(Role::User, question));
        self.history
            .push(ConversationTurn::new(Role::Assistant, routed.text()));

        tracing::debug!(session = %self.id, turns = self.history.len(), "Recorded exchange");
        Ok(routed)
    }

    /// Forget the conversation and rebuild the backends.
    ///
    /// History is cleared even if the rebuild fails; the previous router is
    /// then kept.
    pub async fn reset(&mut self) -> AppResult<()> {
        self.history.clear();
        self.router = self.factory.build().await?;

        tracing::info!(session = %self.id, "Session reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::KeywordStrategy;
    use crate::tool::{BackendKind, Tool, ToolDetail, ToolOutput};
    use cityq_core::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo(&'static str, BackendKind);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Useful for echoing"
        }

        fn kind(&self) -> BackendKind {
            self.1
        }

        async fn invoke(&self, question: &str) -> AppResult<ToolOutput> {
            Ok(ToolOutput {
                answer: format!("{}: {}", self.0, question),
                detail: ToolDetail::Sources { sources: vec![] },
            })
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        builds: AtomicUsize,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl RouterFactory for CountingFactory {
        async fn build(&self) -> AppResult<Router> {
            let n = self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| n >= limit) {
                return Err(AppError::Config("backend unavailable".to_string()));
            }
            let sql: Arc<dyn Tool> = Arc::new(Echo("sql", BackendKind::Structured));
            let docs: Arc<dyn Tool> = Arc::new(Echo("docs", BackendKind::Semantic));
            Router::new(vec![sql, docs], Box::new(KeywordStrategy::default()))
        }
    }

    #[tokio::test]
    async fn test_ask_appends_user_then_assistant() {
        let mut session = Session::start(Arc::new(CountingFactory::default()))
            .await
            .unwrap();

        session.ask("What is the population of Miami?").await.unwrap();

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "What is the population of Miami?");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "sql: What is the population of Miami?");
    }

    #[tokio::test]
    async fn test_blank_question_is_not_recorded() {
        let mut session = Session::start(Arc::new(CountingFactory::default()))
            .await
            .unwrap();

        assert!(session.ask("  ").await.is_err());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_history_and_rebuilds() {
        let factory = Arc::new(CountingFactory::default());
        let mut session = Session::start(factory.clone()).await.unwrap();
        let id = session.id();

        session.ask("Tell me about Seattle").await.unwrap();
        session.reset().await.unwrap();

        assert!(session.history().is_empty());
        assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
        assert_eq!(session.id(), id);
    }

    #[tokio::test]
    async fn test_failed_rebuild_still_clears_history() {
        let factory = Arc::new(CountingFactory {
            builds: AtomicUsize::new(0),
            fail_after: Some(1),
        });
        let mut session = Session::start(factory).await.unwrap();
        session.ask("Tell me about Seattle").await.unwrap();

        assert!(session.reset().await.is_err());
        assert!(session.history().is_empty());

        // The previous router keeps serving
        let routed = session.ask("population of Houston").await.unwrap();
        assert_eq!(routed.decision.tool_name, "sql");
    }
}
