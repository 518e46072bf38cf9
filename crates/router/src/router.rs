//! Dispatch of one question to one tool.

use crate::strategy::RoutingStrategy;
use crate::tool::{BackendKind, Tool, ToolOutput, ToolSpec};
use cityq_core::{AppError, AppResult};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Which tool answers a question, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub selected_backend: BackendKind,
    pub tool_name: String,

    /// The selected tool's own description
    pub rationale: String,

    /// Name of the strategy that decided
    pub strategy: String,

    #[serde(skip)]
    pub(crate) tool_index: usize,
}

/// Result of invoking the selected tool.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutcome {
    Answered(ToolOutput),
    Failed { reason: String },
}

impl ToolOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered(_))
    }

    pub fn output(&self) -> Option<&ToolOutput> {
        match self {
            Self::Answered(output) => Some(output),
            Self::Failed { .. } => None,
        }
    }

    /// User-facing text: the answer, or a single `Error: ...` line.
    pub fn text(&self) -> String {
        match self {
            Self::Answered(output) => output.answer.clone(),
            Self::Failed { reason } => format!("Error: {}", reason),
        }
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// A decision together with what the chosen tool returned.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedAnswer {
    pub decision: RouteDecision,
    pub outcome: ToolOutcome,
}

impl RoutedAnswer {
    pub fn text(&self) -> String {
        self.outcome.text()
    }
}

/// Routes each question to exactly one of its tools.
pub struct Router {
    tools: Vec<Arc<dyn Tool>>,
    specs: Vec<ToolSpec>,
    strategy: Box<dyn RoutingStrategy>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("tools", &self.specs)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl Router {
    /// # Errors
    /// Returns a `Router` error unless there are two or more tools with
    /// distinct names.
    pub fn new(tools: Vec<Arc<dyn Tool>>, strategy: Box<dyn RoutingStrategy>) -> AppResult<Self> {
        if tools.len() < 2 {
            return Err(AppError::Router(format!(
                "A router needs at least two tools, got {}",
                tools.len()
            )));
        }

        let mut names = HashSet::new();
        for tool in &tools {
            if !names.insert(tool.name().to_string()) {
                return Err(AppError::Router(format!(
                    "Duplicate tool name: {}",
                    tool.name()
                )));
            }
        }

        let specs = tools.iter().map(|t| t.spec()).collect();

        Ok(Self {
            tools,
            specs,
            strategy,
        })
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Choose the tool for `question` without invoking it.
    pub async fn decide(&self, question: &str) -> AppResult<RouteDecision> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Question must not be empty".to_string(),
            ));
        }

        let index = self.strategy.select(question, &self.specs).await?;
        let spec = self.specs.get(index).ok_or_else(|| {
            AppError::Router(format!(
                "Strategy '{}' selected tool {} of {}",
                self.strategy.name(),
                index,
                self.specs.len()
            ))
        })?;

        Ok(RouteDecision {
            selected_backend: spec.kind,
            tool_name: spec.name.clone(),
            rationale: spec.description.clone(),
            strategy: self.strategy.name().to_string(),
            tool_index: index,
        })
    }

    /// Decide, invoke the selected tool once and report what happened.
    ///
    /// Tool errors become [`ToolOutcome::Failed`]; there is no retry and no
    /// second tool. Only invalid input and strategy failures are returned
    /// as errors.
    pub async fn route(&self, question: &str) -> AppResult<RoutedAnswer> {
        let span = tracing::info_span!(
            "route",
            tool = tracing::field::Empty,
            strategy = self.strategy.name()
        );

        async move {
            let decision = self.decide(question).await?;
            tracing::Span::current().record("tool", decision.tool_name.as_str());
            tracing::info!(
                backend = %decision.selected_backend,
                "Routing to {}",
                decision.tool_name
            );

            let tool = &self.tools[decision.tool_index];
            let outcome = match tool.invoke(question).await {
                Ok(output) => ToolOutcome::Answered(output),
                Err(e) => {
                    tracing::warn!("Tool {} failed: {}", decision.tool_name, e);
                    ToolOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            Ok(RoutedAnswer { decision, outcome })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::KeywordStrategy;
    use crate::tool::ToolDetail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTool {
        name: &'static str,
        kind: BackendKind,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeTool {
        fn new(name: &'static str, kind: BackendKind, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                kind,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Tool for FakeTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Useful for tests"
        }

        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn invoke(&self, question: &str) -> AppResult<ToolOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Semantic("connection refused".to_string()));
            }
            Ok(ToolOutput {
                answer: format!("{} answered: {}", self.name, question),
                detail: ToolDetail::Sources { sources: vec![] },
            })
        }
    }

    struct OutOfRange;

    #[async_trait]
    impl RoutingStrategy for OutOfRange {
        fn name(&self) -> &str {
            "broken"
        }

        async fn select(&self, _question: &str, tools: &[ToolSpec]) -> AppResult<usize> {
            Ok(tools.len())
        }
    }

    fn router(sql: Arc<dyn Tool>, semantic: Arc<dyn Tool>) -> Router {
        Router::new(vec![sql, semantic], Box::new(KeywordStrategy::default())).unwrap()
    }

    #[test]
    fn test_new_requires_two_distinct_tools() {
        let tool: Arc<dyn Tool> = FakeTool::new("a", BackendKind::Structured, false);
        let one = Router::new(
            vec![tool],
            Box::new(KeywordStrategy::default()),
        );
        assert!(matches!(one, Err(AppError::Router(_))));

        let first: Arc<dyn Tool> = FakeTool::new("a", BackendKind::Structured, false);
        let second: Arc<dyn Tool> = FakeTool::new("a", BackendKind::Semantic, false);
        let duplicate = Router::new(
            vec![first, second],
            Box::new(KeywordStrategy::default()),
        );
        assert!(matches!(duplicate, Err(AppError::Router(_))));
    }

    #[tokio::test]
    async fn test_decide_rejects_blank_questions() {
        let router = router(
            FakeTool::new("sql", BackendKind::Structured, false),
            FakeTool::new("docs", BackendKind::Semantic, false),
        );

        for question in ["", "   ", "\n\t"] {
            assert!(matches!(
                router.decide(question).await,
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_route_invokes_exactly_one_tool_with_raw_question() {
        let sql = FakeTool::new("sql", BackendKind::Structured, false);
        let docs = FakeTool::new("docs", BackendKind::Semantic, false);
        let router = router(sql.clone(), docs.clone());

        let routed = router.route("  Population of Miami?").await.unwrap();

        assert_eq!(routed.decision.tool_name, "sql");
        assert_eq!(routed.decision.selected_backend, BackendKind::Structured);
        assert_eq!(routed.decision.rationale, "Useful for tests");
        assert_eq!(routed.decision.strategy, "keyword");
        assert_eq!(routed.text(), "sql answered:   Population of Miami?");
        assert_eq!(sql.calls.load(Ordering::SeqCst), 1);
        assert_eq!(docs.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_tool_becomes_error_outcome_without_fallback() {
        let sql = FakeTool::new("sql", BackendKind::Structured, false);
        let docs = FakeTool::new("docs", BackendKind::Semantic, true);
        let router = router(sql.clone(), docs.clone());

        let routed = router.route("Tell me about Chicago").await.unwrap();

        assert!(!routed.outcome.is_answered());
        assert_eq!(
            routed.text(),
            "Error: Semantic backend error: connection refused"
        );
        assert_eq!(docs.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sql.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_strategy_is_router_error() {
        let first: Arc<dyn Tool> = FakeTool::new("a", BackendKind::Structured, false);
        let second: Arc<dyn Tool> = FakeTool::new("b", BackendKind::Semantic, false);
        let router = Router::new(
            vec![first, second],
            Box::new(OutOfRange),
        )
        .unwrap();

        assert!(matches!(
            router.route("anything").await,
            Err(AppError::Router(_))
        ));
    }

    #[test]
    fn test_outcome_serialization() {
        let failed = ToolOutcome::Failed {
            reason: "boom".to_string(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "boom");
        assert_eq!(failed.to_string(), "Error: boom");
    }
}
