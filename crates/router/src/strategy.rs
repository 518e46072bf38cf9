//! Tool selection strategies.

use crate::tool::{BackendKind, ToolSpec};
use async_trait::async_trait;
use cityq_core::{AppError, AppResult};
use cityq_llm::{LlmClient, LlmRequest};
use cityq_prompt::{build_prompt, load_prompt, ROUTER_SELECT};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Picks exactly one tool for a question.
#[async_trait]
pub trait RoutingStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Index into `tools` of the selected tool.
    async fn select(&self, question: &str, tools: &[ToolSpec]) -> AppResult<usize>;
}

/// Substring rules: structured if any keyword appears, semantic otherwise.
#[derive(Debug, Clone)]
pub struct KeywordStrategy {
    keywords: Vec<String>,
}

impl Default for KeywordStrategy {
    fn default() -> Self {
        Self::new(["population", "state"])
    }
}

impl KeywordStrategy {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Backend kind the rules assign to `question`.
    pub fn classify(&self, question: &str) -> BackendKind {
        let lower = question.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            BackendKind::Structured
        } else {
            BackendKind::Semantic
        }
    }

    /// First tool of the classified kind, else the first tool.
    ///
    /// `tools` must be non-empty.
    fn pick(&self, question: &str, tools: &[ToolSpec]) -> usize {
        let kind = self.classify(question);
        tools.iter().position(|t| t.kind == kind).unwrap_or(0)
    }
}

#[async_trait]
impl RoutingStrategy for KeywordStrategy {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn select(&self, question: &str, tools: &[ToolSpec]) -> AppResult<usize> {
        if tools.is_empty() {
            return Err(AppError::Router("No tools to choose from".to_string()));
        }
        Ok(self.pick(question, tools))
    }
}

/// Asks a language model to pick a tool from the tool descriptions.
///
/// Model errors, unparseable replies and out-of-range choices fall back to
/// the keyword rules.
pub struct LlmStrategy {
    client: Arc<dyn LlmClient>,
    model: String,
    prompts_dir: Option<PathBuf>,
    fallback: KeywordStrategy,
}

impl LlmStrategy {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, fallback: KeywordStrategy) -> Self {
        Self {
            client,
            model: model.into(),
            prompts_dir: None,
            fallback,
        }
    }

    /// Use workspace prompt overrides from `dir`.
    pub fn with_prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = Some(dir.into());
        self
    }

    fn build_request(&self, question: &str, tools: &[ToolSpec]) -> AppResult<LlmRequest> {
        let choices = tools
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}: {}", i + 1, t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n");

        let loaded = load_prompt(self.prompts_dir.as_deref(), ROUTER_SELECT)?;
        let mut variables = HashMap::new();
        variables.insert("choices".to_string(), choices);
        variables.insert("question".to_string(), question.to_string());
        let built = build_prompt(&loaded.definition, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(0.0)
            .with_max_tokens(200)
            .with_json_mode();
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        Ok(request)
    }
}

#[async_trait]
impl RoutingStrategy for LlmStrategy {
    fn name(&self) -> &str {
        "llm"
    }

    async fn select(&self, question: &str, tools: &[ToolSpec]) -> AppResult<usize> {
        if tools.is_empty() {
            return Err(AppError::Router("No tools to choose from".to_string()));
        }

        let request = self.build_request(question, tools)?;

        let reply = match self.client.complete(&request).await {
            Ok(response) => response.content,
            Err(e) => {
                tracing::warn!("Router model call failed, using keyword rules: {}", e);
                return Ok(self.fallback.pick(question, tools));
            }
        };

        match parse_choice(&reply, tools.len()) {
            Some((index, reason)) => {
                tracing::debug!(
                    "Router model chose {} ({})",
                    tools[index].name,
                    reason.as_deref().unwrap_or("no reason given")
                );
                Ok(index)
            }
            None => {
                tracing::warn!(
                    "Router model reply {:?} is not a valid choice, using keyword rules",
                    reply
                );
                Ok(self.fallback.pick(question, tools))
            }
        }
    }
}

/// Parse a 1-based choice out of a model reply into a 0-based index.
///
/// Accepts `{"choice": n, "reason": ".."}` (optionally fenced or surrounded
/// by prose) or a bare number. `None` if the choice is missing or outside
/// `1..=count`.
pub fn parse_choice(reply: &str, count: usize) -> Option<(usize, Option<String>)> {
    let text = strip_fences(reply);

    let (choice, reason) = match json_object(&text) {
        Some(value) => {
            let choice = match value.get("choice")? {
                serde_json::Value::Number(n) => n.as_u64()? as usize,
                serde_json::Value::String(s) => s.trim().parse().ok()?,
                _ => return None,
            };
            let reason = value
                .get("reason")
                .and_then(|r| r.as_str())
                .map(str::to_string);
            (choice, reason)
        }
        None => (bare_number(&text)?, None),
    };

    (1..=count).contains(&choice).then(|| (choice - 1, reason))
}

fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str::<serde_json::Value>(&text[start..=end])
        .ok()
        .filter(|v| v.is_object())
}

fn bare_number(text: &str) -> Option<usize> {
    let trimmed = text.trim().trim_end_matches('.');
    trimmed
        .strip_prefix("Choice")
        .or_else(|| trimmed.strip_prefix("choice"))
        .map(|rest| rest.trim_start_matches(':').trim())
        .unwrap_or(trimmed)
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cityq_llm::ScriptedClient;

    fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "sql_tool".to_string(),
                description: "Useful for the population/state of each city".to_string(),
                kind: BackendKind::Structured,
            },
            ToolSpec {
                name: "vector_tool".to_string(),
                description: "Useful for answering semantic questions about different cities"
                    .to_string(),
                kind: BackendKind::Semantic,
            },
        ]
    }

    #[tokio::test]
    async fn test_keyword_population_routes_structured_in_any_case() {
        let strategy = KeywordStrategy::default();
        for question in [
            "What is the population of Miami?",
            "POPULATION of Seattle",
            "Which city has the largest Population?",
            "What state is Houston in?",
        ] {
            assert_eq!(strategy.select(question, &specs()).await.unwrap(), 0, "{}", question);
        }
    }

    #[tokio::test]
    async fn test_keyword_other_questions_route_semantic() {
        let strategy = KeywordStrategy::default();
        for question in [
            "Tell me about the history of Chicago.",
            "What is Miami known for?",
            "Describe the arts scene in New York City",
        ] {
            assert_eq!(strategy.select(question, &specs()).await.unwrap(), 1, "{}", question);
        }
    }

    #[tokio::test]
    async fn test_keyword_falls_back_to_first_tool_when_kind_missing() {
        let strategy = KeywordStrategy::default();
        let only_semantic = vec![specs()[1].clone(), specs()[1].clone()];
        assert_eq!(
            strategy.select("population of Miami", &only_semantic).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_keyword_routing_is_total() {
        let strategy = KeywordStrategy::new(["population"]);
        let tools = specs();
        for question in ["a", "?", "population", "🌆", "state of things"] {
            let index = strategy.select(question, &tools).await.unwrap();
            assert!(index < tools.len());
        }
        assert!(strategy.select("anything", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_llm_strategy_uses_model_choice() {
        let client = Arc::new(ScriptedClient::new([
            r#"{"choice": 2, "reason": "asks about history"}"#,
        ]));
        let strategy = LlmStrategy::new(client.clone(), "test-model", KeywordStrategy::default());

        let index = strategy
            .select("What is the population history of Chicago?", &specs())
            .await
            .unwrap();
        assert_eq!(index, 1);

        let requests = client.requests();
        assert!(requests[0].json_mode);
        assert!(requests[0].prompt.contains("1. sql_tool: Useful for the population"));
        assert!(requests[0].prompt.contains("2. vector_tool:"));
        assert!(requests[0]
            .prompt
            .contains("What is the population history of Chicago?"));
    }

    #[tokio::test]
    async fn test_llm_strategy_falls_back_on_garbage_and_errors() {
        let client = Arc::new(ScriptedClient::new(["I think the second one", "{\"choice\": 7}"]));
        let strategy = LlmStrategy::new(client.clone(), "test-model", KeywordStrategy::default());

        assert_eq!(strategy.select("population of Miami", &specs()).await.unwrap(), 0);
        assert_eq!(strategy.select("history of Chicago", &specs()).await.unwrap(), 1);

        // Script exhausted: the client now errors
        assert_eq!(strategy.select("population of Miami", &specs()).await.unwrap(), 0);
    }

    #[test]
    fn test_parse_choice_formats() {
        assert_eq!(parse_choice(r#"{"choice": 1}"#, 2), Some((0, None)));
        assert_eq!(
            parse_choice("```json\n{\"choice\": \"2\", \"reason\": \"prose\"}\n```", 2),
            Some((1, Some("prose".to_string())))
        );
        assert_eq!(
            parse_choice("Sure! {\"choice\": 2, \"reason\": \"r\"} Hope that helps.", 2),
            Some((1, Some("r".to_string())))
        );
        assert_eq!(parse_choice("2", 2), Some((1, None)));
        assert_eq!(parse_choice("Choice: 1.", 2), Some((0, None)));
    }

    #[test]
    fn test_parse_choice_rejects_out_of_range_and_junk() {
        assert_eq!(parse_choice("0", 2), None);
        assert_eq!(parse_choice("3", 2), None);
        assert_eq!(parse_choice(r#"{"choice": -1}"#, 2), None);
        assert_eq!(parse_choice(r#"{"tool": 1}"#, 2), None);
        assert_eq!(parse_choice("the first", 2), None);
        assert_eq!(parse_choice("", 2), None);
    }
}
