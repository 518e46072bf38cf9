//! Question answering over the city store.

use crate::guard::ensure_read_only;
use crate::store::{CityStore, QueryRows};
use crate::translate::SqlTranslator;
use cityq_core::AppResult;
use cityq_llm::LlmRequest;
use cityq_prompt::{build_prompt, load_prompt, SQL_SYNTHESIZE};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

/// Answer text shown when a query returns nothing.
pub const NO_ROWS: &str = "No rows matched";

/// Result of answering one question with SQL.
#[derive(Debug, Clone, Serialize)]
pub struct SqlAnswer {
    /// The statement that was executed
    pub query: String,
    pub rows: QueryRows,
    pub answer: String,
}

/// Translate, check, execute and format.
pub struct SqlEngine {
    store: Arc<CityStore>,
    translator: SqlTranslator,
    synthesize: bool,
}

impl SqlEngine {
    pub fn new(store: Arc<CityStore>, translator: SqlTranslator) -> Self {
        Self {
            store,
            translator,
            synthesize: false,
        }
    }

    /// Phrase the rows as a sentence with a second model call.
    pub fn with_synthesis(mut self, synthesize: bool) -> Self {
        self.synthesize = synthesize;
        self
    }

    pub fn store(&self) -> &Arc<CityStore> {
        &self.store
    }

    pub async fn answer(&self, question: &str) -> AppResult<SqlAnswer> {
        let span = tracing::info_span!("sql_answer", synthesize = self.synthesize);

        async move {
            let generated = self.translator.translate(&self.store, question).await?;
            let query = ensure_read_only(&generated)?;
            let rows = self.store.query(&query)?;

            tracing::info!(rows = rows.len(), "Executed query: {}", query);

            let answer = if rows.is_empty() {
                NO_ROWS.to_string()
            } else if self.synthesize {
                self.synthesize_answer(question, &query, &rows).await?
            } else {
                rows.render()
            };

            Ok(SqlAnswer {
                query,
                rows,
                answer,
            })
        }
        .instrument(span)
        .await
    }

    async fn synthesize_answer(
        &self,
        question: &str,
        query: &str,
        rows: &QueryRows,
    ) -> AppResult<String> {
        let loaded = load_prompt(self.translator.prompts_dir(), SQL_SYNTHESIZE)?;
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("query".to_string(), query.to_string());
        variables.insert("rows".to_string(), rows.render());
        let built = build_prompt(&loaded.definition, variables)?;

        let mut request = LlmRequest::new(built.user, self.translator.model());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.translator.client().complete(&request).await?;
        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DatabaseTarget;
    use cityq_core::config::SeedMode;
    use cityq_core::AppError;
    use cityq_llm::ScriptedClient;

    fn engine(replies: Vec<&str>) -> (SqlEngine, Arc<ScriptedClient>) {
        let store = CityStore::open(DatabaseTarget::Memory).unwrap();
        store.migrate(SeedMode::Upsert).unwrap();
        let client = Arc::new(ScriptedClient::new(replies));
        let translator = SqlTranslator::new(client.clone(), "test-model");
        (SqlEngine::new(Arc::new(store), translator), client)
    }

    #[tokio::test]
    async fn test_answer_renders_rows() {
        let (engine, _) = engine(vec![
            "SELECT population FROM city_stats WHERE city_name = 'Miami'",
        ]);

        let answer = engine.answer("What is the population of Miami?").await.unwrap();
        assert_eq!(answer.query, "SELECT population FROM city_stats WHERE city_name = 'Miami'");
        assert_eq!(answer.answer, "population: 449514");
        assert_eq!(answer.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_answer_with_string_functions() {
        let (engine, _) = engine(vec![
            "SELECT REPLACE(state, 'New ', '') AS short_state FROM city_stats WHERE city_name = 'New York City'",
        ]);

        let answer = engine.answer("Which state is New York City in, without the 'New'?").await.unwrap();
        assert_eq!(answer.answer, "short_state: York");
    }

    #[tokio::test]
    async fn test_answer_with_synthesis() {
        let (engine, client) = engine(vec![
            "SELECT population FROM city_stats WHERE city_name = 'Miami'",
            "Miami has a population of 449,514 (449514).",
        ]);
        let engine = engine.with_synthesis(true);

        let answer = engine.answer("What is the population of Miami?").await.unwrap();
        assert!(answer.answer.contains("449514"));

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].prompt.contains("population: 449514"));
    }

    #[tokio::test]
    async fn test_empty_result() {
        let (engine, client) = engine(vec![
            "SELECT population FROM city_stats WHERE city_name = 'Atlantis'",
        ]);
        let engine = engine.with_synthesis(true);

        let answer = engine.answer("How many people live in Atlantis?").await.unwrap();
        assert_eq!(answer.answer, NO_ROWS);
        // No synthesis call for an empty result.
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_write_statement_is_refused() {
        let (engine, _) = engine(vec!["DELETE FROM city_stats"]);

        let err = engine.answer("Remove every city").await.unwrap_err();
        assert!(matches!(err, AppError::Structured(_)));
        assert_eq!(engine.store().count().unwrap(), 6);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let (engine, _) = engine(vec![]);
        let err = engine.answer("What is the population of Miami?").await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
