//! Natural language to SQL translation.

use crate::store::CityStore;
use cityq_core::{AppError, AppResult};
use cityq_llm::{LlmClient, LlmRequest};
use cityq_prompt::{build_prompt, load_prompt, SQL_TRANSLATE};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_ROWS: usize = 3;

/// Asks a language model for SQLite SQL answering a question.
pub struct SqlTranslator {
    client: Arc<dyn LlmClient>,
    model: String,
    prompts_dir: Option<PathBuf>,
}

impl SqlTranslator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            prompts_dir: None,
        }
    }

    /// Use workspace prompt overrides from `dir`.
    pub fn with_prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = Some(dir.into());
        self
    }

    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompts_dir(&self) -> Option<&std::path::Path> {
        self.prompts_dir.as_deref()
    }

    /// Translate `question` into a SQL statement over the store's schema.
    pub async fn translate(&self, store: &CityStore, question: &str) -> AppResult<String> {
        let schema = store.schema_description()?;
        let samples = store
            .query(&format!(
                "SELECT * FROM {} LIMIT {}",
                crate::records::TABLE_NAME,
                SAMPLE_ROWS
            ))?
            .render();

        let loaded = load_prompt(self.prompts_dir.as_deref(), SQL_TRANSLATE)?;
        let mut variables = HashMap::new();
        variables.insert("schema".to_string(), schema);
        variables.insert("samples".to_string(), samples);
        variables.insert("question".to_string(), question.to_string());
        let built = build_prompt(&loaded.definition, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model).with_temperature(0.0);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.client.complete(&request).await?;
        let sql = extract_sql(&response.content);

        if sql.is_empty() {
            return Err(AppError::Structured(
                "Language model returned no SQL query".to_string(),
            ));
        }

        tracing::debug!("Translated question to SQL: {}", sql);
        Ok(sql)
    }
}

/// Pull the SQL statement out of a model completion.
///
/// Handles markdown fences, a leading `SQLQuery:` label, a trailing
/// `SQLResult:` section and a trailing semicolon.
pub fn extract_sql(text: &str) -> String {
    let mut text = strip_fences(text);

    if let Some(idx) = text.find("SQLQuery:") {
        text = text[idx + "SQLQuery:".len()..].to_string();
    }

    if let Some(idx) = text.find("SQLResult:") {
        text.truncate(idx);
    }

    let text = strip_fences(&text);
    let text = text.trim();
    text.strip_suffix(';').unwrap_or(text).trim().to_string()
}

fn strip_fences(text: &str) -> String {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let start = rest.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &rest[start..];
        let end = body.rfind("```").unwrap_or(body.len());
        return body[..end].trim().to_string();
    }

    text.to_string()
}
