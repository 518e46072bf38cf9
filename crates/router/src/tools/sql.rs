//! Structured backend adapter.

use crate::tool::{BackendKind, Tool, ToolDetail, ToolOutput};
use async_trait::async_trait;
use cityq_core::AppResult;
use cityq_sql::SqlEngine;
use std::sync::Arc;

pub const SQL_TOOL_NAME: &str = "sql_tool";

pub const SQL_TOOL_DESCRIPTION: &str = "Useful for translating a natural language query into a \
SQL query over a table containing: city_stats, containing the population/state of each city";

/// Answers questions with generated SQL over `city_stats`.
pub struct SqlTool {
    engine: Arc<SqlEngine>,
}

impl SqlTool {
    pub fn new(engine: Arc<SqlEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for SqlTool {
    fn name(&self) -> &str {
        SQL_TOOL_NAME
    }

    fn description(&self) -> &str {
        SQL_TOOL_DESCRIPTION
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Structured
    }

    async fn invoke(&self, question: &str) -> AppResult<ToolOutput> {
        let answer = self.engine.answer(question).await?;

        Ok(ToolOutput {
            detail: ToolDetail::Sql {
                row_count: answer.rows.len(),
                query: answer.query,
            },
            answer: answer.answer,
        })
    }
}
