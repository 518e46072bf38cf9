//! Semantic backend adapter.

use crate::tool::{BackendKind, Tool, ToolDetail, ToolOutput};
use async_trait::async_trait;
use cityq_core::AppResult;
use cityq_knowledge::SemanticIndex;
use std::sync::Arc;

pub const SEMANTIC_TOOL_NAME: &str = "vector_tool";

pub const SEMANTIC_TOOL_DESCRIPTION: &str =
    "Useful for answering semantic questions about different cities";

/// Answers questions from retrieved city descriptions.
pub struct SemanticTool {
    index: Arc<SemanticIndex>,
}

impl SemanticTool {
    pub fn new(index: Arc<SemanticIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for SemanticTool {
    fn name(&self) -> &str {
        SEMANTIC_TOOL_NAME
    }

    fn description(&self) -> &str {
        SEMANTIC_TOOL_DESCRIPTION
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Semantic
    }

    async fn invoke(&self, question: &str) -> AppResult<ToolOutput> {
        let response = self.index.answer(question).await?;

        Ok(ToolOutput {
            answer: response.answer,
            detail: ToolDetail::Sources {
                sources: response.sources,
            },
        })
    }
}
