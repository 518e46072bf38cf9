//! The tool abstraction the router dispatches to.

use async_trait::async_trait;
use cityq_core::AppResult;
use cityq_knowledge::RagSourceRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of backend a tool fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Tabular lookup through generated SQL
    Structured,
    /// Similarity retrieval over indexed text
    Semantic,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a strategy sees of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub kind: BackendKind,
}

/// Backend-specific evidence for an answer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolDetail {
    /// The statement that produced the answer
    Sql { query: String, row_count: usize },
    /// Passages the answer was synthesized from
    Sources { sources: Vec<RagSourceRef> },
}

/// A tool's answer.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub answer: String,
    pub detail: ToolDetail,
}

/// A named, described backend the router can hand a question to.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within a router
    fn name(&self) -> &str;

    /// What the tool is useful for; read by model-driven strategies
    fn description(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Answer `question`, passed through exactly as the user wrote it.
    async fn invoke(&self, question: &str) -> AppResult<ToolOutput>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            kind: self.kind(),
        }
    }
}
