//! Query routing for cityq.
//!
//! A [`Router`] holds two or more [`Tool`]s and a [`RoutingStrategy`]. Each
//! question gets exactly one [`RouteDecision`] and at most one tool call; the
//! tool's result comes back as a [`ToolOutcome`] instead of an error, so a
//! failing backend never takes the session down with it.

pub mod factory;
pub mod router;
pub mod session;
pub mod strategy;
pub mod tool;
pub mod tools;

#[cfg(test)]
mod tests;

pub use factory::ConfiguredFactory;
pub use router::{RouteDecision, RoutedAnswer, Router, ToolOutcome};
pub use session::{ConversationTurn, Role, RouterFactory, Session};
pub use strategy::{KeywordStrategy, LlmStrategy, RoutingStrategy};
pub use tool::{BackendKind, Tool, ToolDetail, ToolOutput, ToolSpec};
pub use tools::{SemanticTool, SqlTool};
