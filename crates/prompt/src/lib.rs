//! Prompt system for cityq.
//!
//! - YAML prompt definitions, built in and overridable per workspace
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{
    list_prompts, load_prompt, RAG_ANSWER, ROUTER_SELECT, SQL_SYNTHESIZE, SQL_TRANSLATE,
};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, LoadedPrompt, PromptDefinition, PromptOrigin,
    PromptOutputSpec,
};
