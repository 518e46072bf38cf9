//! Prompt loader.
//!
//! Every prompt cityq uses ships as a built-in definition. A workspace can
//! override any of them with `<prompts_dir>/<id>.yaml` (or `.yml`).

use crate::types::{LoadedPrompt, PromptDefinition, PromptOrigin};
use cityq_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Routing classifier prompt.
pub const ROUTER_SELECT: &str = "router.select";
/// Natural language to SQL prompt.
pub const SQL_TRANSLATE: &str = "sql.translate";
/// SQL rows to sentence prompt.
pub const SQL_SYNTHESIZE: &str = "sql.synthesize";
/// Retrieval-augmented answer prompt.
pub const RAG_ANSWER: &str = "rag.answer";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (ROUTER_SELECT, include_str!("../prompts/router.select.yaml")),
    (SQL_TRANSLATE, include_str!("../prompts/sql.translate.yaml")),
    (SQL_SYNTHESIZE, include_str!("../prompts/sql.synthesize.yaml")),
    (RAG_ANSWER, include_str!("../prompts/rag.answer.yaml")),
];

/// Load a prompt definition by ID.
///
/// A workspace override in `prompts_dir` wins over the built-in definition.
///
/// # Example
/// ```no_run
/// use cityq_prompt::{load_prompt, SQL_TRANSLATE};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Some(Path::new(".cityq/prompts")), SQL_TRANSLATE)?;
/// println!("Loaded prompt: {}", prompt.definition.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompts_dir: Option<&Path>, prompt_id: &str) -> AppResult<LoadedPrompt> {
    if let Some(path) = prompts_dir.and_then(|dir| find_override(dir, prompt_id)) {
        tracing::debug!("Loading prompt override from: {:?}", path);

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e))
        })?;

        let definition = parse_definition(&contents)
            .map_err(|e| AppError::Prompt(format!("{:?}: {}", path, e)))?;

        if definition.id != prompt_id {
            return Err(AppError::Prompt(format!(
                "Prompt file {:?} declares id '{}', expected '{}'",
                path, definition.id, prompt_id
            )));
        }

        return Ok(LoadedPrompt {
            definition,
            origin: PromptOrigin::Workspace(path),
        });
    }

    let (_, source) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;

    let definition = parse_definition(source)
        .map_err(|e| AppError::Prompt(format!("built-in '{}': {}", prompt_id, e)))?;

    Ok(LoadedPrompt {
        definition,
        origin: PromptOrigin::BuiltIn,
    })
}

/// List all prompt IDs: built-ins plus any extra workspace definitions.
pub fn list_prompts(prompts_dir: Option<&Path>) -> Vec<String> {
    let mut ids: Vec<String> = BUILTIN_PROMPTS.iter().map(|(id, _)| id.to_string()).collect();

    if let Some(dir) = prompts_dir.filter(|d| d.exists()) {
        for entry in walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_yaml = matches!(
                path.extension().and_then(|s| s.to_str()),
                Some("yaml") | Some("yml")
            );
            if path.is_file() && is_yaml {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if !ids.iter().any(|id| id == stem) {
                        ids.push(stem.to_string());
                    }
                }
            }
        }
    }

    ids
}

fn find_override(dir: &Path, prompt_id: &str) -> Option<PathBuf> {
    ["yaml", "yml"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", prompt_id, ext)))
        .find(|p| p.is_file())
}

fn parse_definition(contents: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML: {}", e)))?;
    validate_prompt(&definition)?;
    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt("Prompt template cannot be empty".to_string()));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
