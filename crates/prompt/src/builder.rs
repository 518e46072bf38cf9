//! Prompt builder: renders definitions with Handlebars.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use cityq_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Render a prompt definition with the given variables.
///
/// Rendering is strict: a template referencing a variable that was not
/// supplied is an error, so a typo in a workspace override fails loudly
/// instead of sending a hollow prompt to the model.
///
/// # Example
/// ```no_run
/// use cityq_prompt::{build_prompt, load_prompt, RAG_ANSWER};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let loaded = load_prompt(None, RAG_ANSWER)?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "Tell me about Seattle".to_string());
/// vars.insert("context".to_string(), "Seattle is a seaport city.".to_string());
/// vars.insert("caution".to_string(), String::new());
///
/// let built = build_prompt(&loaded.definition, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    let user = render(&mut handlebars, "user", &definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|tpl| render(&mut handlebars, "system", tpl, &variables))
        .transpose()?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(BuiltPrompt {
        system,
        user: user.trim_end().to_string(),
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            expects_json: definition.output.format.eq_ignore_ascii_case("json"),
            resolved_variables: variables,
        },
    })
}

fn render(
    handlebars: &mut Handlebars<'_>,
    name: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register {} template: {}", name, e)))?;

    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render {} template: {}", name, e)))
}
