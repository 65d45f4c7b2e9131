//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use luxas_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the system and the user templates are rendered with the same
/// variables. Values are inserted verbatim (no HTML escaping).
///
/// # Example
/// ```no_run
/// use luxas_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "Que prévoit la loi ?".to_string());
///
/// let built = build_prompt(&def, &vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, variables))
        .transpose()?;
    let user = render_template(&definition.template, variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        source_prompt_id: definition.id.clone(),
        temperature: definition.behavior.temperature,
        max_tokens: definition.behavior.max_tokens,
    })
}

/// Render a Handlebars template with variables.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PromptBehavior, PromptOutputSpec};

    fn definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            system: system.map(str::to_string),
            behavior: PromptBehavior {
                temperature: Some(0.0),
                max_tokens: None,
            },
            template: "Question : {{question}}".to_string(),
            output: PromptOutputSpec {
                format: "text".to_string(),
            },
        }
    }

    #[test]
    fn test_render_does_not_escape() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "L'article 3 & \"suivants\"".to_string());

        let rendered = render_template("Question : {{question}}", &vars).unwrap();
        assert_eq!(rendered, "Question : L'article 3 & \"suivants\"");
    }

    #[test]
    fn test_build_prompt_carries_behavior() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Et pour les enfants ?".to_string());

        let built = build_prompt(&definition(Some("Tu es LuXas")), &vars).unwrap();
        assert_eq!(built.system.as_deref(), Some("Tu es LuXas"));
        assert_eq!(built.user, "Question : Et pour les enfants ?");
        assert_eq!(built.source_prompt_id, "test.prompt");
        assert_eq!(built.temperature, Some(0.0));
    }

    #[test]
    fn test_build_prompt_without_system() {
        let built = build_prompt(&definition(None), &HashMap::new()).unwrap();
        assert!(built.system.is_none());
        // Missing variables render as empty strings
        assert_eq!(built.user, "Question : ");
    }
}
