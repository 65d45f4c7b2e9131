//! Built-in prompt set with workspace overrides.

use crate::builder::build_prompt;
use crate::loader::{list_prompts, load_prompt, parse_prompt};
use crate::types::{BuiltPrompt, PromptDefinition};
use luxas_core::{AppError, AppResult};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Rewrites a follow-up question into a standalone one.
pub const REFORMULATE: &str = "rag.reformulate";
/// Writes the grounded answer from retrieved passages.
pub const ANSWER: &str = "rag.answer";
/// Plain-language summary of a law text.
pub const SUMMARIZE: &str = "tools.summarize";
/// Media tone analysis.
pub const TONE: &str = "tools.tone";

const BUILTIN: [&str; 4] = [
    include_str!("../prompts/rag.reformulate.yml"),
    include_str!("../prompts/rag.answer.yml"),
    include_str!("../prompts/tools.summarize.yml"),
    include_str!("../prompts/tools.tone.yml"),
];

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: BTreeMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Prompts shipped with the binary.
    pub fn builtin() -> AppResult<Self> {
        let mut prompts = BTreeMap::new();
        for source in BUILTIN {
            let definition = parse_prompt(source)?;
            prompts.insert(definition.id.clone(), definition);
        }
        Ok(Self { prompts })
    }

    /// Built-in prompts, replaced by any `.luxas/prompts/<id>.yml` override.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut library = Self::builtin()?;
        for id in list_prompts(workspace_path)? {
            let definition = load_prompt(workspace_path, &id)?;
            library.prompts.insert(id, definition);
        }
        Ok(library)
    }

    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.prompts
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }

    /// Render prompt `id` with `(name, value)` variables.
    pub fn render(&self, id: &str, variables: &[(&str, &str)]) -> AppResult<BuiltPrompt> {
        let variables: HashMap<String, String> = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        build_prompt(self.get(id)?, &variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_prompts_parse() {
        let library = PromptLibrary::builtin().unwrap();
        let ids: Vec<&str> = library.ids().collect();
        assert_eq!(ids, vec![ANSWER, REFORMULATE, SUMMARIZE, TONE]);
    }

    #[test]
    fn test_answer_prompt_layout() {
        let library = PromptLibrary::builtin().unwrap();
        let built = library
            .render(
                ANSWER,
                &[
                    ("history", ""),
                    ("context", "[Document: loi_123.pdf | Chunk 1]\nArticle 1"),
                    ("question", "Que dit l'article 1 ?"),
                ],
            )
            .unwrap();

        assert!(built.user.starts_with("Documents disponibles :\n\n[Document: loi_123.pdf"));
        assert!(built.user.contains("Question actuelle : Que dit l'article 1 ?"));
        assert!(built.user.ends_with("Cite tes sources."));
        let system = built.system.unwrap();
        assert!(system.starts_with("Tu es LuXas"));
        assert!(system.contains("RÈGLE D'OR"));
    }

    #[test]
    fn test_tool_prompt_temperatures() {
        let library = PromptLibrary::builtin().unwrap();
        assert_eq!(library.get(SUMMARIZE).unwrap().behavior.temperature, Some(0.0));
        assert_eq!(library.get(TONE).unwrap().behavior.temperature, Some(0.7));
        assert_eq!(library.get(ANSWER).unwrap().behavior.temperature, None);
    }

    #[test]
    fn test_workspace_override_replaces_builtin() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".luxas/prompts");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("tools.summarize.yml"),
            r#"
id: tools.summarize
title: Résumé court
apiVersion: "1.1"
template: "Résume : {{text}}"
output:
  format: text
"#,
        )
        .unwrap();

        let library = PromptLibrary::load(temp.path()).unwrap();
        let built = library.render(SUMMARIZE, &[("text", "Article unique")]).unwrap();
        assert_eq!(built.user, "Résume : Article unique");
        assert!(built.system.is_none());
    }

    #[test]
    fn test_unknown_prompt() {
        let library = PromptLibrary::builtin().unwrap();
        assert!(library.get("agent.ask").is_err());
    }
}
