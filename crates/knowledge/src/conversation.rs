//! Conversation history.
//!
//! The history belongs to the caller (chat surface, CLI REPL) and is passed
//! into every pipeline call; nothing here is process-wide.

use luxas_core::AppResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when a turn is quoted inside a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "Utilisateur",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only sequence of turns for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::assistant(content));
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        recent(&self.turns, n)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Parse the `[{role, content}]` JSON exchanged with the chat surface.
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<Vec<ConversationTurn>> for ConversationHistory {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }
}

/// The last `n` turns of `turns`, oldest first.
pub fn recent(turns: &[ConversationTurn], n: usize) -> &[ConversationTurn] {
    &turns[turns.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_suffix() {
        let mut history = ConversationHistory::new();
        for i in 0..8 {
            history.push_user(format!("q{}", i));
            history.push_assistant(format!("a{}", i));
        }
        let last = history.recent(6);
        assert_eq!(last.len(), 6);
        assert_eq!(last[0].content, "q5");
        assert_eq!(last[5].content, "a7");
        assert_eq!(history.len(), 16);
        assert_eq!(history.recent(100).len(), 16);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"[{"role":"user","content":"Que dit la loi ?"},{"role":"assistant","content":"Elle..."}]"#;
        let history = ConversationHistory::from_json(json).unwrap();
        assert_eq!(history.turns()[0].role, Role::User);
        assert_eq!(history.turns()[1].role.label(), "Assistant");

        let back = ConversationHistory::from_json(&history.to_json().unwrap()).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(ConversationHistory::from_json(r#"[{"role":"system","content":"x"}]"#).is_err());
    }
}
