//! Message model for a single turn.

use serde::{Deserialize, Serialize};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    Human,
    ToolOutput,
}

/// One role-tagged message in the LLM request context.
///
/// The context is rebuilt fresh per turn: the configured system prompt plus
/// the received text as the sole human message. No prior turns are retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self { role: Role::Human, content: content.into() }
    }

    pub fn tool_output(content: impl Into<String>) -> Self {
        Self { role: Role::ToolOutput, content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(serde_json::to_string(&Role::Human).unwrap(), r#""human""#);
        assert_eq!(
            serde_json::to_string(&Role::ToolOutput).unwrap(),
            r#""tool_output""#
        );
    }

    #[test]
    fn test_constructors() {
        let msg = ChatMessage::human("Hello");
        assert_eq!(msg.role, Role::Human);
        assert_eq!(msg.content, "Hello");

        let sys = ChatMessage::system("Be concise.");
        assert_eq!(sys.role, Role::System);
    }
}
