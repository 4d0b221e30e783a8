//! LLM provider abstraction.
//!
//! Providers implement [`ChatProvider`] to stream chat completions from a
//! hosted LLM API. chatrelay ships the Groq client; the trait is the seam
//! that keeps the relay testable against scripted fakes.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use chatrelay_core::types::{ChatMessage, Role};

pub mod groq;
pub mod sse;

pub use groq::GroqProvider;

/// A request for one streaming chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    /// Wire-format messages (see [`wire_messages`]).
    pub messages: Vec<serde_json::Value>,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub tools: Option<Vec<serde_json::Value>>,
    pub system: Option<String>,
}

/// A streamed chunk from the LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionChunk {
    pub delta: Option<String>,
    pub tool_use: Option<ToolUseChunk>,
    pub stop_reason: Option<String>,
}

/// A complete tool call assembled from streaming deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUseChunk {
    pub id: String,
    pub name: String,
    pub input_json: String,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = anyhow::Result<CompletionChunk>> + Send>>;

/// The provider capability consumed by turn handlers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider identifier (e.g., "groq").
    fn id(&self) -> &str;

    /// Stream a chat completion. The stream is finite, yields fragments in
    /// generation order, and surfaces the first failure immediately.
    async fn stream(&self, request: &CompletionRequest) -> anyhow::Result<ChunkStream>;
}

/// Map turn-context messages to OpenAI-style wire values.
pub fn wire_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::Human => "user",
                Role::ToolOutput => "tool",
            };
            serde_json::json!({ "role": role, "content": m.content })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_messages_role_mapping() {
        let messages = vec![
            ChatMessage::system("Be concise."),
            ChatMessage::human("Hello"),
        ];
        let wire = wire_messages(&messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[0]["content"], "Be concise.");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[1]["content"], "Hello");
    }

    #[test]
    fn test_wire_messages_tool_output() {
        let wire = wire_messages(&[ChatMessage::tool_output("42 sessions")]);
        assert_eq!(wire[0]["role"], "tool");
        assert_eq!(wire[0]["content"], "42 sessions");
    }
}
