//! Plain-LLM turn handler: no tools, one provider call per turn.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_stream::StreamExt;

use chatrelay_core::config::Config;
use chatrelay_core::types::ChatMessage;
use chatrelay_providers::{ChatProvider, CompletionRequest, wire_messages};

use crate::{TurnEvent, TurnHandler, TurnStream};

/// Status label sent before a plain-LLM turn begins.
const STATUS_NOTE: &str = "consulting_tool";

pub struct LlmTurnHandler {
    provider: Arc<dyn ChatProvider>,
    model: String,
    max_tokens: u32,
    temperature: f64,
    system_prompt: String,
}

impl LlmTurnHandler {
    pub fn new(provider: Arc<dyn ChatProvider>, config: &Config) -> Self {
        Self {
            provider,
            model: config.provider.model.clone(),
            max_tokens: config.provider.max_tokens,
            temperature: config.provider.temperature,
            system_prompt: config.system_prompt().to_string(),
        }
    }
}

#[async_trait]
impl TurnHandler for LlmTurnHandler {
    fn status_note(&self) -> Option<&str> {
        Some(STATUS_NOTE)
    }

    async fn stream_turn(&self, input: &str) -> anyhow::Result<TurnStream> {
        // Context is rebuilt fresh per turn: system prompt plus the received
        // text as the sole human message.
        let context = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::human(input),
        ];

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: wire_messages(&context),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            tools: None,
            system: None,
        };

        let chunks = self.provider.stream(&request).await?;
        let events = chunks.filter_map(|chunk| match chunk {
            Ok(c) => c
                .delta
                .filter(|d| !d.is_empty())
                .map(|text| Ok(TurnEvent::Token { text })),
            Err(e) => Some(Err(e)),
        });
        Ok(Box::pin(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedProvider, stop, token};

    fn handler(scripts: Vec<Vec<anyhow::Result<chatrelay_providers::CompletionChunk>>>) -> (Arc<ScriptedProvider>, LlmTurnHandler) {
        let provider = Arc::new(ScriptedProvider::new(scripts));
        let handler = LlmTurnHandler::new(provider.clone(), &Config::default());
        (provider, handler)
    }

    #[tokio::test]
    async fn test_tokens_forwarded_in_order() {
        let (_, handler) = handler(vec![vec![
            token("Hel"),
            token("lo"),
            token(" world"),
            stop("stop"),
        ]]);

        let mut stream = handler.stream_turn("Hello").await.unwrap();
        let mut texts = Vec::new();
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                TurnEvent::Token { text } => texts.push(text),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(texts, vec!["Hel", "lo", " world"]);
    }

    #[tokio::test]
    async fn test_request_context_is_system_plus_human() {
        let (provider, handler) = handler(vec![vec![stop("stop")]]);
        let _ = handler.run_turn("What is Rust?").await.unwrap();

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "What is Rust?");
    }

    #[tokio::test]
    async fn test_error_mid_stream_surfaces_after_tokens() {
        let (_, handler) = handler(vec![vec![
            token("a"),
            token("b"),
            Err(anyhow::anyhow!("rate limited")),
        ]]);

        let mut stream = handler.stream_turn("hi").await.unwrap();
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            TurnEvent::Token { .. }
        ));
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            TurnEvent::Token { .. }
        ));
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_run_turn_concatenates() {
        let (_, handler) = handler(vec![vec![token("Hel"), token("lo"), stop("stop")]]);
        let answer = handler.run_turn("hi").await.unwrap();
        assert_eq!(answer, "Hello");
    }

    #[tokio::test]
    async fn test_status_note_present_in_plain_mode() {
        let (_, handler) = handler(vec![]);
        assert_eq!(handler.status_note(), Some("consulting_tool"));
    }
}
