//! Turn handling — one polymorphic capability over "plain LLM" and
//! "tool-calling agent".
//!
//! A [`TurnHandler`] takes one user input string and yields a lazy sequence
//! of typed [`TurnEvent`]s; the gateway relay re-encodes those as wire
//! events. Which variant runs is selected once at startup configuration
//! ([`chatrelay_core::config::TurnMode`]).

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio_stream::StreamExt;

pub mod executor;
pub mod llm;

pub use executor::AgentTurnHandler;
pub use llm::LlmTurnHandler;

/// A typed sub-event produced while a turn streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// One incremental fragment of model text, in generation order.
    Token { text: String },

    /// A human-readable tool invocation label.
    Thought { label: String },
}

pub type TurnStream = Pin<Box<dyn Stream<Item = anyhow::Result<TurnEvent>> + Send>>;

/// One turn-handling capability.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    /// Informational status label emitted once before work begins, if any.
    fn status_note(&self) -> Option<&str> {
        None
    }

    /// Stream one turn for `input`. The stream is finite; the first `Err`
    /// item ends the turn.
    async fn stream_turn(&self, input: &str) -> anyhow::Result<TurnStream>;

    /// Run one turn to completion and return the concatenated answer text.
    /// Used by the non-streaming path.
    async fn run_turn(&self, input: &str) -> anyhow::Result<String> {
        let mut stream = self.stream_turn(input).await?;
        let mut answer = String::new();
        while let Some(event) = stream.next().await {
            if let TurnEvent::Token { text } = event? {
                answer.push_str(&text);
            }
        }
        Ok(answer)
    }
}
