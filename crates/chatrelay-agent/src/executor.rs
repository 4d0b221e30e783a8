//! Agent turn execution — provider streaming plus the tool-calling loop.
//!
//! The reasoning engine is the hosted model itself: each loop iteration
//! streams a completion with tool definitions attached, executes whatever
//! tool calls the model settled on, feeds the observations back, and goes
//! around again until the model stops asking for tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use chatrelay_core::config::Config;
use chatrelay_core::types::ChatMessage;
use chatrelay_providers::{
    ChatProvider, CompletionRequest, ToolUseChunk, wire_messages,
};
use chatrelay_tools::ToolRegistry;

use crate::{TurnEvent, TurnHandler, TurnStream};

/// OpenAI-compatible stop reason signalling pending tool calls.
const TOOL_CALLS_STOP: &str = "tool_calls";

pub struct AgentTurnHandler {
    provider: Arc<dyn ChatProvider>,
    tools: Arc<ToolRegistry>,
    model: String,
    max_tokens: u32,
    temperature: f64,
    system_prompt: String,
    max_tool_iterations: u32,
}

impl AgentTurnHandler {
    pub fn new(provider: Arc<dyn ChatProvider>, tools: Arc<ToolRegistry>, config: &Config) -> Self {
        Self {
            provider,
            tools,
            model: config.provider.model.clone(),
            max_tokens: config.provider.max_tokens,
            temperature: config.provider.temperature,
            system_prompt: config.system_prompt().to_string(),
            max_tool_iterations: config.agent.max_tool_iterations,
        }
    }
}

#[async_trait]
impl TurnHandler for AgentTurnHandler {
    // Agent mode sends no status note: the turn goes straight to stream_start.

    async fn stream_turn(&self, input: &str) -> anyhow::Result<TurnStream> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let loop_ctx = LoopContext {
            provider: self.provider.clone(),
            tools: self.tools.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_prompt: self.system_prompt.clone(),
            max_tool_iterations: self.max_tool_iterations,
        };
        let input = input.to_string();

        // Events flow through the channel so the loop can span several
        // provider calls while the consumer sees one lazy stream. A dropped
        // receiver (client gone) fails the next send and stops the loop.
        tokio::spawn(async move {
            run_agent_loop(loop_ctx, &input, event_tx).await;
        });

        Ok(Box::pin(UnboundedReceiverStream::new(event_rx)))
    }
}

struct LoopContext {
    provider: Arc<dyn ChatProvider>,
    tools: Arc<ToolRegistry>,
    model: String,
    max_tokens: u32,
    temperature: f64,
    system_prompt: String,
    max_tool_iterations: u32,
}

type EventSender = mpsc::UnboundedSender<anyhow::Result<TurnEvent>>;

async fn run_agent_loop(ctx: LoopContext, input: &str, event_tx: EventSender) {
    let mut messages = wire_messages(&[ChatMessage::human(input)]);

    for iteration in 0..ctx.max_tool_iterations {
        debug!(iteration, "Agent loop iteration");

        let request = CompletionRequest {
            model: ctx.model.clone(),
            messages: messages.clone(),
            max_tokens: ctx.max_tokens,
            temperature: Some(ctx.temperature),
            tools: Some(ctx.tools.to_llm_tools()),
            system: Some(ctx.system_prompt.clone()),
        };

        let mut stream = match ctx.provider.stream(&request).await {
            Ok(s) => s,
            Err(e) => {
                let _ = event_tx.send(Err(e));
                return;
            }
        };

        let mut response_text = String::new();
        let mut tool_uses: Vec<ToolUseChunk> = Vec::new();
        let mut stop_reason: Option<String> = None;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(c) => {
                    if let Some(delta) = c.delta {
                        if !delta.is_empty() {
                            response_text.push_str(&delta);
                            if event_tx.send(Ok(TurnEvent::Token { text: delta })).is_err() {
                                return; // consumer gone, abort the turn
                            }
                        }
                    }
                    if let Some(tool_use) = c.tool_use {
                        tool_uses.push(tool_use);
                    }
                    if let Some(reason) = c.stop_reason {
                        stop_reason = Some(reason);
                    }
                }
                Err(e) => {
                    let _ = event_tx.send(Err(e));
                    return;
                }
            }
        }

        let wants_tools = stop_reason.as_deref() == Some(TOOL_CALLS_STOP) && !tool_uses.is_empty();
        if !wants_tools {
            return; // final answer already streamed
        }

        // Record the assistant's tool calls, then each observation, so the
        // next iteration's context pairs them up the way the API requires.
        let mut assistant = json!({ "role": "assistant" });
        if !response_text.is_empty() {
            assistant["content"] = json!(response_text);
        }
        assistant["tool_calls"] = json!(
            tool_uses
                .iter()
                .map(|tu| {
                    json!({
                        "id": tu.id,
                        "type": "function",
                        "function": { "name": tu.name, "arguments": tu.input_json },
                    })
                })
                .collect::<Vec<_>>()
        );
        messages.push(assistant);

        for tool_use in &tool_uses {
            info!(tool = %tool_use.name, "Executing tool");
            let starting = TurnEvent::Thought {
                label: format!("Executing: {}...", tool_use.name),
            };
            if event_tx.send(Ok(starting)).is_err() {
                return;
            }

            let observation = match ctx.tools.get(&tool_use.name) {
                Some(tool) => match tool.invoke(&tool_use.input_json).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(%e, tool = %tool_use.name, "Tool invocation error");
                        format!("Tool error: {e}")
                    }
                },
                None => format!("Unknown tool: {}", tool_use.name),
            };

            let finished = TurnEvent::Thought {
                label: format!("{} finished.", tool_use.name),
            };
            if event_tx.send(Ok(finished)).is_err() {
                return;
            }

            messages.push(json!({
                "role": "tool",
                "tool_call_id": tool_use.id,
                "content": observation,
            }));
        }
        // Next iteration: the model sees the observations.
    }

    warn!(
        max_tool_iterations = ctx.max_tool_iterations,
        "Agent stopped at the tool iteration cap"
    );
}
