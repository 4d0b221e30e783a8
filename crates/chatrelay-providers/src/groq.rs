//! Groq chat completions provider.
//!
//! Groq exposes an OpenAI-compatible `/v1/chat/completions` API under its
//! `/openai` prefix. Streaming responses are SSE with a `data: [DONE]`
//! terminator; tool calls arrive as indexed deltas that must be accumulated
//! before execution.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, trace};

use crate::sse::{SseEvent, parse_sse_stream};
use crate::{ChatProvider, ChunkStream, CompletionChunk, CompletionRequest, ToolUseChunk};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai";

pub struct GroqProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GroqProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: GROQ_BASE_URL.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API base URL (proxies, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// --- wire types ---

#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct GroqChunk {
    #[serde(default)]
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    #[serde(default)]
    delta: GroqDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GroqDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates one tool call across streaming deltas.
#[derive(Debug, Default, Clone)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn into_chunk(self) -> CompletionChunk {
        CompletionChunk {
            delta: None,
            tool_use: Some(ToolUseChunk {
                id: self.id,
                name: self.name,
                input_json: self.arguments,
            }),
            stop_reason: None,
        }
    }
}

/// Fold a batch of indexed deltas into the accumulator list.
fn apply_tool_deltas(accumulators: &mut Vec<ToolCallAccumulator>, deltas: &[ToolCallDelta]) {
    for delta in deltas {
        if accumulators.len() <= delta.index {
            accumulators.resize_with(delta.index + 1, ToolCallAccumulator::default);
        }
        let acc = &mut accumulators[delta.index];
        if let Some(ref id) = delta.id {
            acc.id = id.clone();
        }
        if let Some(ref function) = delta.function {
            if let Some(ref name) = function.name {
                acc.name = name.clone();
            }
            if let Some(ref arguments) = function.arguments {
                acc.arguments.push_str(arguments);
            }
        }
    }
}

struct GroqStreamState {
    sse: Pin<Box<dyn Stream<Item = anyhow::Result<SseEvent>> + Send>>,
    accumulators: Vec<ToolCallAccumulator>,
    pending: VecDeque<CompletionChunk>,
    finished: bool,
}

impl GroqStreamState {
    /// Move completed tool calls into the pending queue, optionally followed
    /// by a stop-reason chunk.
    fn flush(&mut self, stop_reason: Option<String>) {
        for acc in self.accumulators.drain(..) {
            if !acc.name.is_empty() {
                self.pending.push_back(acc.into_chunk());
            }
        }
        if let Some(reason) = stop_reason {
            self.pending.push_back(CompletionChunk {
                stop_reason: Some(reason),
                ..Default::default()
            });
        }
    }
}

#[async_trait]
impl ChatProvider for GroqProvider {
    fn id(&self) -> &str {
        "groq"
    }

    async fn stream(&self, request: &CompletionRequest) -> anyhow::Result<ChunkStream> {
        // The system prompt rides as the leading wire message
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(ref system) = request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.extend(request.messages.iter().cloned());

        let body = GroqRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            stream: true,
            temperature: request.temperature,
            tools: request.tools.clone(),
        };

        debug!(model = %body.model, base_url = %self.base_url, "Streaming Groq chat completion");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Groq API error {status}: {body}");
        }

        let state = GroqStreamState {
            sse: Box::pin(parse_sse_stream(response)),
            accumulators: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        let chunks = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    return Some((Ok(chunk), state));
                }
                if state.finished {
                    return None;
                }

                match state.sse.next().await {
                    Some(Ok(event)) => {
                        let data = event.data.trim();
                        if data == "[DONE]" {
                            state.finished = true;
                            state.flush(None);
                            continue;
                        }

                        let chunk: GroqChunk = match serde_json::from_str(data) {
                            Ok(c) => c,
                            Err(e) => {
                                trace!(%e, data, "Skipping unparseable Groq chunk");
                                continue;
                            }
                        };
                        let Some(choice) = chunk.choices.into_iter().next() else {
                            continue;
                        };

                        if let Some(ref deltas) = choice.delta.tool_calls {
                            apply_tool_deltas(&mut state.accumulators, deltas);
                        }

                        if let Some(reason) = choice.finish_reason {
                            state.flush(Some(reason));
                        }

                        if let Some(content) = choice.delta.content {
                            if !content.is_empty() {
                                return Some((
                                    Ok(CompletionChunk {
                                        delta: Some(content),
                                        ..Default::default()
                                    }),
                                    state,
                                ));
                            }
                        }
                    }
                    Some(Err(e)) => return Some((Err(e), state)),
                    None => {
                        // Stream ended without [DONE]; surface whatever was
                        // accumulated.
                        state.finished = true;
                        state.flush(None);
                    }
                }
            }
        });

        Ok(Box::pin(chunks))
    }
}
