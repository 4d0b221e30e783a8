//! Chat relay wire protocol.
//!
//! All server communication uses JSON-over-WebSocket. Clients send raw UTF-8
//! text frames, one user message per frame; the server answers each with a
//! deterministic sequence of tagged [`StreamEvent`] frames.

use serde::{Deserialize, Serialize};

/// A server-to-client event frame.
///
/// For any single turn the emitted sequence is exactly
/// `status? stream_start (token | thought)* stream_end`, or any prefix of it
/// terminated by a single `error`. No events follow `stream_end` or `error`
/// until the next client message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Informational note sent once before work begins (plain-LLM mode only).
    Status { content: String },

    /// Marks the beginning of output streaming.
    StreamStart,

    /// One incremental text fragment, delivered in generation order.
    Token { content: String },

    /// Human-readable label for a tool invocation boundary (agent mode only).
    Thought { content: String },

    /// Marks turn completion. Exactly one per successful turn.
    StreamEnd,

    /// Terminal for the turn; replaces `stream_end` when generation fails.
    Error { content: String },
}

impl StreamEvent {
    pub fn status(content: impl Into<String>) -> Self {
        Self::Status { content: content.into() }
    }

    pub fn token(content: impl Into<String>) -> Self {
        Self::Token { content: content.into() }
    }

    pub fn thought(content: impl Into<String>) -> Self {
        Self::Thought { content: content.into() }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error { content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_variants_serialize_bare() {
        assert_eq!(
            serde_json::to_string(&StreamEvent::StreamStart).unwrap(),
            r#"{"type":"stream_start"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::StreamEnd).unwrap(),
            r#"{"type":"stream_end"}"#
        );
    }

    #[test]
    fn test_content_variants_serialize() {
        assert_eq!(
            serde_json::to_string(&StreamEvent::status("consulting_tool")).unwrap(),
            r#"{"type":"status","content":"consulting_tool"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::token("Hel")).unwrap(),
            r#"{"type":"token","content":"Hel"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::thought("Executing: fetch_analytics_data...")).unwrap(),
            r#"{"type":"thought","content":"Executing: fetch_analytics_data..."}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::error("LLM Error: boom")).unwrap(),
            r#"{"type":"error","content":"LLM Error: boom"}"#
        );
    }

    #[test]
    fn test_roundtrip() {
        let frames = vec![
            StreamEvent::status("consulting_tool"),
            StreamEvent::StreamStart,
            StreamEvent::token("hi"),
            StreamEvent::thought("Executing: fetch_analytics_data..."),
            StreamEvent::StreamEnd,
            StreamEvent::error("boom"),
        ];
        for frame in frames {
            let json = serde_json::to_string(&frame).unwrap();
            let back: StreamEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(back, frame);
        }
    }
}
