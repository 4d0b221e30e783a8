//! SSE (Server-Sent Events) decoding for streaming API responses.
//!
//! Converts a `reqwest::Response` body into a `Stream` of parsed events,
//! buffering partial lines across network chunks.

use futures::Stream;
use tokio_stream::StreamExt;

/// A parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE field decoder. Network chunks go in via [`Decoder::feed`],
/// complete events come out of [`Decoder::next_event`].
#[derive(Default)]
struct Decoder {
    buffer: String,
    event_name: Option<String>,
    data_lines: Vec<String>,
}

impl Decoder {
    fn feed(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
    }

    /// Consume buffered lines until one complete event is available.
    fn next_event(&mut self) -> Option<SseEvent> {
        while let Some(newline) = self.buffer.find('\n') {
            let line = self.buffer[..newline].trim_end_matches('\r').to_string();
            self.buffer.drain(..=newline);

            if line.is_empty() {
                // Blank line terminates an event
                if let Some(event) = self.take_event() {
                    return Some(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue; // comment
            }
            if let Some(value) = line.strip_prefix("event:") {
                self.event_name = Some(value.trim_start().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data_lines.push(value.trim_start().to_string());
            }
            // id: and unknown fields are ignored
        }
        None
    }

    fn take_event(&mut self) -> Option<SseEvent> {
        if self.data_lines.is_empty() {
            return None;
        }
        Some(SseEvent {
            event: self.event_name.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        })
    }
}

struct SseState {
    body: std::pin::Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
    decoder: Decoder,
    done: bool,
}

/// Parse a reqwest response body as an SSE stream.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> impl Stream<Item = anyhow::Result<SseEvent>> {
    let state = SseState {
        body: Box::pin(response.bytes_stream()),
        decoder: Decoder::default(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.decoder.next_event() {
                return Some((Ok(event), state));
            }
            if state.done {
                return state.decoder.take_event().map(|event| (Ok(event), state));
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    state.decoder.feed(&String::from_utf8_lossy(&chunk));
                }
                Some(Err(e)) => {
                    return Some((Err(anyhow::anyhow!("SSE stream error: {e}")), state));
                }
                None => {
                    // Body ended; terminate any unfinished line so it gets
                    // dispatched, then drain on the next loop pass.
                    state.done = true;
                    if !state.decoder.buffer.is_empty() {
                        state.decoder.feed("\n");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_chunks(chunks: &[&str]) -> Vec<SseEvent> {
        let mut decoder = Decoder::default();
        let mut events = Vec::new();
        for chunk in chunks {
            decoder.feed(chunk);
            while let Some(event) = decoder.next_event() {
                events.push(event);
            }
        }
        // End of body: terminate any unfinished line, then drain.
        if !decoder.buffer.is_empty() {
            decoder.feed("\n");
        }
        while let Some(event) = decoder.next_event() {
            events.push(event);
        }
        if let Some(event) = decoder.take_event() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_single_data_event() {
        let events = decode_chunks(&["data: {\"x\":1}\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"x\":1}");
        assert!(events[0].event.is_none());
    }

    #[test]
    fn test_event_split_across_chunks() {
        let events = decode_chunks(&["data: hel", "lo\n", "\ndata: world\n\n"]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_named_event_and_multiline_data() {
        let events = decode_chunks(&["event: delta\ndata: first\ndata: second\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("delta"));
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn test_comments_and_unknown_fields_skipped() {
        let events = decode_chunks(&[": keepalive\nretry: 100\ndata: ok\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "ok");
    }

    #[test]
    fn test_crlf_lines() {
        let events = decode_chunks(&["data: ok\r\n\r\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "ok");
    }

    #[test]
    fn test_unterminated_event_flushed_at_end() {
        let events = decode_chunks(&["data: tail"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "tail");
    }
}
