//! Per-connection relay loop.
//!
//! Each connection owns one cooperative loop:
//! `WAIT_FOR_MESSAGE → STREAMING → WAIT_FOR_MESSAGE` on success,
//! `… → ERRORED → WAIT_FOR_MESSAGE` on a turn failure, and `DISCONNECTED`
//! terminal from either state. Turn failures never close the connection;
//! a client disconnect mid-stream aborts the in-flight turn.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chatrelay_agent::TurnEvent;
use chatrelay_core::protocol::StreamEvent;

use crate::state::GatewayState;

/// What a finished turn means for the connection loop.
enum TurnOutcome {
    /// `stream_end` sent; wait for the next message.
    Completed,
    /// `error` sent; the failure is turn-scoped, keep the connection.
    Errored,
    /// Client went away; stop the loop.
    Disconnected,
}

/// Handle one chat WebSocket connection for its whole lifetime.
pub async fn handle_chat_socket(state: Arc<GatewayState>, socket: WebSocket) {
    let conn_id = Uuid::new_v4();
    state.connection_opened();
    info!(%conn_id, "Chat client connected");

    let (mut sink, mut source) = socket.split();
    let idle_timeout = state.config.idle_timeout();

    loop {
        let input = match tokio::time::timeout(idle_timeout, source.next()).await {
            Err(_) => {
                info!(%conn_id, "Closing idle connection");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(%conn_id, %e, "Receive error");
                break;
            }
            Ok(Some(Ok(Message::Text(text)))) => text.to_string(),
            Ok(Some(Ok(Message::Close(_)))) => {
                debug!(%conn_id, "Client requested close");
                break;
            }
            // Binary frames are not part of the protocol; the transport
            // answers ping/pong itself.
            Ok(Some(Ok(_))) => continue,
        };

        match relay_turn(&state, &mut sink, &mut source, conn_id, &input).await {
            TurnOutcome::Completed | TurnOutcome::Errored => continue,
            TurnOutcome::Disconnected => break,
        }
    }

    state.connection_closed();
    info!(%conn_id, "Chat client disconnected");
}

/// Run one turn: emit the event sequence for `input` onto the socket.
async fn relay_turn(
    state: &Arc<GatewayState>,
    sink: &mut SplitSink<WebSocket, Message>,
    source: &mut SplitStream<WebSocket>,
    conn_id: Uuid,
    input: &str,
) -> TurnOutcome {
    let handler = &state.handler;

    if let Some(note) = handler.status_note() {
        if !send_event(sink, &StreamEvent::status(note)).await {
            return TurnOutcome::Disconnected;
        }
    }
    if !send_event(sink, &StreamEvent::StreamStart).await {
        return TurnOutcome::Disconnected;
    }

    let mut stream = match handler.stream_turn(input).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(%conn_id, %e, "Turn setup failed");
            return emit_error(sink, &e.to_string()).await;
        }
    };

    let turn_timeout = tokio::time::sleep(state.config.turn_timeout());
    tokio::pin!(turn_timeout);

    loop {
        tokio::select! {
            event = stream.next() => match event {
                Some(Ok(TurnEvent::Token { text })) => {
                    if !send_event(sink, &StreamEvent::token(text)).await {
                        return TurnOutcome::Disconnected;
                    }
                }
                Some(Ok(TurnEvent::Thought { label })) => {
                    if !send_event(sink, &StreamEvent::thought(label)).await {
                        return TurnOutcome::Disconnected;
                    }
                }
                Some(Err(e)) => {
                    warn!(%conn_id, %e, "Turn failed mid-stream");
                    return emit_error(sink, &e.to_string()).await;
                }
                None => {
                    if !send_event(sink, &StreamEvent::StreamEnd).await {
                        return TurnOutcome::Disconnected;
                    }
                    return TurnOutcome::Completed;
                }
            },
            // Watch the receive half so a disconnect aborts the in-flight
            // turn: returning drops `stream`, which cancels the provider call.
            frame = source.next() => match frame {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                    debug!(%conn_id, "Client left mid-stream, aborting turn");
                    return TurnOutcome::Disconnected;
                }
                Some(Ok(Message::Text(_))) => {
                    // Strictly one turn at a time
                    debug!(%conn_id, "Ignoring message received mid-turn");
                }
                Some(Ok(_)) => {}
            },
            _ = &mut turn_timeout => {
                warn!(%conn_id, "Turn timed out");
                return emit_error(sink, "turn timed out").await;
            }
        }
    }
}

async fn send_event(sink: &mut SplitSink<WebSocket, Message>, event: &StreamEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(%e, "Failed to encode event");
            false
        }
    }
}

/// A turn failure becomes exactly one `error` event; no `stream_end` follows.
async fn emit_error(sink: &mut SplitSink<WebSocket, Message>, message: &str) -> TurnOutcome {
    if send_event(sink, &StreamEvent::error(format!("LLM Error: {message}"))).await {
        TurnOutcome::Errored
    } else {
        TurnOutcome::Disconnected
    }
}
