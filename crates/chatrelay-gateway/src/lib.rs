//! WebSocket relay gateway.
//!
//! Hosts the `/api/chat/ws` endpoint: reads one user text frame at a time,
//! drives the configured turn handler, and re-encodes its events as the JSON
//! wire protocol until the turn completes or fails. Failures are turn-scoped;
//! the connection stays open for the next message.

pub mod relay;
pub mod server;
pub mod state;

pub use server::start_gateway;
pub use state::GatewayState;
