//! Gateway shared state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chatrelay_agent::TurnHandler;
use chatrelay_core::config::Config;

/// State shared by all connections. Read-only after construction apart from
/// the live connection counter; connections themselves share nothing.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub handler: Arc<dyn TurnHandler>,
    connections: AtomicUsize,
}

impl GatewayState {
    pub fn new(config: Arc<Config>, handler: Arc<dyn TurnHandler>) -> Self {
        Self {
            config,
            handler,
            connections: AtomicUsize::new(0),
        }
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}
