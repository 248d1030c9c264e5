//! Shared application state for the HTTP API.

use fabula_core::Engine;

/// State handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Every use-case service, wired to one store.
    pub engine: Engine,
}

impl AppState {
    /// Wrap an engine.
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }
}
