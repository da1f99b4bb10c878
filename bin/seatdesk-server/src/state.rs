//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use seatdesk_core::PocketBaseClient;

use crate::config::Config;
use crate::session::SessionStore;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Unauthenticated record store client; sessions derive authorized copies.
    pub store: PocketBaseClient,
    /// Logged-in sessions.
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: Config, store: PocketBaseClient) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_ttl_secs));
        Self { config: Arc::new(config), store, sessions }
    }
}
