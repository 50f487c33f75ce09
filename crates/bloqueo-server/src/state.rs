//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use bloqueo_core::Orchestrator;

use crate::config::Config;

pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
}
