//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - health / heartbeat route
//! - task routes under `/api`, named after the deployed function endpoints
//! - request tracing via `TraceLayer`

mod health;
mod tasks;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api", tasks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
