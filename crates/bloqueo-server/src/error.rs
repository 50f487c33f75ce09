//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body of the form
//! `{"error": "..."}` with a matching status code.
//!
//! Internal errors carry the raw error text to the caller. That leaks
//! storage details and is a known hardening gap of this internal tool.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bloqueo_core::{BloqueoError, ErrorKind};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Anything unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<BloqueoError> for ServerError {
    fn from(e: BloqueoError) -> Self {
        match e.kind() {
            ErrorKind::Validation => ServerError::BadRequest(e.to_string()),
            ErrorKind::NotFound => ServerError::NotFound(e.to_string()),
            ErrorKind::Storage => ServerError::Internal(e.to_string()),
        }
    }
}
