//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to a JSON-body
//! HTTP response with an appropriate status code.
//!
//! Record store and internal failures are logged with full detail but only a
//! generic message is returned to the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use seatdesk_core::SeatError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Path of the login endpoint advertised to unauthenticated callers.
pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Error)]
pub enum ServerError {
    /// Rejected input; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No valid session, or the store refused the session's token.
    #[error("unauthorised: {0}")]
    Unauthorised(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// The record store could not be reached or failed.
    #[error("record store error: {0}")]
    Upstream(SeatError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SeatError> for ServerError {
    fn from(e: SeatError) -> Self {
        match e {
            SeatError::Validation(m) => ServerError::Validation(m),
            SeatError::NotFound(id) => ServerError::NotFound(format!("record {id} not found")),
            SeatError::Store { status: 400 | 422, message } => ServerError::Validation(message),
            SeatError::Store { status: 401 | 403, message } => ServerError::Unauthorised(message),
            SeatError::Config(m) => ServerError::Internal(m),
            other => ServerError::Upstream(other),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::Unauthorised(m) => {
                let body = json!({ "error": m, "login": LOGIN_PATH });
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            ServerError::Upstream(e) => {
                error!(error = %e, "record store error");
                (StatusCode::BAD_GATEWAY, "record store unavailable".to_owned())
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}
