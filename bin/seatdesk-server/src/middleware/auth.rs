//! Login gate for the console routes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::error::ServerError;
use crate::session::session_id_from_headers;
use crate::state::AppState;

/// Admit requests carrying a valid session and attach it as an extension.
pub async fn require_session(State(state): State<Arc<AppState>>, mut req: Request<Body>, next: Next) -> Response {
    let session = session_id_from_headers(req.headers()).and_then(|id| state.sessions.get_valid(&id, Utc::now()));
    match session {
        Some(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        None => ServerError::Unauthorised("login required".into()).into_response(),
    }
}
