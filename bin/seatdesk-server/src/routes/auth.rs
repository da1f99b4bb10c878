//! Password login against the record store's auth collection.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use seatdesk_core::SeatError;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::auth::{LoginRequest, SessionResponse, SessionStatus, UserResponse};
use crate::session::{session_cookie, session_id_from_headers};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(login, logout, session_status),
    components(schemas(LoginRequest, SessionResponse, SessionStatus, UserResponse))
)]
pub struct AuthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session_status))
}

/// Log in with the store account's identity and password.
///
/// A caller that already holds a valid session gets that session back and
/// no login is attempted.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; sets the session cookie", body = SessionResponse),
        (status = 400, description = "Missing identity or password"),
        (status = 401, description = "Wrong identity or password"),
        (status = 502, description = "Record store unavailable"),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ServerError> {
    let now = Utc::now();
    if let Some(existing) = session_id_from_headers(&headers).and_then(|id| state.sessions.get_valid(&id, now)) {
        return Ok(Json(existing.to_response(true)).into_response());
    }

    let identity = req.identity.trim();
    if identity.is_empty() || req.password.is_empty() {
        return Err(ServerError::Validation("identity and password are required".into()));
    }

    let auth = state
        .store
        .auth_with_password(&state.config.auth_collection, identity, &req.password)
        .await
        .map_err(|e| match e {
            SeatError::Store { status: 400 | 401 | 403, .. } => {
                info!(identity, "login rejected");
                ServerError::Unauthorised("invalid identity or password".into())
            }
            other => ServerError::from(other),
        })?;

    let session = state.sessions.open(auth, state.config.default_collection().clone(), now);
    let cookie = session_cookie(&session.id);
    Ok(([(header::SET_COOKIE, cookie)], Json(session.to_response(false))).into_response())
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session cleared; expires the cookie", body = SessionStatus),
    )
)]
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id_from_headers(&headers) {
        if state.sessions.clear(&id) {
            info!("session closed");
        }
    }
    let body = SessionStatus { valid: false, user: None, expires_at: None };
    ([(header::SET_COOKIE, session_cookie(""))], Json(body)).into_response()
}

#[utoipa::path(
    get,
    path = "/auth/session",
    tag = "auth",
    responses(
        (status = 200, description = "Whether the caller is logged in", body = SessionStatus),
    )
)]
pub async fn session_status(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<SessionStatus> {
    let session = session_id_from_headers(&headers).and_then(|id| state.sessions.get_valid(&id, Utc::now()));
    Json(match session {
        Some(s) => SessionStatus {
            valid: true,
            user: Some(UserResponse::from(&s.user)),
            expires_at: Some(s.expires_at.to_rfc3339()),
        },
        None => SessionStatus { valid: false, user: None, expires_at: None },
    })
}
