use seatdesk_core::AuthRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::Session;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email of the store account.
    pub identity: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Opaque session id; send as `Authorization: Bearer <id>` or rely on
    /// the `seatdesk_session` cookie.
    pub session_id: String,
    pub user: UserResponse,
    pub expires_at: String,
    /// `true` when the caller was already logged in and no new login happened.
    pub already_authenticated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionStatus {
    pub valid: bool,
    pub user: Option<UserResponse>,
    pub expires_at: Option<String>,
}

impl From<&AuthRecord> for UserResponse {
    fn from(r: &AuthRecord) -> Self {
        UserResponse { id: r.id.clone(), username: r.username.clone(), email: r.email.clone() }
    }
}

impl Session {
    pub fn to_response(&self, already_authenticated: bool) -> SessionResponse {
        SessionResponse {
            session_id: self.id.clone(),
            user: UserResponse::from(&self.user),
            expires_at: self.expires_at.to_rfc3339(),
            already_authenticated,
        }
    }
}
