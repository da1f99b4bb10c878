//! Login sessions.
//!
//! A session is created by a successful password login against the record
//! store. It holds the store token (never sent back to the browser), the
//! authenticated account and the console's listing state for that login.
//! Sessions live in memory and are lost on restart.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use seatdesk_core::{AuthRecord, AuthResponse, CollectionName, ListingController, PocketBaseClient};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "seatdesk_session";

#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub user: AuthRecord,
    token: String,
    pub expires_at: DateTime<Utc>,
    /// Listing, search and selection state of this login.
    pub listing: Mutex<ListingController>,
}

impl Session {
    /// Token present and not expired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && self.expires_at > now
    }

    /// The shared store client, acting as this session's user.
    pub fn gateway(&self, store: &PocketBaseClient) -> PocketBaseClient {
        store.authorized(self.token.as_str())
    }
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    fallback_ttl: Duration,
}

impl SessionStore {
    pub fn new(fallback_ttl_secs: i64) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), fallback_ttl: Duration::seconds(fallback_ttl_secs) }
    }

    /// Register a fresh login and return its session. Expired sessions that
    /// were never presented again are dropped here.
    pub fn open(&self, auth: AuthResponse, collection: CollectionName, now: DateTime<Utc>) -> Arc<Session> {
        let expires_at = token_expiry(&auth.token).unwrap_or(now + self.fallback_ttl);
        let session = Arc::new(Session {
            id: Uuid::new_v4().to_string(),
            user: auth.record,
            token: auth.token,
            expires_at,
            listing: Mutex::new(ListingController::new(collection)),
        });
        info!(user = %session.user.id, %expires_at, "session opened");

        let mut map = self.write();
        let before = map.len();
        map.retain(|_, s| s.is_valid(now));
        if map.len() < before {
            debug!(dropped = before - map.len(), "expired sessions swept");
        }
        map.insert(session.id.clone(), Arc::clone(&session));
        session
    }

    /// Look up a session, dropping it if it has expired.
    pub fn get_valid(&self, id: &str, now: DateTime<Utc>) -> Option<Arc<Session>> {
        let session = self.read().get(id).cloned()?;
        if session.is_valid(now) {
            return Some(session);
        }
        debug!(session = %id, "session expired");
        self.clear(id);
        None
    }

    /// Forget a session. Returns `true` if it existed.
    pub fn clear(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    // A poisoned lock only means a handler panicked mid-update; the map is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Expiry from the `exp` claim of a JWT, without verifying the signature.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

/// Session id from `Authorization: Bearer <id>` or the session cookie.
pub fn session_id_from_headers(headers: &http::HeaderMap) -> Option<String> {
    let bearer = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(id) = bearer {
        return Some(id.to_owned());
    }
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_owned())
}

/// `Set-Cookie` value for a session id; an empty id expires the cookie.
pub fn session_cookie(id: &str) -> String {
    if id.is_empty() {
        format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    } else {
        format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
    }
}

/// Build an unsigned JWT-shaped token expiring at `exp`.
#[cfg(test)]
pub fn fake_token(exp: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(serde_json::json!({ "id": "u1", "exp": exp.timestamp() }).to_string());
    format!("{header}.{claims}.signature")
}
