//! Server configuration, loaded from environment variables at startup.

use seatdesk_core::collection::parse_collection_list;
use seatdesk_core::forms::DEFAULT_MAX_BATCH;
use seatdesk_core::{CollectionName, SeatError};

/// Runtime configuration for seatdesk-server.
///
/// Every field has a default so the server starts without any environment
/// variables set, pointing at a PocketBase on localhost.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Base URL of the PocketBase record store.
    pub pocketbase_url: String,

    /// Auth collection used for password login (default: `"users"`).
    pub auth_collection: CollectionName,

    /// Selectable record collections; the first one is active by default.
    pub collections: Vec<CollectionName>,

    /// Largest `count` accepted by batch create.
    pub max_batch: i64,

    /// Session lifetime used when the store token has no readable `exp`.
    pub session_ttl_secs: i64,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, SeatError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from any key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, SeatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let flag = |key: &str, default: bool| {
            lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(default)
        };

        Ok(Self {
            bind_address: get("SEATDESK_BIND", "0.0.0.0:3000"),
            pocketbase_url: get("SEATDESK_POCKETBASE_URL", "http://127.0.0.1:8090"),
            auth_collection: CollectionName::new(get("SEATDESK_AUTH_COLLECTION", "users"))?,
            collections: parse_collection_list(&get("SEATDESK_COLLECTIONS", "baidu_edu_users"))?,
            max_batch: parse_or(lookup("SEATDESK_MAX_BATCH"), DEFAULT_MAX_BATCH).max(1),
            session_ttl_secs: parse_or(lookup("SEATDESK_SESSION_TTL_SECS"), 1_209_600).clamp(60, 31_536_000),
            log_level: get("SEATDESK_LOG", "info"),
            log_json: flag("SEATDESK_LOG_JSON", false),
            cors_allowed_origins: lookup("SEATDESK_CORS_ORIGINS").filter(|s| !s.trim().is_empty()),
            enable_swagger: flag("SEATDESK_ENABLE_SWAGGER", true),
        })
    }

    /// The collection a new session starts on.
    pub fn default_collection(&self) -> &CollectionName {
        // `parse_collection_list` never returns an empty list.
        &self.collections[0]
    }

    pub fn is_allowed_collection(&self, name: &CollectionName) -> bool {
        self.collections.contains(name)
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
