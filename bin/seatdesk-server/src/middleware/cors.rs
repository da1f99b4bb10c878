use crate::state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    let Some(origins_str) = &state.config.cors_allowed_origins else {
        // Wildcard; set SEATDESK_CORS_ORIGINS in production.
        return CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any);
    };

    let origins: Vec<axum::http::HeaderValue> =
        origins_str.split(',').filter_map(|s| s.trim().parse().ok()).collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any)
    } else {
        // Explicit origins so the session cookie can be sent cross-origin.
        CorsLayer::new()
            .allow_origin(origins)
            .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
            ])
            .allow_credentials(true)
    }
}
