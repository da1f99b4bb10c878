//! Console routes. Every handler here runs behind the login gate and acts on
//! the caller's own listing state.

mod records;
mod selection;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use seatdesk_core::CollectionName;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::console::{CadenceOption, CollectionsView};
use crate::session::Session;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(list_collections), components(schemas(CollectionsView, CadenceOption)))]
pub struct CollectionsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/collections", get(list_collections))
        .merge(records::router())
        .merge(selection::router())
}

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut api = CollectionsApi::openapi();
    api.merge(records::RecordsApi::openapi());
    api.merge(selection::SelectionApi::openapi());
    api
}

/// Parse a collection name and check it is one the console is allowed to show.
fn resolve_collection(state: &AppState, raw: &str) -> Result<CollectionName, ServerError> {
    let name = CollectionName::new(raw.trim())?;
    if !state.config.is_allowed_collection(&name) {
        return Err(ServerError::BadRequest(format!("unknown collection '{name}'")));
    }
    Ok(name)
}

#[utoipa::path(
    get,
    path = "/console/collections",
    tag = "console",
    responses(
        (status = 200, description = "Selectable collections and cadences", body = CollectionsView),
        (status = 401, description = "Login required"),
    )
)]
pub async fn list_collections(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<Session>>,
) -> Result<Json<CollectionsView>, ServerError> {
    let active = session.listing.lock().await.collection().to_string();
    Ok(Json(CollectionsView {
        collections: state.config.collections.iter().map(ToString::to_string).collect(),
        active,
        cadences: CadenceOption::all(),
    }))
}
