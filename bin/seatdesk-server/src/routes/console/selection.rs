//! Row selection and bulk delete.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::console::{BulkDeleteResponse, FailureView, SelectionUpdate, SelectionView};
use crate::session::Session;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_selection, update_selection, clear_selection, delete_selected),
    components(schemas(SelectionUpdate, SelectionView, BulkDeleteResponse, FailureView))
)]
pub struct SelectionApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/selection", get(get_selection).put(update_selection).delete(clear_selection))
        .route("/selection/delete", post(delete_selected))
}

/// Selected ids of the active collection, including rows on other pages.
/// `text` holds them newline-joined for copying.
#[utoipa::path(
    get,
    path = "/console/selection",
    tag = "console",
    responses(
        (status = 200, description = "Current selection", body = SelectionView),
        (status = 401, description = "Login required"),
    )
)]
pub async fn get_selection(Extension(session): Extension<Arc<Session>>) -> Json<SelectionView> {
    let listing = session.listing.lock().await;
    Json(SelectionView::from_listing(&listing))
}

/// Toggle ids, or every row of the visible page with `all_on_page`.
#[utoipa::path(
    put,
    path = "/console/selection",
    tag = "console",
    request_body = SelectionUpdate,
    responses(
        (status = 200, description = "Updated selection", body = SelectionView),
        (status = 401, description = "Login required"),
    )
)]
pub async fn update_selection(
    Extension(session): Extension<Arc<Session>>,
    Json(update): Json<SelectionUpdate>,
) -> Json<SelectionView> {
    let mut listing = session.listing.lock().await;
    if let Some(all) = update.all_on_page {
        listing.set_page_selected(all);
    }
    for id in update.ids.iter().filter(|id| !id.trim().is_empty()) {
        listing.set_selected(id, update.selected);
    }
    Json(SelectionView::from_listing(&listing))
}

#[utoipa::path(
    delete,
    path = "/console/selection",
    tag = "console",
    responses(
        (status = 200, description = "Selection cleared", body = SelectionView),
        (status = 401, description = "Login required"),
    )
)]
pub async fn clear_selection(Extension(session): Extension<Arc<Session>>) -> Json<SelectionView> {
    let mut listing = session.listing.lock().await;
    listing.clear_selection();
    Json(SelectionView::from_listing(&listing))
}

/// Delete every selected record concurrently.
///
/// Each id gets its own outcome. Deleted ids leave the selection, failed
/// ones stay selected for a retry, and the listing is reloaded.
#[utoipa::path(
    post,
    path = "/console/selection/delete",
    tag = "console",
    responses(
        (status = 200, description = "Per-id outcome", body = BulkDeleteResponse),
        (status = 400, description = "Nothing selected"),
        (status = 401, description = "Login required"),
    )
)]
pub async fn delete_selected(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<Session>>,
) -> Result<Json<BulkDeleteResponse>, ServerError> {
    let gateway = session.gateway(&state.store);
    let mut listing = session.listing.lock().await;
    if listing.selected_count() == 0 {
        return Err(ServerError::BadRequest("no records selected".into()));
    }

    let report = listing.delete_selected(&gateway).await;
    info!(
        collection = %listing.collection(),
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "bulk delete finished"
    );
    Ok(Json(BulkDeleteResponse::new(&report, &listing, Utc::now())))
}
