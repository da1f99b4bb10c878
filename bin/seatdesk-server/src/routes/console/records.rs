//! Listing, create, batch create and renew.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use seatdesk_core::{BatchCreateForm, CreateForm, RecordGateway};
use tracing::info;
use utoipa::OpenApi;

use super::resolve_collection;
use crate::error::ServerError;
use crate::schemas::console::{
    BatchCreateRequest, BatchCreateResponse, CreateRecordRequest, FailureView, ListingParams, ListingView,
    RecordMutationResponse, RecordRow, RenewPreview, RenewRequest,
};
use crate::session::Session;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_records, create_record, batch_create, renew_record, preview_renewal),
    components(schemas(
        ListingParams,
        ListingView,
        RecordRow,
        CreateRecordRequest,
        BatchCreateRequest,
        BatchCreateResponse,
        FailureView,
        RenewRequest,
        RenewPreview,
        RecordMutationResponse,
    ))
)]
pub struct RecordsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/records", get(list_records).post(create_record))
        .route("/records/batch", post(batch_create))
        .route("/records/{id}/renew", post(renew_record))
        .route("/records/{id}/renew/preview", post(preview_renewal))
}

/// Apply the requested collection, search and page, then load the page.
///
/// A failed load still answers 200: the view keeps the previous rows and
/// reports the error in `state` / `error` so the console can offer a retry.
#[utoipa::path(
    get,
    path = "/console/records",
    tag = "console",
    params(ListingParams),
    responses(
        (status = 200, description = "Current listing view", body = ListingView),
        (status = 400, description = "Unknown collection"),
        (status = 401, description = "Login required"),
    )
)]
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<Session>>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingView>, ServerError> {
    let collection = params.collection.as_deref().map(|raw| resolve_collection(&state, raw)).transpose()?;

    let mut listing = session.listing.lock().await;
    if let Some(collection) = collection {
        listing.set_collection(collection);
    }
    if let Some(q) = params.q.as_deref() {
        listing.set_query(q);
    }
    if let Some(page) = params.page {
        listing.set_page(page);
    }

    let gateway = session.gateway(&state.store);
    if let Err(e) = listing.refresh(&gateway).await {
        // A refused token means the login is gone; anything else stays in the view.
        if let err @ ServerError::Unauthorised(_) = ServerError::from(e) {
            return Err(err);
        }
    }
    Ok(Json(ListingView::from_listing(&listing, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/console/records",
    tag = "console",
    request_body = CreateRecordRequest,
    responses(
        (status = 200, description = "Record created; listing filtered by its name", body = RecordMutationResponse),
        (status = 400, description = "Invalid input or rejected by the store"),
        (status = 401, description = "Login required"),
        (status = 502, description = "Record store unavailable"),
    )
)]
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<Session>>,
    Json(req): Json<CreateRecordRequest>,
) -> Result<Json<RecordMutationResponse>, ServerError> {
    let form = CreateForm::from(req);
    let gateway = session.gateway(&state.store);
    let mut listing = session.listing.lock().await;

    let now = Utc::now();
    let record = form.submit(&gateway, &mut listing, now).await?;
    Ok(Json(RecordMutationResponse {
        record: RecordRow::from_record(&record, listing.is_selected(&record.id), now),
        listing: ListingView::from_listing(&listing, now),
    }))
}

/// Create `{prefix}-{n}` records one at a time.
///
/// Creation stops at the first refusal. Records created before it are kept
/// and reported alongside the failing name and the names never sent.
#[utoipa::path(
    post,
    path = "/console/records/batch",
    tag = "console",
    request_body = BatchCreateRequest,
    responses(
        (status = 200, description = "Batch processed; see `failed` for a partial result", body = BatchCreateResponse),
        (status = 400, description = "Invalid input; nothing was created"),
        (status = 401, description = "Login required"),
    )
)]
pub async fn batch_create(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<Session>>,
    Json(req): Json<BatchCreateRequest>,
) -> Result<Json<BatchCreateResponse>, ServerError> {
    let form = BatchCreateForm::from(req);
    let gateway = session.gateway(&state.store);
    let mut listing = session.listing.lock().await;

    let now = Utc::now();
    let outcome = form.submit(&gateway, &mut listing, now, state.config.max_batch).await?;
    Ok(Json(BatchCreateResponse {
        created: outcome.created.iter().map(|r| RecordRow::from_record(r, false, now)).collect(),
        failed: outcome.failed.as_ref().map(FailureView::from),
        not_attempted: outcome.not_attempted,
        listing: ListingView::from_listing(&listing, now),
    }))
}

/// Renew and edit a record. The new expiry extends the current one when it
/// is still in the future, otherwise it starts from now.
#[utoipa::path(
    post,
    path = "/console/records/{id}/renew",
    tag = "console",
    params(("id" = String, Path, description = "Record to renew")),
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Record updated; listing filtered by its name", body = RecordMutationResponse),
        (status = 400, description = "Invalid input or rejected by the store"),
        (status = 401, description = "Login required"),
        (status = 404, description = "Record not found"),
    )
)]
pub async fn renew_record(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
    Json(req): Json<RenewRequest>,
) -> Result<Json<RecordMutationResponse>, ServerError> {
    let gateway = session.gateway(&state.store);
    let mut listing = session.listing.lock().await;

    let record = gateway.get(listing.collection(), &id).await?;
    let form = req.into_form(&record);
    let now = Utc::now();
    let updated = form.submit(&gateway, &mut listing, &record, now).await?;
    Ok(Json(RecordMutationResponse {
        record: RecordRow::from_record(&updated, listing.is_selected(&updated.id), now),
        listing: ListingView::from_listing(&listing, now),
    }))
}

/// The expiry a renew with these inputs would store. Nothing is written.
#[utoipa::path(
    post,
    path = "/console/records/{id}/renew/preview",
    tag = "console",
    params(("id" = String, Path, description = "Record to renew")),
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Previewed expiry", body = RenewPreview),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Login required"),
        (status = 404, description = "Record not found"),
    )
)]
pub async fn preview_renewal(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
    Json(req): Json<RenewRequest>,
) -> Result<Json<RenewPreview>, ServerError> {
    let gateway = session.gateway(&state.store);
    let collection = session.listing.lock().await.collection().clone();

    let record = gateway.get(&collection, &id).await?;
    let form = req.into_form(&record);
    let new_exp = form.preview(&record, Utc::now())?;
    info!(%collection, id = %id, "renewal previewed");
    Ok(Json(RenewPreview {
        id: record.id.clone(),
        current_exp_time: record.exp_time.to_rfc3339(),
        new_exp_time: new_exp.to_rfc3339(),
        cadence: form.cadence.to_string(),
        days: form.days(),
    }))
}

#[cfg(test)]
mod test {
    use crate::testing::{TestApp, seat};
    use axum::http::StatusCode;
    use chrono::{DateTime, Duration, Utc};
    use serde_json::json;

    fn exp(body: &serde_json::Value) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(body.as_str().unwrap()).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn listing_sorts_by_expiry_descending() {
        let app = TestApp::spawn().await;
        app.seed_default(seat("a", "alpha", Duration::days(1)));
        app.seed_default(seat("b", "beta", Duration::days(9)));
        let sid = app.login().await;

        let (status, body) = app.get("/console/records", Some(&sid)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "loaded");
        assert_eq!(body["total_items"], 2);
        assert_eq!(body["rows"][0]["id"], "b");
        assert_eq!(body["rows"][0]["tier"], "healthy");
        assert_eq!(body["rows"][1]["tier"], "critical");
    }

    #[tokio::test]
    async fn search_and_page_reach_the_store() {
        let app = TestApp::spawn().await;
        for i in 0..60 {
            app.seed_default(seat(&format!("r{i:03}"), &format!("edu-{i}"), Duration::days(i + 1)));
        }
        app.seed_default(seat("x1", "other", Duration::days(2)));
        let sid = app.login().await;

        let (_, body) = app.get("/console/records?q=edu&page=2", Some(&sid)).await;
        assert_eq!(body["total_items"], 60);
        assert_eq!(body["total_pages"], 2);
        assert_eq!(body["page"], 2);
        assert_eq!(body["rows"].as_array().unwrap().len(), 10);
        assert_eq!(body["has_next"], false);
        assert_eq!(body["url"], "/console/records?collection=baidu_edu_users&q=edu&page=2");

        // Past the last page: ignored.
        let (_, body) = app.get("/console/records?page=7", Some(&sid)).await;
        assert_eq!(body["page"], 2);
    }

    #[tokio::test]
    async fn unknown_collection_is_rejected() {
        let app = TestApp::spawn().await;
        let sid = app.login().await;
        let (status, _) = app.get("/console/records?collection=secrets", Some(&sid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.get("/console/records?collection=bad%2Fname", Some(&sid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_focuses_listing_on_new_name() {
        let app = TestApp::spawn().await;
        app.seed_default(seat("old", "someone", Duration::days(3)));
        let sid = app.login().await;

        let before = Utc::now();
        let (status, body) = app
            .post("/console/records", Some(&sid), json!({ "name": "edu-1", "cadence": "week", "limit": 2 }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["record"]["name"], "edu-1");
        assert_eq!(body["record"]["cadence"], "week");
        let expiry = exp(&body["record"]["exp_time"]);
        assert!(expiry >= before + Duration::days(7) - Duration::seconds(1));
        assert_eq!(body["listing"]["query"], "edu-1");
        assert_eq!(body["listing"]["rows"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_without_name_writes_nothing() {
        let app = TestApp::spawn().await;
        let sid = app.login().await;
        let (status, body) = app.post("/console/records", Some(&sid), json!({ "name": "  " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("name is required"));
        assert!(app.default_records().is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_surfaces_store_message() {
        let app = TestApp::spawn().await;
        app.seed_default(seat("a", "edu-1", Duration::days(3)));
        let sid = app.login().await;
        let (status, body) = app.post("/console/records", Some(&sid), json!({ "name": "edu-1" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("unique"), "{body}");
    }

    #[tokio::test]
    async fn batch_creates_numbered_names() {
        let app = TestApp::spawn().await;
        let sid = app.login().await;
        let (status, body) = app
            .post("/console/records/batch", Some(&sid), json!({ "prefix": "edu", "start_num": 5, "count": 3 }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let names: Vec<&str> = body["created"].as_array().unwrap().iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["edu-5", "edu-6", "edu-7"]);
        assert!(body["failed"].is_null());
        assert_eq!(body["listing"]["query"], "edu");
        assert_eq!(app.default_records().len(), 3);
    }

    #[tokio::test]
    async fn batch_stops_at_first_refusal() {
        let app = TestApp::spawn().await;
        app.seed_default(seat("a", "edu-2", Duration::days(3)));
        let sid = app.login().await;
        let (status, body) =
            app.post("/console/records/batch", Some(&sid), json!({ "prefix": "edu", "count": 4 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"].as_array().unwrap().len(), 1);
        assert_eq!(body["failed"]["key"], "edu-2");
        assert_eq!(body["not_attempted"], json!(["edu-3", "edu-4"]));
    }

    #[tokio::test]
    async fn batch_over_cap_is_rejected() {
        let app = TestApp::spawn().await;
        let sid = app.login().await;
        let (status, _) =
            app.post("/console/records/batch", Some(&sid), json!({ "prefix": "edu", "count": 501 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.default_records().is_empty());
    }

    #[tokio::test]
    async fn renew_extends_future_expiry() {
        let app = TestApp::spawn().await;
        let current = app.seed_default(seat("a", "edu-1", Duration::days(5)));
        let sid = app.login().await;

        let (status, body) =
            app.post("/console/records/a/renew", Some(&sid), json!({ "cadence": "day", "days": 1 })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(exp(&body["record"]["exp_time"]), current + Duration::days(1));
        assert_eq!(body["listing"]["query"], "edu-1");
    }

    #[tokio::test]
    async fn renew_of_lapsed_record_starts_from_now() {
        let app = TestApp::spawn().await;
        app.seed_default(seat("a", "edu-1", -Duration::days(3)));
        let sid = app.login().await;

        let before = Utc::now();
        let (_, body) = app.post("/console/records/a/renew", Some(&sid), json!({ "days": 2 })).await;
        let after = Utc::now();
        let new_exp = exp(&body["record"]["exp_time"]);
        assert!(new_exp >= before + Duration::days(2) - Duration::milliseconds(1));
        assert!(new_exp <= after + Duration::days(2));
    }

    #[tokio::test]
    async fn renew_rename_refocuses_on_new_name() {
        let app = TestApp::spawn().await;
        app.seed_default(seat("a", "edu-1", Duration::days(5)));
        let sid = app.login().await;
        let (_, body) = app
            .post("/console/records/a/renew", Some(&sid), json!({ "name": "edu-renamed", "remark": "vip" }))
            .await;
        assert_eq!(body["record"]["name"], "edu-renamed");
        assert_eq!(body["record"]["remark"], "vip");
        assert_eq!(body["listing"]["query"], "edu-renamed");
    }

    #[tokio::test]
    async fn renew_unknown_record_is_not_found() {
        let app = TestApp::spawn().await;
        let sid = app.login().await;
        let (status, _) = app.post("/console/records/missing/renew", Some(&sid), json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preview_does_not_write() {
        let app = TestApp::spawn().await;
        let current = app.seed_default(seat("a", "edu-1", Duration::days(5)));
        let sid = app.login().await;

        let (status, body) =
            app.post("/console/records/a/renew/preview", Some(&sid), json!({ "cadence": "month" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"], 30);
        assert_eq!(exp(&body["new_exp_time"]), current + Duration::days(30));
        assert_eq!(app.default_records()[0].exp_time, current);
    }

    #[tokio::test]
    async fn page_from_a_stale_url_lands_on_the_last_page() {
        let app = TestApp::spawn().await;
        for i in 0..60 {
            app.seed_default(seat(&format!("r{i:03}"), &format!("edu-{i}"), Duration::days(i + 1)));
        }
        let sid = app.login().await;

        let (status, body) = app.get("/console/records?page=9", Some(&sid)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 2);
        assert_eq!(body["rows"].as_array().unwrap().len(), 10);
        assert_eq!(body["url"], "/console/records?collection=baidu_edu_users&page=2");
    }

    #[tokio::test]
    async fn oversized_days_are_rejected_everywhere() {
        let app = TestApp::spawn().await;
        let current = app.seed_default(seat("a", "edu-1", Duration::days(5)));
        let sid = app.login().await;

        let (status, body) =
            app.post("/console/records", Some(&sid), json!({ "name": "edu-2", "days": 100_000_000 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, _) = app
            .post("/console/records/batch", Some(&sid), json!({ "prefix": "edu", "count": 2, "days": 100_000_000 }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            app.post("/console/records/a/renew/preview", Some(&sid), json!({ "days": 100_000_000 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.post("/console/records/a/renew", Some(&sid), json!({ "days": 100_000_000 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let records = app.default_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exp_time, current);
    }

    #[tokio::test]
    async fn batch_numbering_past_i64_is_rejected() {
        let app = TestApp::spawn().await;
        let sid = app.login().await;
        let (status, _) = app
            .post("/console/records/batch", Some(&sid), json!({ "prefix": "edu", "start_num": i64::MAX, "count": 2 }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.default_records().is_empty());
    }

    #[tokio::test]
    async fn store_outage_reports_errored_listing() {
        let app = TestApp::spawn().await;
        let sid = app.login().await;
        app.fail_listing("baidu_edu_users");
        let (status, body) = app.get("/console/records", Some(&sid)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "errored");
        assert!(!body["error"].is_null());
    }
}
